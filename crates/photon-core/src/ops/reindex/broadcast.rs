use derive_new::new;

use crate::{OpGuards, Operation, OperationError, Shape, StorageView, Tensor};

#[derive(new, Debug, Clone)]
pub struct Broadcast {
    pub src: Tensor,
    to: Shape,
}

impl Broadcast {
    pub fn to(&self) -> &Shape {
        &self.to
    }
}

impl OpGuards for Broadcast {
    fn check_shapes(&self) -> Result<(), OperationError> {
        self.src.strides().broadcast(self.src.shape(), &self.to)?;
        Ok(())
    }
}

impl Operation for Broadcast {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        let src_shape = self.src.shape();

        if *src_shape == self.to {
            return Ok(self.src.view().clone());
        }

        let strides = self.src.strides().broadcast(src_shape, &self.to)?;
        Ok(StorageView::new(
            self.to.clone(),
            strides,
            self.src.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use proptest::{
        arbitrary::Arbitrary,
        strategy::{BoxedStrategy, Just, Strategy},
    };
    use test_strategy::proptest;

    use crate::{shape, Broadcast, Shape, Tensor};

    impl Arbitrary for BroadcastProblem {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            Shape::arbitrary_with(vec![1..=2, 1..=8, 1..=2, 1..=16])
                .prop_flat_map(|original_shape| {
                    let create_broadcast_range = |dim: usize| {
                        if original_shape[dim] == 1 {
                            1..=8
                        } else {
                            original_shape[dim]..=original_shape[dim]
                        }
                    };

                    let to = Shape::arbitrary_with(vec![
                        1..=3,
                        create_broadcast_range(0),
                        create_broadcast_range(1),
                        create_broadcast_range(2),
                        create_broadcast_range(3),
                    ]);
                    (Just(original_shape), to)
                })
                .prop_map(|(original_shape, to)| BroadcastProblem {
                    op: Broadcast::new(Tensor::randn(original_shape), to),
                })
                .boxed()
        }
    }

    #[derive(Debug, Clone)]
    struct BroadcastProblem {
        op: Broadcast,
    }

    fn ground_truth(a: &Tensor, to: &Shape) -> ndarray::ArrayD<f32> {
        a.to_ndarray()
            .broadcast(ndarray::IxDyn(&to.to_vec()))
            .unwrap()
            .to_owned()
    }

    fn run_broadcast_trial(prob: BroadcastProblem) -> anyhow::Result<()> {
        let BroadcastProblem { op } = prob;
        let a = op.src.clone();
        let ground = ground_truth(&a, op.to());
        let ours = a.broadcast_to(op.to().clone())?;
        assert!(ours.shares_storage(&a));
        assert_eq!(ours.to_ndarray(), ground);
        Ok(())
    }

    #[proptest(cases = 16)]
    fn test_broadcast(prob: BroadcastProblem) {
        run_broadcast_trial(prob).unwrap();
    }

    #[test]
    fn debug_broadcast() {
        let prob = BroadcastProblem {
            op: Broadcast::new(Tensor::randn(shape![1]), shape![4, 32, 16, 16]),
        };
        run_broadcast_trial(prob).unwrap();
    }

    #[test]
    fn test_broadcast_introduces_zero_strides() {
        let a = Tensor::from_data([1., 2., 3.], shape![3]).unwrap();
        let b = a.broadcast_to(shape![2, 3]).unwrap();
        assert_eq!(b.strides().to_vec(), vec![0, 1]);
        assert!(!b.is_compact());
        assert_eq!(b.to_vec(), vec![1., 2., 3., 1., 2., 3.]);
    }

    #[test]
    fn test_broadcast_to_same_shape_is_noop() {
        let a = Tensor::randn(shape![2, 3]);
        let b = a.broadcast_to(shape![2, 3]).unwrap();
        assert!(b.is_compact());
        assert_eq!(b.view(), a.view());
    }

    #[test]
    fn test_broadcast_incompatible() {
        let a = Tensor::zeros(shape![3, 2]);
        assert!(a.broadcast_to(shape![3, 4]).unwrap_err().is_shape_error());
        assert!(a.broadcast_to(shape![2]).unwrap_err().is_shape_error());
    }
}
