use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use crate::{
    Enforcer, IndexError, OpGuards, Operation, OperationError, RVec, Shape, StorageView, Strides,
    Tensor,
};

/// One entry of a selector, applied to one axis.
///
/// An `Index` picks a single position and removes the axis from the result. A `Range`
/// keeps the axis with `ceil((stop - start) / step)` positions. Axes past the end of the
/// selector are kept whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceArg {
    Index(isize),
    Range {
        start: usize,
        stop: Option<usize>,
        step: usize,
    },
}

impl SliceArg {
    /// The whole axis.
    pub fn full() -> Self {
        SliceArg::Range {
            start: 0,
            stop: None,
            step: 1,
        }
    }

    /// Same range, taking every `step`-th position. Has no effect on an index.
    pub fn stepped(self, step: usize) -> Self {
        match self {
            SliceArg::Range { start, stop, .. } => SliceArg::Range { start, stop, step },
            index => index,
        }
    }
}

impl From<usize> for SliceArg {
    fn from(index: usize) -> Self {
        SliceArg::Index(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<Range<usize>> for SliceArg {
    fn from(range: Range<usize>) -> Self {
        SliceArg::Range {
            start: range.start,
            stop: Some(range.end),
            step: 1,
        }
    }
}

impl From<RangeInclusive<usize>> for SliceArg {
    fn from(range: RangeInclusive<usize>) -> Self {
        SliceArg::Range {
            start: *range.start(),
            // An end past usize::MAX is out of range for any axis.
            stop: Some(range.end().checked_add(1).unwrap_or(usize::MAX)),
            step: 1,
        }
    }
}

impl From<RangeFrom<usize>> for SliceArg {
    fn from(range: RangeFrom<usize>) -> Self {
        SliceArg::Range {
            start: range.start,
            stop: None,
            step: 1,
        }
    }
}

impl From<RangeTo<usize>> for SliceArg {
    fn from(range: RangeTo<usize>) -> Self {
        SliceArg::Range {
            start: 0,
            stop: Some(range.end),
            step: 1,
        }
    }
}

impl From<RangeFull> for SliceArg {
    fn from(_: RangeFull) -> Self {
        SliceArg::full()
    }
}

/// # Slice
///
/// Selects a sub-view of `src` without moving data. The result starts at the first
/// selected element and steps over the skipped ones with scaled strides.
#[derive(derive_new::new, Debug, Clone)]
pub struct Slice {
    pub src: Tensor,
    args: RVec<SliceArg>,
}

impl Slice {
    pub fn args(&self) -> &[SliceArg] {
        &self.args
    }

    fn resolve(&self) -> Result<StorageView, IndexError> {
        let shape = self.src.shape();
        let strides = self.src.strides();

        let mut offset = self.src.offset() as isize;
        let mut out_shape = RVec::with_capacity(shape.rank());
        let mut out_strides = RVec::with_capacity(shape.rank());

        for (axis, (&size, &stride)) in shape.iter().zip(strides.iter()).enumerate() {
            match self.args.get(axis).copied().unwrap_or_else(SliceArg::full) {
                SliceArg::Index(index) => {
                    let index = Enforcer::check_index(axis, index, size)?;
                    offset += index as isize * stride;
                }
                SliceArg::Range { start, stop, step } => {
                    if step == 0 {
                        return Err(IndexError::ZeroStep { axis });
                    }
                    let stop = stop.unwrap_or(size);
                    Enforcer::check_range(axis, start, stop, size)?;
                    let len = (stop - start).div_ceil(step);
                    if len > 0 {
                        offset += start as isize * stride;
                    }
                    out_shape.push(len);
                    out_strides.push(stride * step as isize);
                }
            }
        }

        Ok(StorageView::new(
            Shape::new(out_shape),
            Strides::new(out_strides),
            offset as usize,
        ))
    }
}

impl OpGuards for Slice {
    fn check_shapes(&self) -> Result<(), OperationError> {
        let rank = self.src.rank();
        if self.args.len() > rank {
            return Err(IndexError::TooManyIndices {
                actual: self.args.len(),
                rank,
            })?;
        }
        Ok(())
    }

    fn check_custom(&self) -> Result<(), OperationError> {
        self.resolve()?;
        Ok(())
    }
}

impl Operation for Slice {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        Ok(self.resolve()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{sel, shape, IndexError, OperationError, Shape, SliceArg, Tensor, TensorError};
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn arange(shape: Shape) -> Tensor {
        let data = (0..shape.numel()).map(|x| x as f32).collect::<Vec<_>>();
        Tensor::from_data(data, shape).unwrap()
    }

    fn index_err(err: TensorError) -> IndexError {
        match err {
            TensorError::OperationError(OperationError::IndexError(e)) => e,
            other => panic!("expected an index error, got {:?}", other),
        }
    }

    #[derive(Debug)]
    struct SliceProblem {
        shape: Shape,
        ranges: Vec<(usize, usize, usize)>,
    }

    impl Arbitrary for SliceProblem {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            Shape::arbitrary_with(vec![1..=4, 1..=4, 1..=16, 1..=16])
                .prop_flat_map(|shape| {
                    let ranges = shape
                        .iter()
                        .map(|&size| {
                            (0..=size).prop_flat_map(move |start| {
                                (Just(start), start..=size, 1..=3usize)
                            })
                        })
                        .collect::<Vec<_>>();
                    (Just(shape), ranges)
                })
                .prop_map(|(shape, ranges)| SliceProblem { shape, ranges })
                .boxed()
        }
    }

    fn ground_truth(a: &Tensor, ranges: &[(usize, usize, usize)]) -> ndarray::ArrayD<f32> {
        a.to_ndarray()
            .slice_each_axis(|ax| {
                let (start, stop, step) = ranges[ax.axis.index()];
                ndarray::Slice::new(start as isize, Some(stop as isize), step as isize)
            })
            .to_owned()
    }

    #[proptest(cases = 32)]
    fn test_slice(prob: SliceProblem) {
        let SliceProblem { shape, ranges } = prob;
        let a = Tensor::randn(shape);
        let args = ranges
            .iter()
            .map(|&(start, stop, step)| SliceArg::from(start..stop).stepped(step))
            .collect::<Vec<_>>();
        let ours = a.slice(&args).unwrap();
        assert!(ours.shares_storage(&a));
        assert_eq!(ours.to_ndarray(), ground_truth(&a, &ranges));
    }

    #[test]
    fn test_index_drops_axis() {
        let a = arange(shape![2, 3, 4]);
        let s = a.slice(&sel![1]).unwrap();
        assert_eq!(s.shape(), &shape![3, 4]);
        assert_eq!(s.offset(), 12);
        assert_eq!(s.strides().to_vec(), vec![4, 1]);

        let s = a.slice(&sel![.., 0, ..]).unwrap();
        assert_eq!(s.shape(), &shape![2, 4]);
        assert_eq!(s.strides().to_vec(), vec![12, 1]);
        assert_eq!(s.to_vec(), vec![0., 1., 2., 3., 12., 13., 14., 15.]);
    }

    #[test]
    fn test_all_indices_gives_scalar() {
        let a = arange(shape![2, 3]);
        let s = a.slice(&sel![1, 2]).unwrap();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.item().unwrap(), 5.0);
    }

    #[test]
    fn test_stepped_range() {
        let a = arange(shape![10]);
        let s = a.slice(&[SliceArg::from(1..8).stepped(3)]).unwrap();
        assert_eq!(s.shape(), &shape![3]);
        assert_eq!(s.strides().to_vec(), vec![3]);
        assert_eq!(s.to_vec(), vec![1., 4., 7.]);
    }

    #[test]
    fn test_slice_of_slice() {
        let a = arange(shape![6, 6]);
        let s = a.slice(&sel![1..5, 2..]).unwrap();
        let ss = s.slice(&sel![2, 1..3]).unwrap();
        assert_eq!(ss.to_vec(), vec![21., 22.]);
        assert!(ss.shares_storage(&a));
    }

    #[test]
    fn test_empty_range() {
        let a = arange(shape![4, 3]);
        let s = a.slice(&sel![2..2]).unwrap();
        assert_eq!(s.shape(), &shape![0, 3]);
        assert_eq!(s.numel(), 0);
        assert!(s.to_vec().is_empty());
    }

    #[test]
    fn test_slice_errors() {
        let a = arange(shape![2, 3]);
        assert_eq!(
            index_err(a.slice(&sel![0, 0, 0]).unwrap_err()),
            IndexError::TooManyIndices { actual: 3, rank: 2 }
        );
        assert_eq!(
            index_err(a.slice(&sel![.., 3]).unwrap_err()),
            IndexError::OutOfBounds {
                axis: 1,
                index: 3,
                size: 3
            }
        );
        assert_eq!(
            index_err(a.slice(&[SliceArg::Index(-1)]).unwrap_err()),
            IndexError::NegativeIndex { axis: 0, index: -1 }
        );
        assert_eq!(
            index_err(a.slice(&sel![0..3]).unwrap_err()),
            IndexError::InvalidRange {
                axis: 0,
                start: 0,
                stop: 3,
                size: 2
            }
        );
        assert_eq!(
            index_err(a.slice(&[SliceArg::full().stepped(0)]).unwrap_err()),
            IndexError::ZeroStep { axis: 0 }
        );
    }

    #[test]
    fn test_huge_index_is_out_of_bounds() {
        let a = arange(shape![2, 3]);
        assert_eq!(SliceArg::from(usize::MAX), SliceArg::Index(isize::MAX));
        assert!(matches!(
            index_err(a.slice(&sel![usize::MAX]).unwrap_err()),
            IndexError::OutOfBounds { axis: 0, .. }
        ));
    }

    #[test]
    fn test_inclusive_range_to_usize_max_is_invalid() {
        let a = arange(shape![2, 3]);
        assert!(matches!(
            index_err(a.slice(&sel![0..=usize::MAX]).unwrap_err()),
            IndexError::InvalidRange { axis: 0, .. }
        ));
        let s = a.slice(&sel![.., 1..=2]).unwrap();
        assert_eq!(s.to_vec(), vec![1., 2., 4., 5.]);
    }
}
