use crate::{CPUOperation, IndexWrite, OperationError, StridedIndex, Tensor, WriteSource};

impl CPUOperation for IndexWrite {
    fn apply_cpu(&self, dst: Tensor) -> Result<Tensor, OperationError> {
        log::trace!(
            "{}: {:?} into {:?} at offset {}",
            self.name(),
            self.src,
            dst.shape(),
            dst.offset()
        );

        match &self.src {
            WriteSource::Scalar(value) => {
                let mut buffer = dst.storage().write();
                for offset in dst.offsets() {
                    buffer[offset] = *value;
                }
            }
            WriteSource::Tensor(src) => {
                let src_view = IndexWrite::broadcast_view(src, dst.shape())?;
                if src.shares_storage(&dst) {
                    // One guard for both sides: each element is read just before it is written.
                    let mut buffer = dst.storage().write();
                    for (d, s) in dst.offsets().zip(StridedIndex::new(&src_view)) {
                        let value = buffer[s];
                        buffer[d] = value;
                    }
                } else {
                    let source = src.storage().read();
                    let mut buffer = dst.storage().write();
                    for (d, s) in dst.offsets().zip(StridedIndex::new(&src_view)) {
                        buffer[d] = source[s];
                    }
                }
            }
        }
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use crate::{sel, shape, Shape, SliceArg, Tensor};
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn arange(shape: Shape) -> Tensor {
        let data = (0..shape.numel()).map(|x| x as f32).collect::<Vec<_>>();
        Tensor::from_data(data, shape).unwrap()
    }

    #[test]
    fn test_scalar_write_through_strided_view() {
        let t = Tensor::zeros(shape![3, 4]);
        t.index_write(&sel![.., 1..4], 2.0).unwrap();
        assert_eq!(
            t.to_vec(),
            vec![0., 2., 2., 2., 0., 2., 2., 2., 0., 2., 2., 2.]
        );
    }

    #[test]
    fn test_scalar_write_visible_through_alias() {
        let t = Tensor::zeros(shape![2, 3]);
        let tt = t.transpose(&[1, 0]).unwrap();
        tt.index_write(&sel![2], 5.0).unwrap();
        assert_eq!(t.to_vec(), vec![0., 0., 5., 0., 0., 5.]);
    }

    #[test]
    fn test_broadcast_tensor_write() {
        let t = Tensor::zeros(shape![2, 4, 4]);
        let row = Tensor::from_data([1., 2., 3., 4.], shape![4]).unwrap();
        t.index_write(&sel![.., 0, ..], &row).unwrap();
        for b in 0..2usize {
            assert_eq!(
                t.slice(&sel![b, 0]).unwrap().to_vec(),
                vec![1., 2., 3., 4.]
            );
            assert_eq!(t.slice(&sel![b, 1..]).unwrap().to_vec(), vec![0.; 12]);
        }
    }

    #[test]
    fn test_stepped_write() {
        let t = Tensor::zeros(shape![6]);
        let src = Tensor::from_data([7., 8., 9.], shape![3]).unwrap();
        t.index_write(&[SliceArg::full().stepped(2)], src).unwrap();
        assert_eq!(t.to_vec(), vec![7., 0., 8., 0., 9., 0.]);
    }

    #[test]
    fn test_write_from_same_storage() {
        let t = arange(shape![2, 3]);
        let top = t.slice(&sel![0]).unwrap();
        t.index_write(&sel![1], &top).unwrap();
        assert_eq!(t.to_vec(), vec![0., 1., 2., 0., 1., 2.]);
    }

    #[test]
    fn test_failed_write_leaves_target_untouched() {
        let t = arange(shape![2, 3]);
        let bad = Tensor::zeros(shape![2]);
        assert!(t.index_write(&sel![0], &bad).unwrap_err().is_shape_error());
        assert!(t.index_write(&sel![2], 1.0).unwrap_err().is_index_error());
        assert_eq!(t.to_vec(), vec![0., 1., 2., 3., 4., 5.]);
    }

    #[test]
    fn test_write_to_empty_selection() {
        let t = arange(shape![3]);
        t.index_write(&sel![1..1], 9.0).unwrap();
        assert_eq!(t.to_vec(), vec![0., 1., 2.]);
    }

    #[proptest(cases = 16)]
    fn test_write_matches_ndarray(
        #[strategy(1..=4usize)] rows: usize,
        #[strategy(1..=8usize)] cols: usize,
        #[strategy(0..#rows)] row: usize,
    ) {
        let t = Tensor::randn(shape![rows, cols]);
        let src = Tensor::randn(shape![cols]);
        let mut expected = t.to_ndarray();
        expected
            .index_axis_mut(ndarray::Axis(0), row)
            .assign(&src.to_ndarray());
        t.index_write(&sel![row], &src).unwrap();
        assert_eq!(t.to_ndarray(), expected);
    }
}
