use crate::{CompactArray, RVec, StorageView, Tensor};

/// Buffer offsets of every element of a view, in row-major logical order.
///
/// The last axis varies fastest. A rank-0 view yields its offset once, a view with a
/// zero-size axis yields nothing.
pub struct StridedIndex<'a> {
    next: Option<usize>,
    index: RVec<usize>,
    dims: &'a [usize],
    strides: &'a [isize],
    remaining: usize,
}

impl<'a> StridedIndex<'a> {
    pub fn new(view: &'a StorageView) -> Self {
        let dims = view.shape().inner().as_slice();
        let strides = view.strides().inner().as_slice();
        let remaining = view.numel();
        let next = (remaining > 0).then_some(view.offset());
        Self {
            next,
            index: smallvec::smallvec![0; dims.len()],
            dims,
            strides,
            remaining,
        }
    }
}

impl Iterator for StridedIndex<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.remaining -= 1;

        let mut offset = current as isize;
        let mut carried = true;
        for axis in (0..self.dims.len()).rev() {
            let stride = self.strides[axis];
            self.index[axis] += 1;
            if self.index[axis] < self.dims[axis] {
                offset += stride;
                carried = false;
                break;
            }
            offset -= (self.index[axis] - 1) as isize * stride;
            self.index[axis] = 0;
        }
        self.next = (!carried).then_some(offset as usize);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIndex<'_> {}

/// Reads the elements of `view` out of `data`, in logical order.
pub fn gather(view: &StorageView, data: &[f32]) -> Vec<f32> {
    StridedIndex::new(view).map(|offset| data[offset]).collect()
}

/// Copies the logical contents of `src` into a fresh buffer laid out row-major.
pub fn compact(src: &Tensor) -> CompactArray {
    let data = gather(src.view(), &src.storage().read());
    CompactArray::from_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sel, shape, Shape, Strides};

    fn offsets(shape: Shape, strides: Vec<isize>, offset: usize) -> Vec<usize> {
        let view = StorageView::new(shape, Strides::from(strides), offset);
        StridedIndex::new(&view).collect()
    }

    #[test]
    fn test_contiguous_offsets() {
        assert_eq!(offsets(shape![2, 3], vec![3, 1], 0), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_transposed_offsets() {
        assert_eq!(offsets(shape![3, 2], vec![1, 3], 0), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_broadcast_and_offset() {
        assert_eq!(offsets(shape![2, 3], vec![0, 1], 4), vec![4, 5, 6, 4, 5, 6]);
    }

    #[test]
    fn test_scalar_and_empty() {
        assert_eq!(offsets(shape![], vec![], 7), vec![7]);
        assert!(offsets(shape![2, 0, 3], vec![0, 3, 1], 0).is_empty());
    }

    #[test]
    fn test_exact_size() {
        let view = StorageView::contiguous(shape![4, 5]);
        let mut it = StridedIndex::new(&view);
        assert_eq!(it.len(), 20);
        it.next();
        assert_eq!(it.len(), 19);
    }

    #[test]
    fn test_compact_strided_slice() {
        let data = (0..24).map(|x| x as f32).collect::<Vec<_>>();
        let t = Tensor::from_data(data, shape![2, 3, 4]).unwrap();
        let s = t.slice(&sel![.., 1..3, 1]).unwrap();
        let c = compact(&s);
        assert_eq!(c.to_vec(), vec![5., 9., 17., 21.]);
        assert!(!c.ptr_eq(t.storage()));
    }
}
