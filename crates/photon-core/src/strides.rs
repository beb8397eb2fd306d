use crate::{rvec, Enforcer, InvariantError, RVec, Shape};

/// Signed step, in elements, taken through the buffer for one step along each axis.
///
/// A stride of 0 marks a broadcast axis: every index along it reads the same element.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Strides(RVec<isize>);

impl Strides {
    pub fn new(strides: RVec<isize>) -> Self {
        Self(strides)
    }

    pub fn to_vec(&self) -> Vec<isize> {
        self.0.to_vec()
    }

    pub fn inner(&self) -> &RVec<isize> {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, isize> {
        self.0.iter()
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, index: usize, stride: isize) {
        self.0.insert(index, stride);
    }

    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Strides(self.0[range].into())
    }

    /// True if these strides step through `shape` in row-major order with no gaps.
    ///
    /// Axes of size 1 are never stepped along, so their stride is ignored.
    pub fn is_row_major(&self, shape: &Shape) -> bool {
        let mut expected = 1isize;
        for (&size, &stride) in shape.iter().zip(self.0.iter()).rev() {
            if size == 1 {
                continue;
            }
            if stride != expected {
                return false;
            }
            expected *= size as isize;
        }
        true
    }

    /// Reorders `shape` and these strides so that output axis `i` is input axis `dims[i]`.
    pub fn permute(&self, shape: &Shape, dims: &[usize]) -> Result<(Shape, Strides), InvariantError> {
        Enforcer::check_permutation(dims, shape.rank())?;
        let out_shape = dims.iter().map(|&d| shape[d]).collect::<RVec<_>>();
        let out_strides = dims.iter().map(|&d| self.0[d]).collect::<RVec<_>>();
        Ok((Shape::new(out_shape), Strides(out_strides)))
    }

    /// Strides that read a view of `shape` as if it had shape `to`.
    ///
    /// Shapes are right-aligned. Axes that match keep their stride, axes of size 1 and
    /// leading axes missing from `shape` get stride 0.
    //For rules, see https://numpy.org/doc/stable/user/basics.broadcasting.html
    pub fn broadcast(&self, shape: &Shape, to: &Shape) -> Result<Strides, InvariantError> {
        let mismatch = || InvariantError::BroadcastMismatch {
            from: shape.clone(),
            to: to.clone(),
        };
        if shape.rank() > to.rank() {
            return Err(mismatch());
        }
        let pad = to.rank() - shape.rank();
        let mut strides: RVec<isize> = rvec![0; to.rank()];
        for (i, (&size, &stride)) in shape.iter().zip(self.0.iter()).enumerate() {
            let target = to[i + pad];
            strides[i + pad] = if size == target {
                stride
            } else if size == 1 {
                0
            } else {
                return Err(mismatch());
            };
        }
        Ok(Strides(strides))
    }
}

impl std::fmt::Debug for Strides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(first) = self.0.first() else {
            return write!(f, "[]");
        };
        let mut strides = format!("[{}", first);
        for stride in self.0.iter().skip(1) {
            strides.push_str(&format!("x{}", stride));
        }
        write!(f, "{}]", strides)
    }
}

impl std::ops::Index<usize> for Strides {
    type Output = isize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<&Shape> for Strides {
    fn from(shape: &Shape) -> Self {
        let mut strides = rvec![];
        let mut stride = 1;
        for size in shape.inner().iter().rev() {
            strides.push(stride);
            stride *= *size as isize;
        }
        strides.reverse();
        Self(strides)
    }
}

impl From<Vec<isize>> for Strides {
    fn from(strides: Vec<isize>) -> Self {
        Self(strides.into())
    }
}
