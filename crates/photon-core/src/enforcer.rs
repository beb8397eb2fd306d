use std::ops::RangeInclusive;

use crate::Shape;

/// Shape-level failures: reshape, permute, broadcast and matmul.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("Cannot reshape {from} ({} elements) into {to} ({} elements).", from.numel(), to.numel())]
    NumelMismatch { from: Shape, to: Shape },
    #[error("Shape mismatch at {left},{right}, {a} != {b}.")]
    ShapeMismatch {
        left: usize,
        right: usize,
        a: usize,
        b: usize,
    },
    #[error("Rank mismatch. {accepted:?} != {actual}.")]
    RankMismatch {
        accepted: RangeInclusive<usize>,
        actual: usize,
    },
    #[error("{dims:?} is not a permutation of the {rank} axes.")]
    InvalidPermutation { dims: Vec<usize>, rank: usize },
    #[error("Duplicate dims in permutation {0:?}.")]
    DuplicateDims(Vec<usize>),
    #[error("Cannot broadcast {from} to {to}.")]
    BroadcastMismatch { from: Shape, to: Shape },
}

/// Selector failures raised while resolving a slice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("Index {index} is out of bounds for axis {axis} with size {size}.")]
    OutOfBounds {
        axis: usize,
        index: isize,
        size: usize,
    },
    #[error("Negative index {index} on axis {axis}.")]
    NegativeIndex { axis: usize, index: isize },
    #[error("Too many indices: {actual} given for a view of rank {rank}.")]
    TooManyIndices { actual: usize, rank: usize },
    #[error("Expected one index per axis ({rank}), got {actual}.")]
    WrongIndexCount { actual: usize, rank: usize },
    #[error("Range {start}..{stop} is invalid for axis {axis} with size {size}.")]
    InvalidRange {
        axis: usize,
        start: usize,
        stop: usize,
        size: usize,
    },
    #[error("Slice step on axis {axis} must be positive.")]
    ZeroStep { axis: usize },
}

/// # Enforcer
///
/// Enforcer enforces common invariants on shapes and selectors.
pub struct Enforcer;

impl Enforcer {
    /// `dims` must name every axis in `0..rank` exactly once.
    pub fn check_permutation(dims: &[usize], rank: usize) -> Result<(), InvariantError> {
        if dims.len() != rank || dims.iter().any(|&d| d >= rank) {
            return Err(InvariantError::InvalidPermutation {
                dims: dims.to_vec(),
                rank,
            });
        }
        let mut seen = vec![false; rank];
        for &d in dims {
            if seen[d] {
                return Err(InvariantError::DuplicateDims(dims.to_vec()));
            }
            seen[d] = true;
        }
        Ok(())
    }

    pub fn assert_rank_range(
        shape: &Shape,
        accepted: RangeInclusive<usize>,
    ) -> Result<(), InvariantError> {
        let actual = shape.rank();
        if !accepted.contains(&actual) {
            return Err(InvariantError::RankMismatch { accepted, actual });
        }
        Ok(())
    }

    pub fn check_shape_pair(
        a_shape: &Shape,
        b_shape: &Shape,
        left: usize,
        right: usize,
    ) -> Result<(), InvariantError> {
        let a = a_shape[left];
        let b = b_shape[right];
        if a != b {
            return Err(InvariantError::ShapeMismatch { left, right, a, b });
        }
        Ok(())
    }

    /// Integer index into an axis of `size` elements.
    pub fn check_index(axis: usize, index: isize, size: usize) -> Result<usize, IndexError> {
        if index < 0 {
            return Err(IndexError::NegativeIndex { axis, index });
        }
        let idx = index as usize;
        if idx >= size {
            return Err(IndexError::OutOfBounds { axis, index, size });
        }
        Ok(idx)
    }

    /// Half-open range into an axis of `size` elements.
    pub fn check_range(
        axis: usize,
        start: usize,
        stop: usize,
        size: usize,
    ) -> Result<(), IndexError> {
        if start > stop || stop > size {
            return Err(IndexError::InvalidRange {
                axis,
                start,
                stop,
                size,
            });
        }
        Ok(())
    }
}
