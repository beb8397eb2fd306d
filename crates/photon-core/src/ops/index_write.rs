use derive_new::new;

use crate::{InvariantError, OpGuards, Operation, OperationError, Shape, StorageView, Tensor};

/// Value written by [`IndexWrite`].
#[derive(Debug, Clone)]
pub enum WriteSource {
    Scalar(f32),
    Tensor(Tensor),
}

impl From<f32> for WriteSource {
    fn from(value: f32) -> Self {
        WriteSource::Scalar(value)
    }
}

impl From<Tensor> for WriteSource {
    fn from(tensor: Tensor) -> Self {
        WriteSource::Tensor(tensor)
    }
}

impl From<&Tensor> for WriteSource {
    fn from(tensor: &Tensor) -> Self {
        WriteSource::Tensor(tensor.clone())
    }
}

/// Writes `src` into every element of `dst`, a view over the storage being written.
///
/// A tensor source is broadcast to the shape of `dst`.
#[derive(new, Debug, Clone)]
pub struct IndexWrite {
    pub(crate) dst: Tensor,
    pub(crate) src: WriteSource,
}

impl IndexWrite {
    pub fn name(&self) -> &'static str {
        "index_write"
    }

    /// `src` read element-by-element against a target of shape `to`.
    pub(crate) fn broadcast_view(src: &Tensor, to: &Shape) -> Result<StorageView, InvariantError> {
        let strides = src.strides().broadcast(src.shape(), to)?;
        Ok(StorageView::new(to.clone(), strides, src.offset()))
    }
}

impl OpGuards for IndexWrite {
    fn check_shapes(&self) -> Result<(), OperationError> {
        if let WriteSource::Tensor(src) = &self.src {
            Self::broadcast_view(src, self.dst.shape())?;
        }
        Ok(())
    }
}

impl Operation for IndexWrite {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        Ok(self.dst.view().clone())
    }
}
