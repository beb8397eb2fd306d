use crate::{OpGuards, Operation, OperationError, Shape, StorageView, Tensor};

/// Reshape of a compact tensor. Non-compact sources are compacted by [`Tensor::reshape`]
/// before this view is computed.
#[derive(Debug, derive_new::new, Clone)]
pub struct View {
    src: Tensor,
    shape: Shape,
}

impl OpGuards for View {
    fn check_shapes(&self) -> Result<(), OperationError> {
        Ok(self.src.shape().validate_reshape(&self.shape)?)
    }
}

impl Operation for View {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        debug_assert!(self.src.is_compact());
        Ok(StorageView::contiguous(self.shape.clone()))
    }
}
