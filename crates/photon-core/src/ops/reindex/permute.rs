use derive_new::new;

use crate::{OpGuards, Operation, OperationError, StorageView, Tensor};

#[derive(new, Debug, Clone)]
pub struct Permute {
    pub src: Tensor,
    pub dims: Vec<usize>,
}

impl OpGuards for Permute {
    fn check_shapes(&self) -> Result<(), OperationError> {
        Ok(crate::Enforcer::check_permutation(&self.dims, self.src.rank())?)
    }
}

impl Operation for Permute {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        let (shape, strides) = self.src.strides().permute(self.src.shape(), &self.dims)?;
        Ok(StorageView::new(shape, strides, self.src.offset()))
    }
}
