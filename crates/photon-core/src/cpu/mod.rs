mod gemm;
mod index_write;
mod reindex;

pub use reindex::{compact, gather, StridedIndex};
pub(crate) use gemm::cpu_matmul;

use crate::{Operation, OperationError, Tensor};

/// Operations that move data. `dst` is the tensor the result is written through.
pub trait CPUOperation: Operation {
    fn apply_cpu(&self, dst: Tensor) -> Result<Tensor, OperationError>;
}
