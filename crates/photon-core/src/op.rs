use crate::{IndexError, InvariantError, StorageView};
use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    InvariantError(#[from] InvariantError),
    #[error(transparent)]
    IndexError(#[from] IndexError),
}

/// # Operation Guards - Runtime guards for operation correctness.
///
/// The Rust type system cannot check shape invariants at compile time, so every operation
/// checks them at runtime before touching data. Unlike a panic, a failed guard leaves all
/// buffers untouched and is reported to the caller.
pub trait OpGuards {
    fn check_shapes(&self) -> Result<(), OperationError>;

    // Some operations may have custom invariants to be upheld.
    // e.g every selector entry being in range
    fn check_custom(&self) -> Result<(), OperationError> {
        Ok(())
    }
}

/// # Operation
///
/// Operation should be implemented for every shape-changing node. It describes the result
/// without moving any data; kernels that move data live in [`crate::cpu`].
pub trait Operation: OpGuards + Debug + 'static {
    /// # Check Invariants
    ///
    /// All operations have some invariants that must be upheld to ensure correctness.
    fn check_invariants(&self) -> Result<(), OperationError> {
        self.check_shapes()?;
        self.check_custom()
    }

    /// # Compute View
    ///
    /// Determine the shape, strides & offset of the resultant tensor.
    fn compute_view(&self) -> Result<StorageView, OperationError>;
}
