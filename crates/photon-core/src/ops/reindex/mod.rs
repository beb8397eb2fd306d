mod broadcast;
mod permute;
mod slice;

pub use broadcast::Broadcast;
pub use permute::Permute;
pub use slice::{Slice, SliceArg};

use derive_new::new;

use crate::{OpGuards, Operation, OperationError, StorageView};

/// Operations that only recompute the view: the result shares storage with `src`.
#[derive(new, Debug, Clone)]
pub enum Reindex {
    Permute(Permute),
    Slice(Slice),
    Broadcast(Broadcast),
}

impl Reindex {
    pub fn name(&self) -> &'static str {
        match self {
            Reindex::Permute(_) => "permute",
            Reindex::Slice(_) => "slice",
            Reindex::Broadcast(_) => "broadcast",
        }
    }
}

impl OpGuards for Reindex {
    fn check_shapes(&self) -> Result<(), OperationError> {
        match self {
            Reindex::Permute(p) => p.check_shapes(),
            Reindex::Slice(s) => s.check_shapes(),
            Reindex::Broadcast(b) => b.check_shapes(),
        }
    }

    fn check_custom(&self) -> Result<(), OperationError> {
        match self {
            Reindex::Permute(p) => p.check_custom(),
            Reindex::Slice(s) => s.check_custom(),
            Reindex::Broadcast(b) => b.check_custom(),
        }
    }
}

impl Operation for Reindex {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        match self {
            Reindex::Permute(p) => p.compute_view(),
            Reindex::Slice(s) => s.compute_view(),
            Reindex::Broadcast(b) => b.compute_view(),
        }
    }
}
