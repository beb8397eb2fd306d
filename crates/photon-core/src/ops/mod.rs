mod index_write;
mod matmul;
mod reindex;
mod view;

pub use index_write::*;
pub use matmul::*;
pub use reindex::*;
pub use view::*;
