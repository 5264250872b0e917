pub mod allocator;
pub mod container_tree;
pub mod error;
mod graph;

pub use allocator::{Allocation, Diagnostic, SizeAllocator, SizeRequest, allocate_sizes};
pub use container_tree::ContainerTree;
pub use error::TreeError;
pub use graph::{InsertKind, Orientation, ParseInsertKindError};

#[cfg(test)]
mod tests;
