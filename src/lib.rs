//! Recursively splittable pane layouts.
//!
//! A [`ContainerTree`] holds nested containers that can be searched, pruned
//! and rearranged by drag-style insertion. [`allocate_sizes`] turns the ratios
//! declared by a container's children into percentage shares.

pub mod common;
pub mod layout_engine;
pub mod model;

pub use layout_engine::{
    Allocation, ContainerTree, Diagnostic, InsertKind, Orientation, SizeAllocator, SizeRequest,
    TreeError, allocate_sizes,
};
pub use model::container::{
    Container, ContainerConfig, ContainerKind, Content, DragPolicy, RenderHandle,
};
pub use model::tree::NodeId;
