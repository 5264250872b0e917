pub mod container;
pub mod tree;
