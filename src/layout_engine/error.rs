use thiserror::Error;

use crate::common::id::ContainerId;
use crate::model::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("container {id}: ratio {value} must be finite and non-negative")]
    InvalidRatio { id: ContainerId, value: f64 },

    #[error("container {id}: min_size {value} must be finite and non-negative")]
    InvalidMinSize { id: ContainerId, value: f64 },

    #[error("container {id}: a url and a render handle cannot both be set")]
    ConflictingContent { id: ContainerId },

    #[error("node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),

    #[error("node {child:?} records parent {recorded:?} but is listed under {actual:?}")]
    ParentMismatch {
        child: NodeId,
        recorded: Option<NodeId>,
        actual: Option<NodeId>,
    },

    #[error("node {child:?} appears more than once among the children of {parent:?}")]
    DuplicateChild { parent: NodeId, child: NodeId },

    #[error("node {0:?} is reachable through a cycle")]
    Cycle(NodeId),

    #[error("node {0:?} is not reachable from the root")]
    Unreachable(NodeId),

    #[error("root node {0:?} has a parent")]
    RootHasParent(NodeId),

    #[error("node {0:?} has no container payload")]
    MissingPayload(NodeId),

    #[error("invalid settings: {}", .0.join("; "))]
    InvalidSettings(Vec<String>),
}
