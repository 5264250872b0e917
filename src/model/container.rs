use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::id::ContainerId;
use crate::layout_engine::Orientation;
use crate::layout_engine::error::TreeError;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Root,
    /// Carries its own logic; never pruned or collapsed.
    Wrapper,
    /// Pure layout container.
    #[default]
    Simple,
    Iframe,
    Component,
    /// Marks the slot a container is being moved out of. Only lives for the
    /// duration of a move.
    Placeholder,
}

impl ContainerKind {
    /// Pure layout containers are the only ones the pruning passes touch.
    pub fn is_pure(self) -> bool { self == ContainerKind::Simple }
}

/// Externally owned renderable, compared by identity.
#[derive(Clone)]
pub struct RenderHandle(Arc<dyn Any + Send + Sync>);

impl RenderHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self { RenderHandle(Arc::new(value)) }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.0.downcast_ref() }

    pub fn same_as(&self, other: &RenderHandle) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl PartialEq for RenderHandle {
    fn eq(&self, other: &Self) -> bool { self.same_as(other) }
}

impl fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// What a leaf renders. A container holds at most one of these.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Content {
    #[default]
    None,
    Url(String),
    Handle(RenderHandle),
}

impl Content {
    pub fn url(&self) -> Option<&str> {
        match self {
            Content::Url(url) => Some(url),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<&RenderHandle> {
        match self {
            Content::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool { matches!(self, Content::None) }
}

bitflags! {
    /// Interaction affordances read by the rendering layer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DragPolicy: u8 {
        const DRAGGABLE = 1 << 0;
        const DROPPABLE = 1 << 1;
        const CONTROL = 1 << 2;
        const SPLITTER = 1 << 3;
    }
}

/// Payload stored for each node of a container tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    pub id: ContainerId,
    pub kind: ContainerKind,
    pub content: Content,
    pub orientation: Orientation,
    pub ratio: Option<f64>,
    pub min_size: Option<f64>,
    pub drag: DragPolicy,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, kind: ContainerKind) -> Self {
        Container {
            id: id.into(),
            kind,
            content: Content::None,
            orientation: Orientation::Horizontal,
            ratio: None,
            min_size: None,
            drag: DragPolicy::empty(),
        }
    }

    /// Transient stand-in left behind by a container being moved.
    pub fn placeholder() -> Self {
        Container {
            ratio: Some(0.0),
            min_size: Some(0.0),
            orientation: Orientation::Vertical,
            ..Container::new(ContainerId::generate(), ContainerKind::Placeholder)
        }
    }

    /// Fresh simple container synthesized around a drop target.
    pub fn wrapper(orientation: Orientation) -> Self {
        Container::new(ContainerId::generate(), ContainerKind::Simple).with_orientation(orientation)
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn url(&self) -> Option<&str> { self.content.url() }

    pub fn handle(&self) -> Option<&RenderHandle> { self.content.handle() }

    pub fn is_placeholder(&self) -> bool { self.kind == ContainerKind::Placeholder }
}

/// Owned, nested description of a container subtree.
///
/// Used to build a tree, to snapshot it, and to hand back subtrees removed
/// from it. Render handles are not serialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContainerId>,
    #[serde(default)]
    pub kind: ContainerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip)]
    pub handle: Option<RenderHandle>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<f64>,
    #[serde(default, skip_serializing_if = "DragPolicy::is_empty")]
    pub drag: DragPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContainerConfig>,
}

impl ContainerConfig {
    pub fn new(kind: ContainerKind) -> Self { ContainerConfig { kind, ..Default::default() } }

    pub fn root(orientation: Orientation) -> Self {
        ContainerConfig::new(ContainerKind::Root).orientation(orientation)
    }

    pub fn simple(orientation: Orientation) -> Self {
        ContainerConfig::new(ContainerKind::Simple).orientation(orientation)
    }

    pub fn iframe(url: impl Into<String>) -> Self {
        ContainerConfig::new(ContainerKind::Iframe).url(url)
    }

    pub fn component(handle: RenderHandle) -> Self {
        ContainerConfig::new(ContainerKind::Component).handle(handle)
    }

    pub fn id(mut self, id: impl Into<ContainerId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn handle(mut self, handle: RenderHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn min_size(mut self, min_size: f64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn drag(mut self, drag: DragPolicy) -> Self {
        self.drag = drag;
        self
    }

    pub fn child(mut self, child: ContainerConfig) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ContainerConfig>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of containers described, this one included.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(config) = stack.pop() {
            count += 1;
            stack.extend(config.children.iter());
        }
        count
    }

    /// Turns this description (children excluded) into a node payload,
    /// generating an id when none was given.
    pub fn to_container(&self) -> Result<Container, TreeError> {
        let id = self.id.clone().unwrap_or_else(ContainerId::generate);

        if let Some(value) = self.ratio.filter(|r| !valid_share(*r)) {
            return Err(TreeError::InvalidRatio { id, value });
        }
        if let Some(value) = self.min_size.filter(|m| !valid_share(*m)) {
            return Err(TreeError::InvalidMinSize { id, value });
        }
        let content = match (&self.url, &self.handle) {
            (Some(_), Some(_)) => return Err(TreeError::ConflictingContent { id }),
            (Some(url), None) => Content::Url(url.clone()),
            (None, Some(handle)) => Content::Handle(handle.clone()),
            (None, None) => Content::None,
        };

        Ok(Container {
            id,
            kind: self.kind,
            content,
            orientation: self.orientation,
            ratio: self.ratio,
            min_size: self.min_size,
            drag: self.drag,
        })
    }

    /// Inverse of [`ContainerConfig::to_container`], without children.
    pub fn from_container(container: Container) -> Self {
        let (url, handle) = match container.content {
            Content::None => (None, None),
            Content::Url(url) => (Some(url), None),
            Content::Handle(handle) => (None, Some(handle)),
        };
        ContainerConfig {
            id: Some(container.id),
            kind: container.kind,
            url,
            handle,
            orientation: container.orientation,
            ratio: container.ratio,
            min_size: container.min_size,
            drag: container.drag,
            children: Vec::new(),
        }
    }
}

fn valid_share(value: f64) -> bool { value.is_finite() && value >= 0.0 }
