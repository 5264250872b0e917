use std::mem;

use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

use super::allocator::{Allocation, SizeAllocator, SizeRequest};
use super::error::TreeError;
use super::{InsertKind, Orientation};
use crate::common::config::{Settings, TreeSettings};
use crate::common::id::ContainerId;
use crate::model::container::{Container, ContainerConfig, ContainerKind};
use crate::model::tree::{NodeId, NodeMap, Observer, Tree};

/// Payload store following node lifetime in the arena.
#[derive(Default)]
pub struct Containers {
    containers: SecondaryMap<NodeId, Container>,
}

impl Containers {
    pub fn get(&self, node: NodeId) -> Option<&Container> { self.containers.get(node) }

    fn set(&mut self, node: NodeId, container: Container) {
        self.containers.insert(node, container);
    }
}

impl Observer for Containers {
    fn added_to_forest(&mut self, _map: &NodeMap, node: NodeId) {
        trace!(?node, "added to forest");
    }

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        trace!(?node, parent = ?node.parent(map), "attached");
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        trace!(?node, parent = ?node.parent(map), "detaching");
    }

    fn removed_from_forest(&mut self, _map: &NodeMap, node: NodeId) {
        if let Some(container) = self.containers.remove(node) {
            trace!(?node, id = %container.id, "dropped");
        }
    }
}

/// A single-rooted tree of containers.
///
/// Every lookup walks the tree from the root; no id index is kept.
pub struct ContainerTree {
    tree: Tree<Containers>,
    root: NodeId,
    settings: TreeSettings,
    allocator: SizeAllocator,
    log_diagnostics: bool,
}

impl ContainerTree {
    pub fn from_config(config: ContainerConfig) -> Result<Self, TreeError> {
        Self::with_settings(config, &Settings::default())
    }

    pub fn with_settings(config: ContainerConfig, settings: &Settings) -> Result<Self, TreeError> {
        let issues = settings.validate();
        if !issues.is_empty() {
            return Err(TreeError::InvalidSettings(issues));
        }
        let plan = plan(config)?;
        let mut tree = Tree::with_observer(Containers::default());
        let root = materialize(&mut tree, plan, None);
        Ok(ContainerTree {
            tree,
            root,
            settings: settings.tree,
            allocator: SizeAllocator::from_settings(&settings.allocation),
            log_diagnostics: settings.allocation.log_diagnostics,
        })
    }

    pub fn root(&self) -> NodeId { self.root }

    /// Number of live nodes.
    pub fn len(&self) -> usize { self.tree.map.len() }

    pub fn is_empty(&self) -> bool { self.tree.map.is_empty() }

    pub fn settings(&self) -> &TreeSettings { &self.settings }

    pub fn container(&self, node: NodeId) -> Option<&Container> { self.tree.data.get(node) }

    pub fn container_mut(&mut self, node: NodeId) -> Option<&mut Container> {
        self.tree.data.containers.get_mut(node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] { node.children(&self.tree.map) }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { node.parent(&self.tree.map) }

    pub fn map(&self) -> &NodeMap { &self.tree.map }

    /// Whether `node` is alive and hangs below the root.
    pub fn contains(&self, node: NodeId) -> bool {
        node.ancestors(&self.tree.map).last() == Some(self.root)
    }

    // Search

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.preorder().find(|&n| self.container(n).is_some_and(|c| c.id == id))
    }

    pub fn find_by_url(&self, url: &str) -> Option<NodeId> {
        self.preorder().find(|&n| self.container(n).and_then(Container::url) == Some(url))
    }

    pub fn find_first_by_kind(&self, kind: ContainerKind) -> Option<NodeId> {
        self.preorder().find(|&n| self.kind_of(n) == Some(kind))
    }

    pub fn find_all_by_kind(&self, kind: ContainerKind) -> Vec<NodeId> {
        self.preorder().filter(|&n| self.kind_of(n) == Some(kind)).collect()
    }

    /// First node, in pre-order, with a direct child carrying `id`.
    pub fn find_parent_by_id(&self, id: &str) -> Option<NodeId> {
        self.preorder().find(|&n| self.child_with_id(n, id).is_some())
    }

    // Removal

    /// Removes the first container carrying `id` and hands its subtree back.
    /// The root cannot be removed.
    pub fn remove_by_id(&mut self, id: &str) -> Option<ContainerConfig> {
        let parent = self.find_parent_by_id(id)?;
        let child = self.child_with_id(parent, id)?;
        Some(self.take_subtree(child))
    }

    /// Removes `node` from `parent`, falling back to the node's recorded
    /// parent and then to a search by id.
    pub fn remove_by_node(
        &mut self,
        node: NodeId,
        parent: Option<NodeId>,
    ) -> Option<ContainerConfig> {
        let id = self.container(node)?.id.clone();
        let parent = parent
            .filter(|&p| self.container(p).is_some())
            .or_else(|| self.parent(node))
            .or_else(|| self.find_parent_by_id(id.as_str()))?;
        let Some(child) = self.child_with_id(parent, id.as_str()) else {
            debug!(%id, ?parent, "remove_by_node: not a child of the resolved parent");
            return None;
        };
        Some(self.take_subtree(child))
    }

    // Pruning

    /// Removes every childless simple container, sweeping children before
    /// their parent so emptied parents go in the same pass. Returns how many
    /// containers were removed.
    pub fn remove_empty_nodes(&mut self) -> usize {
        let candidates: Vec<_> = self.root.traverse_postorder(&self.tree.map).collect();
        let mut removed = 0;
        for node in candidates {
            if node == self.root
                || !self.kind_of(node).is_some_and(ContainerKind::is_pure)
                || !node.is_empty(&self.tree.map)
            {
                continue;
            }
            trace!(?node, "removing empty container");
            node.detach(&mut self.tree).remove();
            removed += 1;
        }
        removed
    }

    /// Replaces every simple container that has exactly one child by that
    /// child. Returns how many containers were dissolved.
    pub fn collapse_unnecessary_nesting(&mut self) -> usize {
        let mut stack = vec![self.root];
        let mut collapsed = 0;
        while let Some(node) = stack.pop() {
            let map = &self.tree.map;
            let children = node.children(map);
            let redundant = node.parent(map).is_some()
                && children.len() == 1
                && self.kind_of(node).is_some_and(ContainerKind::is_pure);
            if redundant {
                // The child now sits in the dissolved node's slot and may
                // itself be redundant.
                stack.push(children[0]);
                trace!(?node, "collapsing single-child container");
                node.detach(&mut self.tree).dissolve();
                collapsed += 1;
            } else {
                stack.extend(children.iter().rev().copied());
            }
        }
        collapsed
    }

    // Moves

    /// Moves `source` next to `target` as described by `kind`.
    ///
    /// `target_parent` and `index` are trusted to describe where `target`
    /// lives. Returns `false` when the call was a no-op.
    pub fn move_node(
        &mut self,
        source: NodeId,
        target: NodeId,
        target_parent: NodeId,
        index: usize,
        kind: InsertKind,
    ) -> bool {
        let (Some(src), Some(dst)) = (self.container(source), self.container(target)) else {
            debug!(?source, ?target, "move_node: unknown node");
            return false;
        };
        if src.id == dst.id {
            debug!(id = %src.id, "move_node: source and target are the same container");
            return false;
        }
        if kind == InsertKind::Middle {
            self.swap_content(source, target);
            return true;
        }
        if source == self.root || !self.contains(source) {
            debug!(?source, "move_node: source cannot be moved");
            return false;
        }
        if !self.contains(target_parent) {
            debug!(?target_parent, "move_node: unknown target parent");
            return false;
        }
        let map = &self.tree.map;
        if target.is_within(source, map) || target_parent.is_within(source, map) {
            debug!(?source, ?target, "move_node: target lies inside the moved subtree");
            return false;
        }

        let Some(orientation) = kind.orientation() else {
            return false;
        };
        let leading = kind.is_leading();

        let Some(placeholder) = self.replace_with_placeholder(source) else {
            return false;
        };

        let index = index.min(target_parent.child_count(&self.tree.map));
        let slot = if leading { index } else { index + 1 };
        let parent_orientation = self.container(target_parent).map(|c| c.orientation);

        if parent_orientation == Some(orientation) {
            source.detach(&mut self.tree).insert_at(target_parent, slot);
        } else if self.has_placeholder_pair(target_parent) {
            if let Some(parent) = self.container_mut(target_parent) {
                parent.orientation = orientation;
            }
            let slot = if leading { 0 } else { slot };
            source.detach(&mut self.tree).insert_at(target_parent, slot);
            self.check_simple_and_clean(target_parent, false);
        } else {
            self.wrap_target(target, source, orientation, leading);
        }

        self.remove_by_id(placeholder.as_str());
        if self.settings.collapse_after_move {
            self.collapse_unnecessary_nesting();
        }
        if self.settings.prune_empty_after_move {
            self.remove_empty_nodes();
        }
        if self.settings.log_tree_after_move {
            trace!("tree after move:\n{}", self.draw_tree());
        }
        true
    }

    /// Splices `node`'s children into its parent when both share an
    /// orientation, reversing them first when asked to.
    pub fn check_simple_and_clean(&mut self, node: NodeId, reverse: bool) -> bool {
        let Some(container) = self.container(node) else { return false };
        let Some(ancestor) = self.parent(node) else { return false };
        if !container.kind.is_pure()
            || self.container(ancestor).map(|c| c.orientation) != Some(container.orientation)
        {
            return false;
        }
        if reverse {
            self.tree.map.reverse_children(node);
        }
        trace!(?node, ?ancestor, "merging container into same-orientation ancestor");
        node.detach(&mut self.tree).dissolve();
        true
    }

    /// Attaches a new subtree under `parent` at `index` (clamped).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        config: ContainerConfig,
    ) -> Result<NodeId, TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::UnknownNode(parent));
        }
        let plan = plan(config)?;
        Ok(materialize(&mut self.tree, plan, Some((parent, index))))
    }

    // Export

    pub fn to_config(&self) -> ContainerConfig {
        self.subtree_config(self.root).unwrap_or_default()
    }

    /// Nested snapshot of the subtree at `node`. Render handles are shared.
    pub fn subtree_config(&self, node: NodeId) -> Option<ContainerConfig> {
        self.container(node)?;
        let mut done: SecondaryMap<NodeId, ContainerConfig> = SecondaryMap::new();
        for n in node.traverse_postorder(&self.tree.map) {
            let mut config = self
                .container(n)
                .cloned()
                .map(ContainerConfig::from_container)
                .unwrap_or_default();
            config.children =
                n.children(&self.tree.map).iter().filter_map(|&c| done.remove(c)).collect();
            done.insert(n, config);
        }
        done.remove(node)
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_tree(self.root);
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    /// Runs the size allocator over `node`'s children.
    pub fn allocate(&self, node: NodeId) -> Option<Allocation> {
        let container = self.container(node)?;
        let requests: Vec<SizeRequest> = self
            .children(node)
            .iter()
            .filter_map(|&c| self.container(c))
            .map(SizeRequest::from)
            .collect();
        let allocation = self.allocator.allocate(&requests, container.orientation);
        if self.log_diagnostics {
            for diagnostic in &allocation.diagnostics {
                warn!(id = %container.id, "{diagnostic}");
            }
        }
        Some(allocation)
    }

    /// Verifies parent links, single ownership, acyclicity and reachability.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let map = &self.tree.map;
        if self.root.parent(map).is_some() {
            return Err(TreeError::RootHasParent(self.root));
        }
        if !map.contains(self.root) {
            return Err(TreeError::UnknownNode(self.root));
        }

        let mut seen: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if seen.insert(node, ()).is_some() {
                return Err(TreeError::Cycle(node));
            }
            if self.container(node).is_none() {
                return Err(TreeError::MissingPayload(node));
            }
            let children = node.children(map);
            for (i, &child) in children.iter().enumerate() {
                if !map.contains(child) {
                    return Err(TreeError::UnknownNode(child));
                }
                if children[..i].contains(&child) {
                    return Err(TreeError::DuplicateChild { parent: node, child });
                }
                let recorded = child.parent(map);
                if recorded != Some(node) {
                    return Err(TreeError::ParentMismatch {
                        child,
                        recorded,
                        actual: Some(node),
                    });
                }
            }
            stack.extend(children.iter().copied());
        }

        match map.keys().find(|&n| !seen.contains_key(n)) {
            Some(stray) => Err(TreeError::Unreachable(stray)),
            None => Ok(()),
        }
    }

    fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.traverse_preorder(&self.tree.map)
    }

    fn kind_of(&self, node: NodeId) -> Option<ContainerKind> { self.container(node).map(|c| c.kind) }

    fn child_with_id(&self, parent: NodeId, id: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.container(c).is_some_and(|c| c.id == id))
    }

    fn has_placeholder_pair(&self, parent: NodeId) -> bool {
        let children = self.children(parent);
        children.len() == 2
            && children.iter().any(|&c| self.container(c).is_some_and(Container::is_placeholder))
    }

    fn alloc(&mut self, container: Container) -> NodeId {
        let node = self.tree.mk_node().into_id();
        self.tree.data.set(node, container);
        node
    }

    /// Detaches the subtree at `node` from the forest, moving its payloads
    /// into the returned description.
    fn take_subtree(&mut self, node: NodeId) -> ContainerConfig {
        let mut done: SecondaryMap<NodeId, ContainerConfig> = SecondaryMap::new();
        let order: Vec<_> = node.traverse_postorder(&self.tree.map).collect();
        for n in order {
            let mut config = self
                .tree
                .data
                .containers
                .remove(n)
                .map(ContainerConfig::from_container)
                .unwrap_or_default();
            config.children =
                n.children(&self.tree.map).iter().filter_map(|&c| done.remove(c)).collect();
            done.insert(n, config);
        }
        node.detach(&mut self.tree).remove();
        done.remove(node).unwrap_or_default()
    }

    fn swap_content(&mut self, a: NodeId, b: NodeId) {
        let containers = &mut self.tree.data.containers;
        let Some(first) = containers.get_mut(a).map(|c| mem::take(&mut c.content)) else {
            return;
        };
        let second = match containers.get_mut(b) {
            Some(c) => mem::replace(&mut c.content, first),
            None => first,
        };
        if let Some(c) = containers.get_mut(a) {
            c.content = second;
        }
        trace!(?a, ?b, "swapped content");
    }

    /// Puts a fresh placeholder in `source`'s slot, leaving `source` as a
    /// detached root. Returns the placeholder's id.
    fn replace_with_placeholder(&mut self, source: NodeId) -> Option<ContainerId> {
        let placeholder = Container::placeholder();
        let id = placeholder.id.clone();
        let node = self.alloc(placeholder);
        if node.detach(&mut self.tree).replace(source).is_none() {
            node.detach(&mut self.tree).remove();
            return None;
        }
        Some(id)
    }

    /// Wraps `target` in a new simple container holding `target` and
    /// `source` in the order given by `leading`.
    fn wrap_target(
        &mut self,
        target: NodeId,
        source: NodeId,
        orientation: Orientation,
        leading: bool,
    ) {
        let (ratio, min_size) =
            self.container(target).map(|c| (c.ratio, c.min_size)).unwrap_or_default();
        let mut wrapper = Container::wrapper(orientation);
        wrapper.ratio = ratio;
        wrapper.min_size = min_size;
        let wrapper = self.alloc(wrapper);

        if target == self.root {
            self.root = wrapper;
        } else if wrapper.detach(&mut self.tree).replace(target).is_none() {
            wrapper.detach(&mut self.tree).remove();
            return;
        }
        let (first, second) = if leading { (source, target) } else { (target, source) };
        first.detach(&mut self.tree).push_back(wrapper);
        second.detach(&mut self.tree).push_back(wrapper);
        debug!(?wrapper, ?target, %orientation, "wrapped drop target");
    }

    fn ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let desc = match self.container(node) {
            Some(c) => {
                let mut desc = format!("{:?} {} {}", c.kind, c.id, c.orientation);
                if let Some(ratio) = c.ratio {
                    desc.push_str(&format!(" ratio={ratio}"));
                }
                if let Some(url) = c.url() {
                    desc.push_str(&format!(" url={url}"));
                }
                desc
            }
            None => format!("{node:?} <no container>"),
        };
        let children: Vec<_> = self.children(node).iter().map(|&c| self.ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}

/// Validated containers in pre-order, each with the plan index of its parent.
type Plan = Vec<(Container, Option<usize>)>;

fn plan(config: ContainerConfig) -> Result<Plan, TreeError> {
    let mut plan = Vec::with_capacity(config.count());
    let mut stack = vec![(config, None)];
    while let Some((mut config, parent)) = stack.pop() {
        let index = plan.len();
        plan.push((config.to_container()?, parent));
        let children = mem::take(&mut config.children);
        stack.extend(children.into_iter().rev().map(|c| (c, Some(index))));
    }
    Ok(plan)
}

fn materialize(
    tree: &mut Tree<Containers>,
    plan: Plan,
    attach: Option<(NodeId, usize)>,
) -> NodeId {
    let mut nodes: Vec<NodeId> = Vec::with_capacity(plan.len());
    for (container, parent) in plan {
        let node = match parent.and_then(|p| nodes.get(p).copied()) {
            Some(parent) => tree.mk_node().push_back(parent),
            None => match attach {
                Some((parent, index)) => tree.mk_node().insert_at(parent, index),
                None => tree.mk_node().into_id(),
            },
        };
        tree.data.set(node, container);
        nodes.push(node);
    }
    nodes[0]
}
