use std::ops::Index;

use slotmap::SlotMap;

/// N-ary tree with ordered children.
///
/// Structure lives in [`NodeMap`]; anything attached to a node is kept by the
/// observer `O`, which is told when nodes enter and leave the forest.
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::new(), data } }

    /// Allocates a node that is not yet part of any tree.
    pub fn mk_node(&mut self) -> UnattachedNode<'_, O> {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        UnattachedNode { id, tree: self }
    }
}

/// Map that holds the structure of the tree.
///
/// Nodes that have been detached but not yet reattached or removed stay in the
/// map as parentless roots.
#[derive(Default)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    pub fn keys(&self) -> impl Iterator<Item = NodeId> + '_ { self.map.keys() }

    pub(crate) fn reverse_children(&mut self, id: NodeId) {
        if let Some(node) = self.map.get_mut(id) {
            node.children.reverse();
        }
    }

    /// Removes `id` from its parent's child list. Returns the former parent
    /// and the slot the node occupied.
    fn unlink(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.map.get_mut(id)?.parent.take()?;
        let siblings = &mut self.map.get_mut(parent)?.children;
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.remove(index);
        Some((parent, index))
    }

    fn link_at(&mut self, id: NodeId, parent: NodeId, index: usize) {
        let Some(parent_node) = self.map.get_mut(parent) else {
            return;
        };
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id);
        if let Some(node) = self.map.get_mut(id) {
            node.parent = Some(parent);
        }
    }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    #[track_caller]
    pub fn detach<'a, O: Observer>(self, tree: &'a mut Tree<O>) -> DetachedNode<'a, O> {
        DetachedNode { id: self, tree }
    }

    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    pub fn children(self, map: &NodeMap) -> &[NodeId] {
        map.map.get(self).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn child_count(self, map: &NodeMap) -> usize { self.children(map).len() }

    pub fn is_empty(self, map: &NodeMap) -> bool { self.children(map).is_empty() }

    /// Position of this node among its parent's children.
    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map).iter().position(|&c| c == self)
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = map.contains(self).then_some(self);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| n.parent(map));
            node
        })
    }

    /// True when `self` is `ancestor` or lies somewhere below it.
    pub fn is_within(self, ancestor: NodeId, map: &NodeMap) -> bool {
        self.ancestors(map).any(|n| n == ancestor)
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal::new(map, self)
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal::new(map, self)
    }
}

pub trait Observer
where Self: Sized {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}

#[must_use = "Unattached nodes should be inserted into the tree or kept as a root"]
pub struct UnattachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> UnattachedNode<'a, O> {
    /// Consumes this unattached node and returns its `NodeId`. The node stays
    /// in the forest as a root until attached or removed.
    pub fn into_id(self) -> NodeId { self.id }

    pub fn push_back(self, parent: NodeId) -> NodeId {
        let index = parent.child_count(&self.tree.map);
        self.insert_at(parent, index)
    }

    pub fn insert_at(self, parent: NodeId, index: usize) -> NodeId {
        self.id.detach(self.tree).insert_at(parent, index)
    }
}

/// A node about to be moved or removed.
///
/// Nothing happens to the tree until one of the consuming methods is called.
#[must_use = "Detached nodes should be reattached to the tree or removed"]
pub struct DetachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> DetachedNode<'a, O> {
    /// Moves the node to `index` among `parent`'s children. The index is
    /// interpreted after the node has left its old position and is clamped
    /// to the child count.
    ///
    /// Attaching a node under itself or one of its descendants is ignored.
    pub fn insert_at(mut self, parent: NodeId, index: usize) -> NodeId {
        let map = &self.tree.map;
        if !map.contains(self.id) || !map.contains(parent) || parent.is_within(self.id, map) {
            return self.id;
        }
        let old_parent = self.unlink_with_events();
        self.tree.map.link_at(self.id, parent, index);
        if old_parent != Some(parent) {
            self.tree.data.added_to_parent(&self.tree.map, self.id);
        }
        self.id
    }

    pub fn push_back(self, parent: NodeId) -> NodeId {
        let len = parent.child_count(&self.tree.map);
        let index = if self.id.parent(&self.tree.map) == Some(parent) { len - 1 } else { len };
        self.insert_at(parent, index)
    }

    /// Puts this node into the slot occupied by `old`. `old` keeps its
    /// subtree and stays in the forest as a parentless root.
    ///
    /// Returns `old`, or `None` if it had no parent to be replaced in.
    pub fn replace(mut self, old: NodeId) -> Option<NodeId> {
        let map = &self.tree.map;
        if self.id == old || !map.contains(self.id) || old.is_within(self.id, map) {
            return None;
        }
        let parent = old.parent(map)?;
        if parent.is_within(self.id, map) {
            return None;
        }
        self.unlink_with_events();
        let index = old.index_in_parent(&self.tree.map)?;
        old.detach(self.tree).unlink_with_events();
        self.insert_at(parent, index);
        Some(old)
    }

    /// Removes the node and puts its children into the slot it occupied,
    /// preserving their order. A parentless node is left untouched.
    pub fn dissolve(self) -> Vec<NodeId> {
        let map = &self.tree.map;
        let (Some(parent), Some(index)) = (self.id.parent(map), self.id.index_in_parent(map))
        else {
            return Vec::new();
        };
        let children = self.id.children(map).to_vec();
        for (offset, &child) in children.iter().enumerate() {
            child.detach(self.tree).insert_at(parent, index + offset + 1);
        }
        self.remove();
        children
    }

    /// Unlinks the node and drops its whole subtree from the forest.
    pub fn remove(mut self) {
        self.unlink_with_events();
        let doomed: Vec<_> = self.id.traverse_postorder(&self.tree.map).collect();
        for node in doomed {
            self.tree.data.removed_from_forest(&self.tree.map, node);
            self.tree.map.map.remove(node);
        }
    }

    fn unlink_with_events(&mut self) -> Option<NodeId> {
        let parent = self.id.parent(&self.tree.map)?;
        self.tree.data.removing_from_parent(&self.tree.map, self.id);
        self.tree.map.unlink(self.id);
        Some(parent)
    }
}

#[derive(Default, PartialEq, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct PreorderTraversal<'a> {
    stack: Vec<NodeId>,
    map: &'a NodeMap,
}

impl<'a> PreorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        let stack = if map.contains(root) { vec![root] } else { Vec::new() };
        Self { stack, map }
    }
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children(self.map).iter().rev().copied());
        Some(node)
    }
}

struct PostorderTraversal<'a> {
    // (node, index of the next child to descend into)
    stack: Vec<(NodeId, usize)>,
    map: &'a NodeMap,
}

impl<'a> PostorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        let stack = if map.contains(root) { vec![(root, 0)] } else { Vec::new() };
        Self { stack, map }
    }
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, next_child) = self.stack.last_mut()?;
            let node = *node;
            match node.children(self.map).get(*next_child) {
                Some(&child) => {
                    *next_child += 1;
                    self.stack.push((child, 0));
                }
                None => {
                    self.stack.pop();
                    return Some(node);
                }
            }
        }
    }
}
