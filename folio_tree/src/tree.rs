// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, mutation, queries.

use std::rc::Rc;

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{Result, TreeError};
use crate::source::NodeSource;
use crate::types::{DataMap, DocType, NodeId, TreeOptions};
use crate::util::{KeyGen, is_partial_shallow_equal};

/// Callback invoked with a node's new data after a successful [`Tree::update`].
pub type RenderHook = Box<dyn FnMut(NodeId, &DataMap)>;

/// Callback invoked with a node's new child list (or `None` when it became a leaf) after
/// [`Tree::concat`], [`Tree::splice`] or [`Tree::replace`].
pub type ChildrenHook = Box<dyn FnMut(NodeId, Option<&[NodeId]>)>;

/// Document node tree.
///
/// Nodes are owned by the tree and addressed by [`NodeId`]. Each node has a type tag, a
/// stable string key, an opaque [`DataMap`] payload, and an optional ordered child list.
///
/// Child lists are copy-on-write: every structural mutator installs a fresh list, so a list
/// obtained from [`Tree::children`] is a stable snapshot even if the tree changes while it
/// is being walked.
///
/// Nodes removed from their parent by [`Tree::splice`], [`Tree::replace`] or
/// [`Tree::detach`] stay alive as detached roots. They can be inserted somewhere else, or
/// released with [`Tree::remove`].
///
/// ## Example
///
/// ```rust
/// use folio_tree::{DocType, NodeSource, Tree, TreeOptions};
///
/// let mut tree = Tree::with_options(TreeOptions::sequential("n"));
/// let p = tree
///     .build(
///         &NodeSource::new(DocType::Paragraph)
///             .with_child(NodeSource::text("a"))
///             .with_child(NodeSource::text("b")),
///     )
///     .unwrap();
///
/// let kids = tree.children(p).unwrap().unwrap();
/// let fresh = tree.build(&NodeSource::text("B")).unwrap();
/// let removed = tree.replace(p, &[fresh], kids[1], kids[1]).unwrap();
///
/// assert_eq!(removed, vec![kids[1]]);
/// assert_eq!(tree.index_of(p, fresh).unwrap(), Some(1));
/// assert_eq!(tree.parent_of(kids[1]).unwrap(), None);
/// ```
pub struct Tree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    keys: HashMap<String, NodeId>,
    key_gen: KeyGen,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Node {
    generation: u32,
    kind: DocType,
    key: String,
    data: Rc<DataMap>,
    parent: Option<NodeId>,
    children: Option<Rc<[NodeId]>>,
    render: Option<RenderHook>,
    render_children: Option<ChildrenHook>,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Create an empty tree with random keys.
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    /// Create an empty tree with explicit options.
    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            keys: HashMap::new(),
            key_gen: KeyGen::new(options.keys),
        }
    }

    // --- construction ---

    /// Materialize a subtree from its source description and return its (detached) root.
    ///
    /// Children are created before their parent. An empty `children` array is stored as
    /// "no children". Keys are checked for uniqueness before anything is allocated, so a
    /// failed build leaves the tree untouched.
    pub fn build(&mut self, source: &NodeSource) -> Result<NodeId> {
        let mut seen = hashbrown::HashSet::new();
        self.check_source_keys(source, &mut seen)?;
        let id = self.alloc_subtree(source, &seen);
        trace!(root = %id, "built subtree");
        Ok(id)
    }

    /// Parse a JSON source description and [`build`](Self::build) it.
    pub fn build_json(&mut self, json: &str) -> Result<NodeId> {
        let source: NodeSource = serde_json::from_str(json)?;
        self.build(&source)
    }

    fn check_source_keys<'a>(
        &self,
        source: &'a NodeSource,
        seen: &mut hashbrown::HashSet<&'a str>,
    ) -> Result<()> {
        if let Some(key) = source.id.as_deref()
            && (self.keys.contains_key(key) || !seen.insert(key))
        {
            return Err(TreeError::DuplicateKey(key.into()));
        }
        for child in source.children.iter().flatten() {
            self.check_source_keys(child, seen)?;
        }
        Ok(())
    }

    /// `reserved` holds the explicit keys of the whole source, some of which are not
    /// allocated yet.
    fn alloc_subtree(
        &mut self,
        source: &NodeSource,
        reserved: &hashbrown::HashSet<&str>,
    ) -> NodeId {
        let children: Vec<NodeId> = source
            .children
            .iter()
            .flatten()
            .map(|child| self.alloc_subtree(child, reserved))
            .collect();
        let key = match &source.id {
            Some(key) => key.clone(),
            None => self.fresh_key(reserved),
        };
        let children = (!children.is_empty()).then(|| Rc::<[NodeId]>::from(children));
        let id = self.alloc(source.kind, key, source.data.clone(), children.clone());
        for child in children.iter().flat_map(|c| c.iter()) {
            self.node_mut(*child).parent = Some(id);
        }
        id
    }

    fn fresh_key(&mut self, reserved: &hashbrown::HashSet<&str>) -> String {
        loop {
            let key = self.key_gen.next_key();
            if !self.keys.contains_key(&key) && !reserved.contains(key.as_str()) {
                return key;
            }
        }
    }

    fn alloc(
        &mut self,
        kind: DocType,
        key: String,
        data: DataMap,
        children: Option<Rc<[NodeId]>>,
    ) -> NodeId {
        let node = |generation| Node {
            generation,
            kind,
            key: key.clone(),
            data: Rc::new(data),
            parent: None,
            children,
            render: None,
            render_children: None,
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node(generation));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(node(generation)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        self.keys.insert(key, id);
        id
    }

    /// Release a detached node and its whole subtree.
    ///
    /// Every handle into the subtree becomes stale and the keys become available again.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        let node = self.try_node(id)?;
        if node.parent.is_some() {
            return Err(TreeError::StillAttached(id));
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.nodes[cur.idx()].take() else {
                unreachable!("subtree members are live");
            };
            stack.extend(node.children.iter().flat_map(|c| c.iter().copied()));
            self.keys.remove(&node.key);
            self.free_list.push(cur.idx());
        }
        trace!(node = %id, "removed subtree");
        Ok(())
    }

    // --- data ---

    /// Shallow-merge `partial` into the node's data.
    ///
    /// If every field of `partial` already holds an equal value nothing happens and `false`
    /// is returned. Otherwise a new data map replaces the old one (which is left intact for
    /// anyone still holding it), the render hook is invoked, and `true` is returned.
    pub fn update(&mut self, id: NodeId, partial: DataMap) -> Result<bool> {
        let node = self.try_node_mut(id)?;
        if is_partial_shallow_equal(&partial, &node.data) {
            debug!(node = %id, "update is a no-op");
            return Ok(false);
        }
        let mut next = DataMap::clone(&node.data);
        next.extend(partial);
        node.data = Rc::new(next);
        trace!(node = %id, "data updated");
        if let Some(render) = node.render.as_mut() {
            render(id, &node.data);
        }
        Ok(true)
    }

    // --- structure ---

    /// Append `items` to the node's children, creating the list if the node is a leaf.
    ///
    /// Returns the resulting child list (empty if the node is still a leaf).
    pub fn concat(&mut self, id: NodeId, items: &[NodeId]) -> Result<Rc<[NodeId]>> {
        let current = self.try_node(id)?.children.clone();
        if items.is_empty() {
            return Ok(current.unwrap_or_else(|| Rc::from(Vec::new())));
        }
        self.check_insertable(id, items, &[])?;
        let mut next: Vec<NodeId> = current.as_deref().unwrap_or_default().to_vec();
        next.extend_from_slice(items);
        let next: Rc<[NodeId]> = Rc::from(next);
        self.relink(id, &[], items);
        trace!(node = %id, added = items.len(), "concat");
        self.set_children(id, Some(next.clone()));
        Ok(next)
    }

    /// Position of `child` among the direct children of `id`, if present.
    pub fn index_of(&self, id: NodeId, child: NodeId) -> Result<Option<usize>> {
        Ok(self
            .try_node(id)?
            .children
            .as_deref()
            .and_then(|c| c.iter().position(|&n| n == child)))
    }

    /// Last position of `child` among the direct children of `id`, if present.
    pub fn last_index_of(&self, id: NodeId, child: NodeId) -> Result<Option<usize>> {
        Ok(self
            .try_node(id)?
            .children
            .as_deref()
            .and_then(|c| c.iter().rposition(|&n| n == child)))
    }

    /// Ordered-sequence splice on the node's children.
    ///
    /// Starting at `start` (clamped to the list length), removes `delete_count` elements, or
    /// everything to the end when `delete_count` is `None`, then inserts `items` there.
    /// Returns the removed nodes, which become detached.
    ///
    /// A list emptied by `splice` stays an (empty) list; only [`Tree::replace`] collapses
    /// a node back to a leaf.
    pub fn splice(
        &mut self,
        id: NodeId,
        start: usize,
        delete_count: Option<usize>,
        items: &[NodeId],
    ) -> Result<Vec<NodeId>> {
        let Some(current) = self.try_node(id)?.children.clone() else {
            return Err(TreeError::EmptyChildren(id));
        };
        let mut next = current.to_vec();
        let start = start.min(next.len());
        let available = next.len() - start;
        let count = delete_count.map_or(available, |n| n.min(available));
        self.check_insertable(id, items, &next[start..start + count])?;
        let removed: Vec<NodeId> = next
            .splice(start..start + count, items.iter().copied())
            .collect();
        self.relink(id, &removed, items);
        trace!(node = %id, start, removed = removed.len(), inserted = items.len(), "splice");
        self.set_children(id, Some(Rc::from(next)));
        Ok(removed)
    }

    /// Replace the inclusive run of siblings between `from` and `to` with `candidates`.
    ///
    /// Both endpoints must be direct children of `id`; their order does not matter. If the
    /// resulting list is empty the node becomes a leaf. Returns the removed run, whose
    /// nodes become detached.
    pub fn replace(
        &mut self,
        id: NodeId,
        candidates: &[NodeId],
        from: NodeId,
        to: NodeId,
    ) -> Result<Vec<NodeId>> {
        let Some(current) = self.try_node(id)?.children.clone() else {
            return Err(TreeError::EmptyChildren(id));
        };
        let find = |child: NodeId| {
            current
                .iter()
                .position(|&n| n == child)
                .ok_or(TreeError::StructuralMismatch { parent: id, child })
        };
        let mut from_idx = find(from)?;
        let mut to_idx = if from == to { from_idx } else { find(to)? };
        if to_idx < from_idx {
            core::mem::swap(&mut from_idx, &mut to_idx);
        }
        self.check_insertable(id, candidates, &current[from_idx..=to_idx])?;

        let mut next = current.to_vec();
        let removed: Vec<NodeId> = next
            .splice(from_idx..=to_idx, candidates.iter().copied())
            .collect();
        self.relink(id, &removed, candidates);
        trace!(node = %id, from = from_idx, to = to_idx, inserted = candidates.len(), "replace");
        let next = (!next.is_empty()).then(|| Rc::from(next));
        self.set_children(id, next);
        Ok(removed)
    }

    /// Remove the node from its parent's children.
    ///
    /// Equivalent to `replace(parent, &[], id, id)`. The node stays alive as a detached root.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.try_node(id)?.parent else {
            return Err(TreeError::InvalidDetach(id));
        };
        self.replace(parent, &[], id, id)?;
        Ok(())
    }

    /// Ensure `items` may be inserted under `parent`.
    ///
    /// `releasing` lists children of `parent` removed by the same operation; they count as
    /// detached.
    fn check_insertable(&self, parent: NodeId, items: &[NodeId], releasing: &[NodeId]) -> Result<()> {
        let mut ancestors: SmallVec<[NodeId; 16]> = SmallVec::new();
        let mut cur = Some(parent);
        while let Some(n) = cur {
            ancestors.push(n);
            cur = self.node(n).parent;
        }
        for (i, &item) in items.iter().enumerate() {
            let node = self.try_node(item)?;
            if items[..i].contains(&item) {
                return Err(TreeError::AlreadyAttached(item));
            }
            if node.parent.is_some() && !releasing.contains(&item) {
                return Err(TreeError::AlreadyAttached(item));
            }
            if ancestors.contains(&item) {
                return Err(TreeError::WouldCycle { node: item, parent });
            }
        }
        Ok(())
    }

    fn relink(&mut self, parent: NodeId, removed: &[NodeId], inserted: &[NodeId]) {
        for &n in removed {
            self.node_mut(n).parent = None;
        }
        for &n in inserted {
            self.node_mut(n).parent = Some(parent);
        }
    }

    fn set_children(&mut self, id: NodeId, children: Option<Rc<[NodeId]>>) {
        let node = self.node_mut(id);
        node.children = children;
        if let Some(render_children) = node.render_children.as_mut() {
            render_children(id, node.children.as_deref());
        }
    }

    // --- hooks ---

    /// Install (or clear, with `None`) the data render hook of a node.
    pub fn set_render_hook(&mut self, id: NodeId, hook: Option<RenderHook>) -> Result<()> {
        self.try_node_mut(id)?.render = hook;
        Ok(())
    }

    /// Install (or clear, with `None`) the children render hook of a node.
    pub fn set_children_hook(&mut self, id: NodeId, hook: Option<ChildrenHook>) -> Result<()> {
        self.try_node_mut(id)?.render_children = hook;
        Ok(())
    }

    // --- queries ---

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Returns true if the tree holds no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a live node by key.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// Type tag of a node.
    pub fn kind(&self, id: NodeId) -> Result<DocType> {
        Ok(self.try_node(id)?.kind)
    }

    /// Stable key of a node.
    pub fn key(&self, id: NodeId) -> Result<&str> {
        Ok(self.try_node(id)?.key.as_str())
    }

    /// Current data of a node. The returned map never changes; updates install a new one.
    pub fn data(&self, id: NodeId) -> Result<Rc<DataMap>> {
        Ok(self.try_node(id)?.data.clone())
    }

    /// Snapshot of a node's children, or `None` for a leaf.
    pub fn children(&self, id: NodeId) -> Result<Option<Rc<[NodeId]>>> {
        Ok(self.try_node(id)?.children.clone())
    }

    /// Parent of a node, or `None` for roots and detached nodes.
    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.try_node(id)?.parent)
    }

    /// Ancestors from `origin` down to `node`, both included.
    pub fn path_to(&self, node: NodeId, origin: NodeId) -> Result<Vec<NodeId>> {
        self.try_node(origin)?;
        let mut path = Vec::new();
        let mut cur = node;
        loop {
            path.push(cur);
            if cur == origin {
                break;
            }
            match self.try_node(cur)?.parent {
                Some(p) => cur = p,
                None => return Err(TreeError::NotADescendant { node, origin }),
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Next node in depth-first (document) order.
    ///
    /// Returns `None` if no next node exists or if `current` is stale.
    pub fn next_depth_first(&self, current: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(&first_child) = self.child_slice(current).first() {
            return Some(first_child);
        }
        let mut node = current;
        while let Some(parent) = self.node(node).parent {
            if let Some(next_sibling) = self.next_sibling(node) {
                return Some(next_sibling);
            }
            node = parent;
        }
        None
    }

    /// Previous node in depth-first (document) order.
    ///
    /// Returns `None` if no previous node exists or if `current` is stale.
    pub fn prev_depth_first(&self, current: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(prev_sibling) = self.prev_sibling(current) {
            return Some(self.last_in_subtree(prev_sibling));
        }
        self.node(current).parent
    }

    fn child_slice(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children.as_deref().unwrap_or_default()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.child_slice(self.node(node).parent?);
        let pos = siblings.iter().position(|&id| id == node)?;
        siblings.get(pos + 1).copied()
    }

    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.child_slice(self.node(node).parent?);
        let pos = siblings.iter().position(|&id| id == node)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    fn last_in_subtree(&self, mut node: NodeId) -> NodeId {
        while let Some(&last) = self.child_slice(node).last() {
            node = last;
        }
        node
    }

    // --- internals ---

    fn try_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.idx())
            .and_then(|slot| slot.as_ref())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::StaleNode(id))
    }

    fn try_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|slot| slot.as_mut())
            .filter(|n| n.generation == id.1)
            .ok_or(TreeError::StaleNode(id))
    }

    /// Access a node already known to be live; panics if `id` is stale.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably when already known to be live; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }
}
