//! Arena-based scene graph storage.
//!
//! The scene owns every node in a sparse-set arena with generational
//! indices: a [`NodeId`] is an index plus a generation, so a stale handle to
//! a removed (and possibly reallocated) slot is detected instead of silently
//! aliasing a new node. Nodes are stored contiguously for cache-friendly
//! traversal; removal swap-removes and fixes up the sparse map.
//!
//! Parent links are plain `NodeId`s into the owning arena, never owning
//! references, so the tree cannot form reference cycles.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::error::SceneError;
use crate::event::SceneMouseEvent;
use crate::transform::Transform;
use crate::visual::VisualObject;

/// Unique identifier for a node in the scene.
///
/// `index` addresses a sparse slot (reusable after removal); `generation`
/// increments when the slot is reused, so IDs from a previous occupant no
/// longer validate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

bitflags! {
    /// What changed since the canvas last consumed the scene.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChangeFlags: u8 {
        /// Appearance changed; the canvas should redraw.
        const NEEDS_REDRAW = 1 << 0;
        /// Structure changed; cached draw orders are invalid.
        const TOPOLOGY_CHANGED = 1 << 1;
    }
}

struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

/// Handler invoked when a mouse event resolves to a node.
pub type MouseHandler = Box<dyn FnMut(&mut SceneMouseEvent)>;

struct Node {
    visual: Option<Box<dyn VisualObject>>,
    parent: Option<NodeId>,
    /// Ordered: children draw (and linearize) in this order.
    children: Vec<NodeId>,
    visible: bool,
    transform: Transform,
    pick_id: Option<u32>,
    mouse_handler: Option<MouseHandler>,
    name: Option<String>,
    /// Back-pointer for swap-remove fixup.
    sparse_index: u32,
}

impl Node {
    fn empty(sparse_index: u32) -> Self {
        Self {
            visual: None,
            parent: None,
            children: Vec::new(),
            visible: true,
            transform: Transform::IDENTITY,
            pick_id: None,
            mouse_handler: None,
            name: None,
            sparse_index,
        }
    }
}

/// The scene graph: an arena of nodes under a fixed root.
///
/// The root exists for the scene's whole lifetime and cannot be removed.
/// Nodes carry an optional drawable (`Box<dyn VisualObject>`), a local
/// transform, a visibility flag and ordered children.
pub struct Scene {
    dense: Vec<Node>,
    sparse: Vec<Option<SparseEntry>>,
    free_indices: Vec<u32>,
    root: NodeId,
    /// Bumped on every structural change; keys draw-order caches.
    topology_serial: u64,
    changes: ChangeFlags,
    /// Changes accumulated while updates are suspended.
    pending: ChangeFlags,
    suspend_depth: u32,
    /// Scene-owned registry from pick identifier to node. IDs start at 1;
    /// 0 is the background.
    pick_registry: HashMap<u32, NodeId>,
    next_pick_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            root: NodeId::new(u32::MAX, u32::MAX),
            topology_serial: 0,
            changes: ChangeFlags::empty(),
            pending: ChangeFlags::empty(),
            suspend_depth: 0,
            pick_registry: HashMap::new(),
            next_pick_id: 1,
        };
        scene.root = scene.alloc(None);
        scene.changes = ChangeFlags::empty();
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn topology_serial(&self) -> u64 {
        self.topology_serial
    }

    fn alloc(&mut self, parent: Option<NodeId>) -> NodeId {
        let (sparse_index, generation) = if let Some(idx) = self.free_indices.pop() {
            let old_gen = self.sparse[idx as usize]
                .as_ref()
                .map(|e| e.generation)
                .unwrap_or(0);
            (idx, old_gen.wrapping_add(1))
        } else {
            let idx = self.sparse.len() as u32;
            self.sparse.push(None);
            (idx, 0)
        };

        let id = NodeId::new(sparse_index, generation);
        let dense_index = self.dense.len();
        let mut node = Node::empty(sparse_index);
        node.parent = parent;
        self.dense.push(node);
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });

        if let Some(parent) = parent {
            let parent_dense = self
                .dense_index(parent)
                .expect("parent validated by caller");
            self.dense[parent_dense].children.push(id);
        }
        self.touch_topology();
        id
    }

    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation)
            .map(|e| e.dense_index)
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.dense_index(id)
            .map(|idx| &self.dense[idx])
            .ok_or(SceneError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        match self.dense_index(id) {
            Some(idx) => Ok(&mut self.dense[idx]),
            None => Err(SceneError::StaleNode(id)),
        }
    }

    fn record(&mut self, flags: ChangeFlags) {
        if self.suspend_depth > 0 {
            self.pending |= flags;
        } else {
            self.changes |= flags;
        }
    }

    fn touch_topology(&mut self) {
        self.topology_serial += 1;
        self.record(ChangeFlags::NEEDS_REDRAW | ChangeFlags::TOPOLOGY_CHANGED);
    }

    /// Add an empty group node under `parent`.
    pub fn add_node(&mut self, parent: NodeId) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        Ok(self.alloc(Some(parent)))
    }

    /// Add a node carrying a drawable under `parent`. The node receives a
    /// pick identifier so picking passes can resolve it.
    pub fn add_visual(
        &mut self,
        parent: NodeId,
        visual: Box<dyn VisualObject>,
    ) -> Result<NodeId, SceneError> {
        let id = self.add_node(parent)?;
        let pick_id = self.next_pick_id;
        self.next_pick_id += 1;
        self.pick_registry.insert(pick_id, id);
        let node = self.node_mut(id)?;
        node.visual = Some(visual);
        node.pick_id = Some(pick_id);
        Ok(id)
    }

    /// Remove a node and its whole subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        self.node(id)?;

        // Detach from the parent first, then tear the subtree down
        // iteratively (no recursion, no parent fixups needed below the cut).
        let parent = self.dense[self.dense_index(id).unwrap()].parent;
        if let Some(parent) = parent {
            if let Some(parent_dense) = self.dense_index(parent) {
                self.dense[parent_dense].children.retain(|&c| c != id);
            }
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let dense_index = match self.dense_index(current) {
                Some(idx) => idx,
                None => continue,
            };
            stack.extend(self.dense[dense_index].children.iter().copied());

            if let Some(pick_id) = self.dense[dense_index].pick_id {
                self.pick_registry.remove(&pick_id);
            }

            let last = self.dense.len() - 1;
            self.dense.swap_remove(dense_index);
            if dense_index != last {
                let moved_sparse = self.dense[dense_index].sparse_index;
                if let Some(entry) = self.sparse[moved_sparse as usize].as_mut() {
                    entry.dense_index = dense_index;
                }
            }
            self.sparse[current.index as usize] = None;
            self.free_indices.push(current.index);
        }
        self.touch_topology();
        Ok(())
    }

    /// Move `child` under `new_parent`, detaching it from its current parent.
    ///
    /// Fails without mutating anything if the move would create a cycle.
    pub fn set_parent(&mut self, child: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        self.node(child)?;
        self.node(new_parent)?;
        if child == self.root {
            return Err(SceneError::WouldCycle {
                child,
                parent: new_parent,
            });
        }

        // Walk up from the prospective parent; meeting `child` means the
        // move would put a node under its own descendant.
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(SceneError::WouldCycle {
                    child,
                    parent: new_parent,
                });
            }
            cursor = self.node(current)?.parent;
        }

        let old_parent = self.node(child)?.parent;
        if old_parent == Some(new_parent) {
            return Ok(());
        }
        if let Some(old_parent) = old_parent {
            let old_dense = self.dense_index(old_parent).unwrap();
            self.dense[old_dense].children.retain(|&c| c != child);
        }
        let new_dense = self.dense_index(new_parent).unwrap();
        self.dense[new_dense].children.push(child);
        self.node_mut(child)?.parent = Some(new_parent);
        self.touch_topology();
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.node(id)?.children)
    }

    pub fn visible(&self, id: NodeId) -> Result<bool, SceneError> {
        Ok(self.node(id)?.visible)
    }

    /// Toggle visibility. An invisible node suppresses its whole subtree
    /// during drawing.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        if node.visible != visible {
            node.visible = visible;
            self.record(ChangeFlags::NEEDS_REDRAW);
        }
        Ok(())
    }

    pub fn transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        Ok(self.node(id)?.transform)
    }

    /// Set the node's local transform. A transform change never invalidates
    /// cached draw orders, only the rendered output.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.transform = transform;
        self.record(ChangeFlags::NEEDS_REDRAW);
        Ok(())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(id)?.name = Some(name.into());
        Ok(())
    }

    pub fn visual_mut(
        &mut self,
        id: NodeId,
    ) -> Result<Option<&mut Box<dyn VisualObject>>, SceneError> {
        Ok(self.node_mut(id)?.visual.as_mut())
    }

    pub fn has_visual(&self, id: NodeId) -> Result<bool, SceneError> {
        Ok(self.node(id)?.visual.is_some())
    }

    pub fn pick_id(&self, id: NodeId) -> Result<Option<u32>, SceneError> {
        Ok(self.node(id)?.pick_id)
    }

    /// Resolve a pick identifier read back from a picking pass.
    pub fn node_by_pick_id(&self, pick_id: u32) -> Option<NodeId> {
        self.pick_registry.get(&pick_id).copied()
    }

    /// Install a mouse handler on a node. Events whose pick resolution lands
    /// on this node (or on a descendant with no handler of its own) are
    /// delivered to it.
    pub fn set_mouse_handler(
        &mut self,
        id: NodeId,
        handler: impl FnMut(&mut SceneMouseEvent) + 'static,
    ) -> Result<(), SceneError> {
        self.node_mut(id)?.mouse_handler = Some(Box::new(handler));
        Ok(())
    }

    /// Deliver `event` to the handler on `event.target`, walking up the
    /// parent chain until a handler marks it handled. Returns whether any
    /// handler did.
    pub fn dispatch_mouse(&mut self, event: &mut SceneMouseEvent) -> bool {
        let mut cursor = Some(event.target);
        while let Some(current) = cursor {
            let dense_index = match self.dense_index(current) {
                Some(idx) => idx,
                None => return false,
            };
            // The handler is taken out for the call so it can freely borrow
            // the event without aliasing the scene.
            if let Some(mut handler) = self.dense[dense_index].mouse_handler.take() {
                handler(event);
                if let Some(idx) = self.dense_index(current) {
                    if self.dense[idx].mouse_handler.is_none() {
                        self.dense[idx].mouse_handler = Some(handler);
                    }
                }
                if event.handled {
                    return true;
                }
            }
            cursor = self.dense.get(dense_index).and_then(|n| n.parent);
        }
        false
    }

    /// Suspend change notification. Changes made while suspended coalesce
    /// and surface once the matching [`resume_updates`](Self::resume_updates)
    /// runs. Nested suspends stack.
    pub fn suspend_updates(&mut self) {
        self.suspend_depth += 1;
    }

    pub fn resume_updates(&mut self) {
        debug_assert!(self.suspend_depth > 0);
        self.suspend_depth = self.suspend_depth.saturating_sub(1);
        if self.suspend_depth == 0 && !self.pending.is_empty() {
            self.changes |= self.pending;
            self.pending = ChangeFlags::empty();
        }
    }

    /// Consume the accumulated change flags.
    pub fn take_changes(&mut self) -> ChangeFlags {
        std::mem::replace(&mut self.changes, ChangeFlags::empty())
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.dense.len()
    }

    /// The composed transform mapping `from`-local coordinates into the
    /// local frame of `to`. The two nodes need not be on one parent chain;
    /// the mapping goes up to their common ancestor and back down.
    /// `to = root` yields the node's document-space transform.
    pub fn node_transform(&self, from: NodeId, to: NodeId) -> Result<Transform, SceneError> {
        let common = self.common_ancestor(from, to)?;
        let up = self.transform_to_ancestor(from, common)?;
        let down = self.transform_to_ancestor(to, common)?;
        Ok(down.inverse().then(&up))
    }

    fn transform_to_ancestor(
        &self,
        id: NodeId,
        ancestor: NodeId,
    ) -> Result<Transform, SceneError> {
        let mut tr = Transform::IDENTITY;
        let mut cursor = id;
        while cursor != ancestor {
            let node = self.node(cursor)?;
            tr = node.transform.then(&tr);
            cursor = node.parent.ok_or(SceneError::StaleNode(ancestor))?;
        }
        Ok(tr)
    }

    /// The nearest node that is an ancestor-or-self of both `a` and `b`.
    /// Always succeeds for live nodes since every node descends from root.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Result<NodeId, SceneError> {
        let mut seen = Vec::new();
        let mut cursor = Some(a);
        while let Some(current) = cursor {
            seen.push(current);
            cursor = self.node(current)?.parent;
        }
        let mut cursor = Some(b);
        while let Some(current) = cursor {
            if seen.contains(&current) {
                return Ok(current);
            }
            cursor = self.node(current)?.parent;
        }
        Err(SceneError::StaleNode(b))
    }

    /// A human-readable indented rendering of the tree, for logs and debug.
    pub fn describe_tree(&self) -> String {
        let mut out = String::new();
        self.describe_into(self.root, 0, &mut out);
        out
    }

    fn describe_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = match self.node(id) {
            Ok(node) => node,
            Err(_) => return,
        };
        for _ in 0..depth {
            out.push_str("  ");
        }
        let label = match (&node.name, id == self.root) {
            (Some(name), _) => name.as_str(),
            (None, true) => "root",
            (None, false) if node.visual.is_some() => "visual",
            (None, false) => "node",
        };
        out.push_str(label);
        if !node.visible {
            out.push_str(" (hidden)");
        }
        if let Some(pick_id) = node.pick_id {
            out.push_str(&format!(" #{pick_id}"));
        }
        out.push('\n');
        for &child in &node.children {
            self.describe_into(child, depth + 1, out);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
