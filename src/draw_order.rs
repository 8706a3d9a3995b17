//! Linearized draw orders and their topology-keyed cache.
//!
//! A scene traversal is flattened into a sequence of enter/exit entries:
//! every node contributes an `enter` when the walk descends into it and an
//! `exit` when the walk leaves it. The canvas replays this sequence with a
//! transform stack and an invisibility barrier instead of recursing, so a
//! frame with an unchanged topology never re-walks the tree.

use std::collections::HashMap;
use std::rc::Rc;

use crate::scene::{NodeId, Scene};

/// One step of a linearized traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawEntry {
    pub node: NodeId,
    /// `true` when the walk descends into the node, `false` when it leaves.
    pub enter: bool,
}

struct CachedOrder {
    serial: u64,
    order: Rc<Vec<DrawEntry>>,
}

/// Caches linearized orders per subtree root, keyed by the scene's topology
/// serial. Transform and visibility changes never invalidate an entry; only
/// structural changes do.
#[derive(Default)]
pub struct DrawOrderCache {
    entries: HashMap<NodeId, CachedOrder>,
}

impl DrawOrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The linearized order of the subtree under `root`, rebuilt only when
    /// the scene's topology changed since the cached walk.
    pub fn get_or_build(&mut self, scene: &Scene, root: NodeId) -> Rc<Vec<DrawEntry>> {
        let serial = scene.topology_serial();
        if let Some(cached) = self.entries.get(&root) {
            if cached.serial == serial {
                return Rc::clone(&cached.order);
            }
        }
        log::debug!("rebuilding draw order for {root:?} at serial {serial}");
        let order = Rc::new(linearize(scene, root));
        self.entries.insert(
            root,
            CachedOrder {
                serial,
                order: Rc::clone(&order),
            },
        );
        order
    }

    pub fn is_cached(&self, scene: &Scene, root: NodeId) -> bool {
        self.entries
            .get(&root)
            .map(|c| c.serial == scene.topology_serial())
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Flatten the subtree under `root` into enter/exit entries, children in
/// order. Iterative so deep scenes cannot overflow the stack.
fn linearize(scene: &Scene, root: NodeId) -> Vec<DrawEntry> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((node, exiting)) = stack.pop() {
        if exiting {
            out.push(DrawEntry { node, enter: false });
            continue;
        }
        out.push(DrawEntry { node, enter: true });
        stack.push((node, true));
        if let Ok(children) = scene.children(node) {
            for &child in children.iter().rev() {
                stack.push((child, false));
            }
        }
    }
    out
}
