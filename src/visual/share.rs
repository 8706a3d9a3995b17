//! State shared between a visual and all of its views.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::backend::DrawMode;
use crate::geometry::Axis;
use crate::transform_system::TransformSystem;
use crate::visual::program::{Filter, Program, Uniform};

/// Blend/depth parameters applied before a visual draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlState {
    pub blend: bool,
    pub depth_test: bool,
    pub additive: bool,
}

impl GlState {
    /// Opaque geometry: depth tested, no blending.
    pub fn opaque() -> Self {
        Self {
            blend: false,
            depth_test: true,
            additive: false,
        }
    }

    /// Alpha-blended geometry.
    pub fn translucent() -> Self {
        Self {
            blend: true,
            depth_test: true,
            additive: false,
        }
    }

    /// Additive blending, no depth test.
    pub fn additive() -> Self {
        Self {
            blend: true,
            depth_test: false,
            additive: true,
        }
    }
}

impl Default for GlState {
    fn default() -> Self {
        Self::opaque()
    }
}

/// Per-view mutable state: the program instantiation, the transform chain,
/// and the filters attached to this view.
pub struct ViewState {
    pub program: Program,
    pub transforms: TransformSystem,
    pub(crate) filters: Vec<Filter>,
    /// Transform version last bound into the program.
    pub(crate) bound_version: Option<u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            transforms: TransformSystem::new(),
            filters: Vec::new(),
            bound_version: None,
        }
    }

    /// Bind the composed visual→render transform into the program and
    /// remember the chain version it reflects.
    pub fn bind_transform(&mut self) {
        let tr = self.transforms.full_transform();
        self.program.set_uniform("transform", Uniform::Mat4(tr));
        self.bound_version = Some(self.transforms.version());
    }

    /// True when the transform chain changed since the last bind.
    pub fn transform_stale(&self) -> bool {
        self.bound_version != Some(self.transforms.version())
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

/// Data shared between all views of a visual: the geometry, the GL state,
/// the bounds cache, the shared filter list and a weak registry of every
/// live view.
///
/// The registry holds `Weak` references only — it never extends the lifetime
/// of a view, and iterating it while views are being destroyed is safe (dead
/// entries are pruned as encountered).
pub struct VisualShare {
    pub vertices: Rc<Vec<[f32; 2]>>,
    pub indices: Option<Rc<Vec<u32>>>,
    pub draw_mode: DrawMode,
    pub gl_state: GlState,
    pub(crate) bounds: HashMap<Axis, Option<(f32, f32)>>,
    pub(crate) filters: Vec<Filter>,
    views: Vec<Weak<RefCell<ViewState>>>,
}

impl VisualShare {
    pub fn new(draw_mode: DrawMode) -> Self {
        Self {
            vertices: Rc::new(Vec::new()),
            indices: None,
            draw_mode,
            gl_state: GlState::default(),
            bounds: HashMap::new(),
            filters: Vec::new(),
            views: Vec::new(),
        }
    }

    pub(crate) fn register_view(&mut self, state: &Rc<RefCell<ViewState>>) {
        self.views.retain(|w| w.strong_count() > 0);
        self.views.push(Rc::downgrade(state));
    }

    /// Upgrade every live view state, pruning dead registry entries.
    pub(crate) fn live_views(&mut self) -> Vec<Rc<RefCell<ViewState>>> {
        let mut live = Vec::with_capacity(self.views.len());
        self.views.retain(|w| match w.upgrade() {
            Some(state) => {
                live.push(state);
                true
            }
            None => false,
        });
        live
    }

    #[cfg(test)]
    pub(crate) fn view_count(&self) -> usize {
        self.views.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Replace the shared geometry and drop cached bounds.
    pub fn set_geometry(&mut self, vertices: Vec<[f32; 2]>, indices: Option<Vec<u32>>) {
        self.vertices = Rc::new(vertices);
        self.indices = indices.map(Rc::new);
        self.bounds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_does_not_keep_views_alive() {
        let mut share = VisualShare::new(DrawMode::Triangles);
        let state = Rc::new(RefCell::new(ViewState::new()));
        share.register_view(&state);
        assert_eq!(share.view_count(), 1);
        drop(state);
        assert_eq!(share.view_count(), 0);
        // Iteration prunes the dead entry without panicking.
        assert!(share.live_views().is_empty());
        assert!(share.views.is_empty());
    }

    #[test]
    fn test_set_geometry_clears_bounds_cache() {
        let mut share = VisualShare::new(DrawMode::Triangles);
        share.bounds.insert(Axis::X, Some((0.0, 1.0)));
        share.set_geometry(vec![[0.0, 0.0]], None);
        assert!(share.bounds.is_empty());
    }

    #[test]
    fn test_gl_state_presets() {
        assert!(!GlState::opaque().blend);
        assert!(GlState::translucent().blend);
        assert!(GlState::additive().additive);
        assert!(!GlState::additive().depth_test);
    }
}
