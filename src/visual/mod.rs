//! The drawable abstraction.
//!
//! A [`Visual`] is a drawable unit backed by a single program; a
//! [`CompoundVisual`] is composed of sub-visuals and has no program of its
//! own. Either can produce lightweight *views* of itself — independently
//! transformed and filtered references that share the underlying geometry.
//!
//! In the scene graph, a drawable entity is the composition of two
//! capabilities: its place in the tree (parent, children, visibility — owned
//! by [`Scene`](crate::scene::Scene)) and its drawing behavior (this
//! module). The scene stores drawables as `Box<dyn VisualObject>`.

pub mod compound;
pub mod mesh;
pub mod program;
pub mod share;
pub mod single;

pub use compound::{CompoundVisual, CompoundVisualView};
pub use mesh::MeshContent;
pub use program::{Filter, HookPosition, Program, ShaderStage, Uniform};
pub use share::{GlState, ViewState, VisualShare};
pub use single::{Visual, VisualView};

use crate::backend::RenderBackend;
use crate::color::Color;
use crate::error::SceneError;
use crate::geometry::Axis;
use crate::transform::Transform;
use crate::transform_system::TransformSystem;

/// Per-draw environment handed to every visual.
pub struct DrawContext<'a> {
    pub backend: &'a mut dyn RenderBackend,
    /// When true, fragment color is replaced by `pick_color` so the pass
    /// encodes visual identity instead of appearance.
    pub picking: bool,
    /// Encoded pick identifier of the node currently being drawn.
    pub pick_color: Color,
}

/// Geometry- and program-supplying behavior of a visual.
///
/// Implementors supply geometry and program state; the surrounding `Visual`
/// handles GL state, views, filters and bounds caching. This is the only
/// trait a new visual type needs to implement.
pub trait VisualContent {
    /// Upload geometry and program variables ahead of a draw.
    ///
    /// Returning `false` suppresses this draw call only; it is not a state
    /// change.
    fn prepare_draw(&mut self, share: &mut VisualShare, state: &mut ViewState) -> bool {
        let _ = (share, state);
        true
    }

    /// Bind the view's composed transform to program inputs. Invoked once at
    /// view creation and again on every transform chain change.
    fn prepare_transforms(&self, state: &mut ViewState) {
        state.bind_transform();
    }

    /// The (min, max) extent of this content along `axis`, in visual-local
    /// coordinates. `None` if the content has no extent.
    fn compute_bounds(&self, axis: Axis) -> Option<(f32, f32)>;
}

/// The common contract of all drawables: `Visual`, `VisualView`,
/// `CompoundVisual` and `CompoundVisualView`.
pub trait VisualObject {
    /// Draw this visual into the active render target.
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), SceneError>;

    /// The (min, max) extent along `axis` in visual-local coordinates.
    fn bounds(&mut self, axis: Axis) -> Option<(f32, f32)>;

    /// Attach a filter. On a source visual this applies to the shared state
    /// and propagates to every live view; on a view it applies to that view
    /// only.
    fn attach(&mut self, filter: Filter);

    /// Detach a previously attached filter by name. State is untouched and
    /// an error returned if the filter was never attached.
    fn detach(&mut self, name: &str) -> Result<(), SceneError>;

    /// Create a new view of this visual: an independently transformed and
    /// filtered reference sharing the underlying geometry.
    fn view(&self) -> Box<dyn VisualObject>;

    /// Push the canvas-controlled transform legs and the node-chain visual
    /// transform into this visual's transform system, re-binding program
    /// transforms if anything changed. Called by the canvas during
    /// traversal, ahead of `draw`.
    fn configure(&mut self, visual_transform: Transform, canvas_system: &TransformSystem);
}
