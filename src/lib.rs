//! A retained-mode scene graph renderer.
//!
//! The library is organized around three cooperating pieces:
//!
//! * the [`Scene`](scene::Scene), an arena of nodes with local transforms,
//!   ordered children and optional drawables;
//! * the [`visual`] layer, where drawables live: single-program visuals,
//!   compounds of sub-visuals, and lightweight *views* that share geometry
//!   while carrying their own transforms and filters;
//! * the [`Canvas`](canvas::Canvas), which owns the scene and a
//!   [`RenderBackend`](backend::RenderBackend), replays cached draw orders,
//!   renders offscreen regions and resolves mouse positions to nodes with a
//!   color-ID picking pass.
//!
//! Coordinates flow through five named spaces (visual, document, canvas,
//! framebuffer, render); see [`transform_system`] for the chain.
//!
//! ```no_run
//! use scenic::prelude::*;
//!
//! let mut canvas = Canvas::new(
//!     CanvasConfig::new().with_size(640, 480),
//!     Box::new(SoftwareBackend::new(640, 480)),
//! );
//! let root = canvas.scene().root();
//! canvas.scene_mut().add_visual(
//!     root,
//!     Box::new(Visual::new(
//!         MeshContent::rect(100.0, 100.0, 200.0, 150.0, Color::WHITE),
//!         DrawMode::Triangles,
//!     )),
//! )?;
//! let image = canvas.render(None, None, None)?;
//! # Ok::<(), scenic::SceneError>(())
//! ```

pub mod backend;
pub mod canvas;
pub mod color;
pub mod draw_order;
pub mod error;
pub mod event;
pub mod geometry;
pub mod scene;
pub mod transform;
pub mod transform_system;
pub mod visual;

pub use error::SceneError;

pub mod prelude {
    pub use crate::backend::{DrawMode, RenderBackend, RenderImage, SoftwareBackend};
    pub use crate::canvas::{Canvas, CanvasConfig};
    pub use crate::color::Color;
    pub use crate::error::SceneError;
    pub use crate::event::{MouseButton, MouseEventKind, SceneMouseEvent};
    pub use crate::geometry::{Axis, Rect, Viewport};
    pub use crate::scene::{ChangeFlags, NodeId, Scene};
    pub use crate::transform::Transform;
    pub use crate::transform_system::{Space, TransformSystem};
    pub use crate::visual::{
        CompoundVisual, Filter, GlState, HookPosition, MeshContent, ShaderStage, Visual,
        VisualContent, VisualObject,
    };
}
