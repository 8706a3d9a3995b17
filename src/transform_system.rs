//! The composed chain of coordinate-space mappings used to draw a visual.
//!
//! Rendering operates across five named spaces:
//!
//! * **Visual** — the local coordinate frame of a visual; vertex data lives
//!   here.
//! * **Document** — logical pixels; the frame used for physical measurements
//!   such as line widths and font sizes. Also called the *scene* space.
//! * **Canvas** — logical pixel coordinates of the canvas being drawn to.
//! * **Framebuffer** — physical pixels of the framebuffer currently bound.
//!   Differs from canvas space on high-DPI displays and inside offscreen
//!   render targets.
//! * **Render** — normalized device coordinates, (-1, -1)..(1, 1) across the
//!   active viewport. The mandatory output space of vertex processing.
//!
//! The chain composes in a fixed order, visual→document→canvas→framebuffer→
//! render. `get_transform` truncates or inverts the chain to answer queries
//! between any two spaces, which is how picking maps canvas positions into
//! framebuffer pixels.

use crate::geometry::{Rect, Viewport};
use crate::transform::Transform;

/// A named coordinate space in the transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Space {
    Visual,
    Document,
    Canvas,
    Framebuffer,
    Render,
}

impl Space {
    fn index(self) -> usize {
        match self {
            Space::Visual => 0,
            Space::Document => 1,
            Space::Canvas => 2,
            Space::Framebuffer => 3,
            Space::Render => 4,
        }
    }
}

/// The ordered chain of mappings between the named spaces.
///
/// Mutating any leg bumps `version`; owners watch the version to know when a
/// redraw (and a re-bind of program transforms) is needed. The full
/// composition is recomputed lazily and memoized per version.
#[derive(Debug, Clone)]
pub struct TransformSystem {
    /// visual → document (composition of node-local transforms).
    visual_transform: Transform,
    /// document → canvas. Identity unless a camera or widget remaps it.
    document_transform: Transform,
    /// canvas → framebuffer. Reconfigured on viewport/framebuffer changes.
    framebuffer_transform: Transform,
    /// framebuffer → render (normalized device coordinates).
    render_transform: Transform,
    version: u64,
    cached_full: std::cell::Cell<Option<(u64, Transform)>>,
}

impl TransformSystem {
    pub fn new() -> Self {
        Self {
            visual_transform: Transform::IDENTITY,
            document_transform: Transform::IDENTITY,
            framebuffer_transform: Transform::IDENTITY,
            render_transform: Transform::IDENTITY,
            version: 0,
            cached_full: std::cell::Cell::new(None),
        }
    }

    /// Monotonic change counter. Bumped by every setter and by
    /// `auto_configure`; owners compare against a remembered value to decide
    /// whether transforms must be re-bound and the scene redrawn.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn visual_transform(&self) -> Transform {
        self.visual_transform
    }

    pub fn set_visual_transform(&mut self, tr: Transform) {
        if self.visual_transform != tr {
            self.visual_transform = tr;
            self.bump();
        }
    }

    pub fn set_document_transform(&mut self, tr: Transform) {
        if self.document_transform != tr {
            self.document_transform = tr;
            self.bump();
        }
    }

    /// Recompute the canvas↔framebuffer↔render legs from the current
    /// viewport and framebuffer state.
    ///
    /// * `viewport` — the active viewport, in framebuffer pixels; `None`
    ///   means the full canvas.
    /// * `fbo_size` — physical size of the bound offscreen target, if any.
    /// * `fbo_rect` — the canvas-space region the offscreen target covers.
    ///
    /// With no offscreen target bound, canvas and framebuffer space are
    /// related only by the pixel scale in `px_scale`.
    pub fn auto_configure(
        &mut self,
        viewport: Option<Viewport>,
        fbo_size: Option<(u32, u32)>,
        fbo_rect: Option<Rect>,
        px_scale: f32,
    ) {
        self.framebuffer_transform = match (fbo_size, fbo_rect) {
            (Some((fw, fh)), Some(rect)) if rect.width != 0.0 && rect.height != 0.0 => {
                // Map the covered canvas region onto the framebuffer pixels.
                let sx = fw as f32 / rect.width;
                let sy = fh as f32 / rect.height;
                Transform::scale_translate(sx, sy, -rect.x * sx, -rect.y * sy)
            }
            _ => Transform::scale(px_scale, px_scale),
        };
        self.render_transform = match viewport {
            Some(vp) => Transform::ndc_from_viewport(vp),
            None => Transform::IDENTITY,
        };
        self.bump();
    }

    /// Copy the canvas-controlled legs (document→render) from another
    /// system, leaving the visual leg alone. The canvas uses this to push
    /// its configuration into each visual's transform system during a draw
    /// pass.
    pub fn configure_from(&mut self, canvas_system: &TransformSystem) {
        if self.document_transform != canvas_system.document_transform
            || self.framebuffer_transform != canvas_system.framebuffer_transform
            || self.render_transform != canvas_system.render_transform
        {
            self.document_transform = canvas_system.document_transform;
            self.framebuffer_transform = canvas_system.framebuffer_transform;
            self.render_transform = canvas_system.render_transform;
            self.bump();
        }
    }

    /// Composed mapping between any two named spaces.
    ///
    /// Forward queries compose the legs in chain order; backward queries
    /// return the inverse of the reverse composition.
    pub fn get_transform(&self, from: Space, to: Space) -> Transform {
        let (lo, hi, invert) = if from.index() <= to.index() {
            (from.index(), to.index(), false)
        } else {
            (to.index(), from.index(), true)
        };
        // Legs indexed by the space they map *from*.
        let legs = [
            self.visual_transform,
            self.document_transform,
            self.framebuffer_transform,
            self.render_transform,
        ];
        let mut tr = Transform::IDENTITY;
        for leg in legs[lo..hi].iter() {
            tr = leg.then(&tr);
        }
        if invert {
            tr.inverse()
        } else {
            tr
        }
    }

    /// The full visual→render composition, memoized per version.
    pub fn full_transform(&self) -> Transform {
        if let Some((version, tr)) = self.cached_full.get() {
            if version == self.version {
                return tr;
            }
        }
        let tr = self.get_transform(Space::Visual, Space::Render);
        self.cached_full.set(Some((self.version, tr)));
        tr
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

impl Default for TransformSystem {
    fn default() -> Self {
        Self::new()
    }
}
