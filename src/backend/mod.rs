//! The boundary between the scene core and whatever executes draw calls.
//!
//! The core owns this contract; platform crates (or the bundled software
//! rasterizer) implement it. Everything above the trait works in terms of
//! [`DrawCommand`]s, so a frame loop, a GPU backend and a test double are
//! interchangeable.

mod software;

pub use software::SoftwareBackend;

use std::rc::Rc;

use crate::color::Color;
use crate::error::SceneError;
use crate::geometry::Viewport;
use crate::transform::Transform;
use crate::visual::share::GlState;

/// Primitive interpretation of the vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    Lines,
    LineStrip,
    Points,
}

/// Handle for an offscreen render target owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub(crate) u32);

/// One resolved draw call: shared geometry plus the per-view program state
/// that matters to rasterization.
///
/// `vertices` is the share-owned buffer behind `Rc`; issuing a command never
/// copies geometry.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub mode: DrawMode,
    pub vertices: Rc<Vec<[f32; 2]>>,
    pub indices: Option<Rc<Vec<u32>>>,
    /// The visual→render mapping bound by `prepare_transforms`.
    pub transform: Transform,
    pub color: Color,
}

/// A dense row-major RGBA readback of a render target.
///
/// Index (0, 0) is the top-left corner.
#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// Executes draw calls against the canvas surface or offscreen targets.
///
/// Activation methods are fallible so the canvas can roll back a stack push
/// whose target never became active.
pub trait RenderBackend {
    /// Defensively activate this backend's rendering context. Called at the
    /// start of every public draw/render entry point.
    fn make_current(&mut self) {}

    /// Resize the canvas surface (physical pixels).
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Activate a viewport, in pixels of the active render target.
    fn set_viewport(&mut self, vp: Viewport) -> Result<(), SceneError>;

    fn create_framebuffer(&mut self, width: u32, height: u32)
        -> Result<FramebufferId, SceneError>;

    fn activate_framebuffer(&mut self, fbo: FramebufferId) -> Result<(), SceneError>;

    /// Return to the previously active target (or the canvas surface).
    fn deactivate_framebuffer(&mut self);

    fn destroy_framebuffer(&mut self, fbo: FramebufferId);

    /// Apply blending/depth state ahead of a draw.
    fn apply_state(&mut self, state: &GlState);

    /// Clear the entire active render target.
    fn clear(&mut self, color: Color);

    fn draw(&mut self, cmd: &DrawCommand) -> Result<(), SceneError>;

    /// Read back the full active render target.
    fn read_pixels(&mut self) -> RenderImage;
}
