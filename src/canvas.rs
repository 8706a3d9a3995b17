//! The canvas: owner of the scene, the backend and the render state stacks.
//!
//! All drawing goes through here. The canvas tracks the active viewport and
//! offscreen framebuffer as LIFO stacks so nested offscreen renders restore
//! the state they found, replays cached draw orders with an invisibility
//! barrier instead of recursing through the scene, and resolves mouse
//! positions to nodes with a one-pixel picking render.

use crate::backend::{FramebufferId, RenderBackend, RenderImage};
use crate::color::Color;
use crate::draw_order::DrawOrderCache;
use crate::error::SceneError;
use crate::event::{MouseButton, MouseEventKind, SceneMouseEvent};
use crate::geometry::{Rect, Viewport};
use crate::scene::{NodeId, Scene};
use crate::transform::Transform;
use crate::transform_system::TransformSystem;
use crate::visual::DrawContext;

/// Builder-style canvas configuration.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    size: (u32, u32),
    px_scale: f32,
    background: Color,
    title: String,
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self {
            size: (800, 600),
            px_scale: 1.0,
            background: Color::BLACK,
            title: "scenic".to_string(),
        }
    }

    /// Logical canvas size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Physical pixels per logical pixel.
    pub fn with_px_scale(mut self, scale: f32) -> Self {
        self.px_scale = scale;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct FboEntry {
    id: FramebufferId,
    size: (u32, u32),
    /// Canvas-space region the offscreen target covers.
    rect: Rect,
}

pub struct Canvas {
    scene: Scene,
    backend: Box<dyn RenderBackend>,
    transforms: TransformSystem,
    order_cache: DrawOrderCache,
    viewport_stack: Vec<Viewport>,
    fbo_stack: Vec<FboEntry>,
    captured: Option<NodeId>,
    size: (u32, u32),
    px_scale: f32,
    background: Color,
    title: String,
}

impl Canvas {
    pub fn new(config: CanvasConfig, mut backend: Box<dyn RenderBackend>) -> Self {
        let physical = Self::physical(config.size, config.px_scale);
        backend.resize_surface(physical.0, physical.1);
        let mut canvas = Self {
            scene: Scene::new(),
            backend,
            transforms: TransformSystem::new(),
            order_cache: DrawOrderCache::new(),
            viewport_stack: Vec::new(),
            fbo_stack: Vec::new(),
            captured: None,
            size: config.size,
            px_scale: config.px_scale,
            background: config.background,
            title: config.title,
        };
        canvas.update_transforms();
        log::info!(
            "canvas `{}` initialized at {}x{} (scale {})",
            canvas.title,
            canvas.size.0,
            canvas.size.1,
            canvas.px_scale
        );
        canvas
    }

    fn physical(size: (u32, u32), px_scale: f32) -> (u32, u32) {
        (
            (size.0 as f32 * px_scale).round() as u32,
            (size.1 as f32 * px_scale).round() as u32,
        )
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn physical_size(&self) -> (u32, u32) {
        Self::physical(self.size, self.px_scale)
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn transforms(&self) -> &TransformSystem {
        &self.transforms
    }

    /// Resize the logical canvas, resizing the backend surface to match.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        let physical = self.physical_size();
        self.backend.resize_surface(physical.0, physical.1);
        self.update_transforms();
        log::info!("canvas resized to {width}x{height}");
    }

    /// The viewport currently driving rasterization: the innermost pushed
    /// entry, or the whole active render target.
    pub fn current_viewport(&self) -> Viewport {
        match self.viewport_stack.last() {
            Some(vp) => *vp,
            None => self.full_target_viewport(),
        }
    }

    fn full_target_viewport(&self) -> Viewport {
        let (w, h) = match self.fbo_stack.last() {
            Some(entry) => entry.size,
            None => self.physical_size(),
        };
        Viewport::new(0, 0, w as i32, h as i32)
    }

    /// Push and activate a viewport. The viewport is sign-normalized first;
    /// if activation fails, the stack is left exactly as it was.
    pub fn push_viewport(&mut self, vp: Viewport) -> Result<(), SceneError> {
        let vp = vp.normalized().validated()?;
        self.viewport_stack.push(vp);
        if let Err(err) = self.backend.set_viewport(vp) {
            self.viewport_stack.pop();
            return Err(err);
        }
        self.update_transforms();
        Ok(())
    }

    /// Pop the innermost viewport, reactivating the one beneath it.
    pub fn pop_viewport(&mut self) -> Result<Viewport, SceneError> {
        let popped = self
            .viewport_stack
            .pop()
            .ok_or(SceneError::ViewportStackEmpty)?;
        let restore = self.current_viewport();
        self.backend.set_viewport(restore)?;
        self.update_transforms();
        Ok(popped)
    }

    /// Push and activate an offscreen framebuffer covering the canvas-space
    /// region `rect`. Rolls the stack back if activation fails.
    pub fn push_fbo(
        &mut self,
        fbo: FramebufferId,
        size: (u32, u32),
        rect: Rect,
    ) -> Result<(), SceneError> {
        self.fbo_stack.push(FboEntry {
            id: fbo,
            size,
            rect,
        });
        if let Err(err) = self.backend.activate_framebuffer(fbo) {
            self.fbo_stack.pop();
            return Err(err);
        }
        self.update_transforms();
        Ok(())
    }

    /// Pop the innermost framebuffer, returning to the one beneath it (or
    /// the canvas surface).
    pub fn pop_fbo(&mut self) -> Result<FramebufferId, SceneError> {
        let popped = self
            .fbo_stack
            .pop()
            .ok_or(SceneError::FramebufferStackEmpty)?;
        self.backend.deactivate_framebuffer();
        self.update_transforms();
        Ok(popped.id)
    }

    fn update_transforms(&mut self) {
        let viewport = self.current_viewport();
        let (fbo_size, fbo_rect) = match self.fbo_stack.last() {
            Some(entry) => (Some(entry.size), Some(entry.rect)),
            None => (None, None),
        };
        self.transforms
            .auto_configure(Some(viewport), fbo_size, fbo_rect, self.px_scale);
    }

    /// Draw the scene to the canvas surface.
    pub fn draw(&mut self) -> Result<(), SceneError> {
        self.backend.make_current();
        self.backend.set_viewport(self.current_viewport())?;
        self.backend.clear(self.background);
        self.draw_scene(false)?;
        self.scene.take_changes();
        Ok(())
    }

    /// Redraw only if the scene changed since the last draw. Returns whether
    /// a draw happened.
    pub fn update(&mut self) -> Result<bool, SceneError> {
        if !self.scene.has_changes() {
            return Ok(false);
        }
        self.draw()?;
        Ok(true)
    }

    /// Walk the cached draw order, composing node transforms down the tree
    /// and skipping invisible subtrees.
    ///
    /// Scene updates are suspended for the duration of the pass, so handlers
    /// or prepare hooks that touch the scene cannot re-enter drawing; their
    /// changes coalesce into a pending redraw.
    fn draw_scene(&mut self, picking: bool) -> Result<(), SceneError> {
        self.scene.suspend_updates();
        let result = self.draw_pass(picking);
        self.scene.resume_updates();
        result
    }

    fn draw_pass(&mut self, picking: bool) -> Result<(), SceneError> {
        let root = self.scene.root();
        let order = self.order_cache.get_or_build(&self.scene, root);
        let mut stack: Vec<Transform> = vec![Transform::IDENTITY];
        // While set, everything until the matching exit is skipped. A single
        // pointer suffices: subtrees nest, they never interleave.
        let mut barrier: Option<NodeId> = None;

        for entry in order.iter() {
            if entry.enter {
                if barrier.is_some() {
                    continue;
                }
                if !self.scene.visible(entry.node)? {
                    barrier = Some(entry.node);
                    continue;
                }
                let composed = stack
                    .last()
                    .expect("transform stack holds the identity root")
                    .then(&self.scene.transform(entry.node)?);
                stack.push(composed);

                let pick_id = self.scene.pick_id(entry.node)?;
                if let Some(visual) = self.scene.visual_mut(entry.node)? {
                    visual.configure(composed, &self.transforms);
                    let pick_color = match pick_id {
                        Some(id) => Color::from_pick_id(id),
                        None => Color::TRANSPARENT,
                    };
                    let mut ctx = DrawContext {
                        backend: &mut *self.backend,
                        picking,
                        pick_color,
                    };
                    visual.draw(&mut ctx)?;
                }
            } else if barrier == Some(entry.node) {
                barrier = None;
            } else if barrier.is_none() {
                stack.pop();
            }
        }
        Ok(())
    }

    /// Render a region of the scene into an offscreen target and read it
    /// back. `region` defaults to the whole canvas, `size` to the region's
    /// physical pixel size, `background` to the canvas background.
    ///
    /// The framebuffer and viewport pushed for the render are popped on
    /// every exit path, success or error.
    pub fn render(
        &mut self,
        region: Option<Rect>,
        size: Option<(u32, u32)>,
        background: Option<Color>,
    ) -> Result<RenderImage, SceneError> {
        self.offscreen_pass(region, size, background.unwrap_or(self.background), false)
    }

    fn offscreen_pass(
        &mut self,
        region: Option<Rect>,
        size: Option<(u32, u32)>,
        background: Color,
        picking: bool,
    ) -> Result<RenderImage, SceneError> {
        self.backend.make_current();
        let region = region.unwrap_or(Rect::new(
            0.0,
            0.0,
            self.size.0 as f32,
            self.size.1 as f32,
        ));
        let size = size.unwrap_or_else(|| {
            (
                (region.width * self.px_scale).round().max(1.0) as u32,
                (region.height * self.px_scale).round().max(1.0) as u32,
            )
        });
        let fbo = self.backend.create_framebuffer(size.0, size.1)?;
        if let Err(err) = self.push_fbo(fbo, size, region) {
            self.backend.destroy_framebuffer(fbo);
            return Err(err);
        }

        let result = (|| {
            self.push_viewport(Viewport::new(0, 0, size.0 as i32, size.1 as i32))?;
            let pass = (|| {
                self.backend.clear(background);
                self.draw_scene(picking)?;
                Ok(self.backend.read_pixels())
            })();
            let popped = self.pop_viewport();
            pass.and_then(|img| popped.map(|_| img))
        })();

        // The framebuffer pops whatever happened above.
        let pop = self.pop_fbo();
        self.backend.destroy_framebuffer(fbo);
        let image = result?;
        pop?;
        Ok(image)
    }

    /// The node whose visual covers `pos` (canvas coordinates), resolved by
    /// a one-pixel picking render. `None` over the background.
    pub fn visual_at(&mut self, pos: (f32, f32)) -> Option<NodeId> {
        let region = Rect::new(pos.0, pos.1, 1.0, 1.0);
        let image = match self.offscreen_pass(
            Some(region),
            Some((1, 1)),
            Color::TRANSPARENT,
            true,
        ) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("picking render failed: {err}");
                return None;
            }
        };
        let pick_id = Color::pick_id_from_bytes(image.pixel(0, 0));
        if pick_id == 0 {
            return None;
        }
        let node = self.scene.node_by_pick_id(pick_id);
        if node.is_none() {
            log::warn!("picking pass decoded unknown id {pick_id}");
        }
        node
    }

    /// Press begins a capture: until the matching release, moves and wheel
    /// events route to the pressed node regardless of position.
    pub fn mouse_press(&mut self, pos: (f32, f32), button: MouseButton) -> bool {
        let Some(target) = self.visual_at(pos) else {
            return false;
        };
        self.captured = Some(target);
        let mut event = SceneMouseEvent::new(MouseEventKind::Press { button }, pos, target);
        self.scene.dispatch_mouse(&mut event)
    }

    /// Moves are delivered only while a press is latched (a drag); hover
    /// motion with no capture is dropped without picking.
    pub fn mouse_move(&mut self, pos: (f32, f32)) -> bool {
        let Some(target) = self.live_capture() else {
            return false;
        };
        let mut event = SceneMouseEvent::new(MouseEventKind::Move, pos, target);
        self.scene.dispatch_mouse(&mut event)
    }

    pub fn mouse_release(&mut self, pos: (f32, f32), button: MouseButton) -> bool {
        let target = self.live_capture().or_else(|| self.visual_at(pos));
        self.captured = None;
        let Some(target) = target else {
            return false;
        };
        let mut event = SceneMouseEvent::new(MouseEventKind::Release { button }, pos, target);
        self.scene.dispatch_mouse(&mut event)
    }

    /// Wheel events are delivered only while a capture is active; there is
    /// no hover target for scrolling.
    pub fn mouse_wheel(&mut self, pos: (f32, f32), delta: (f32, f32)) -> bool {
        let Some(target) = self.live_capture() else {
            return false;
        };
        let mut event = SceneMouseEvent::new(
            MouseEventKind::Wheel {
                delta_x: delta.0,
                delta_y: delta.1,
            },
            pos,
            target,
        );
        self.scene.dispatch_mouse(&mut event)
    }

    fn live_capture(&mut self) -> Option<NodeId> {
        match self.captured {
            Some(node) if self.scene.contains(node) => Some(node),
            Some(_) => {
                // The captured node was removed mid-gesture.
                self.captured = None;
                None
            }
            None => None,
        }
    }

    #[cfg(test)]
    fn cached_order_len(&mut self) -> usize {
        let root = self.scene.root();
        self.order_cache.get_or_build(&self.scene, root).len()
    }

    #[cfg(test)]
    fn order_cached(&self) -> bool {
        self.order_cache.is_cached(&self.scene, self.scene.root())
    }
}
