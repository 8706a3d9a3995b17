//! A CPU rasterizer implementing [`RenderBackend`].
//!
//! Good enough to exercise the whole scene pipeline headless: flat-colored
//! triangles via edge functions, Bresenham lines, single-pixel points.
//! Coordinates follow the crate convention of a top-left origin; a draw
//! command's transform maps visual-local coordinates to (-1, -1)..(1, 1)
//! and the active viewport maps that square back to pixels.

use std::collections::HashMap;

use crate::backend::{DrawCommand, DrawMode, FramebufferId, RenderBackend, RenderImage};
use crate::color::Color;
use crate::error::SceneError;
use crate::geometry::Viewport;
use crate::visual::share::GlState;

struct Target {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Target {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Blend {
    Replace,
    SrcOver,
    Additive,
}

pub struct SoftwareBackend {
    surface: Target,
    framebuffers: HashMap<FramebufferId, Target>,
    /// Innermost entry is the active offscreen target; empty means the
    /// surface is active.
    active: Vec<FramebufferId>,
    next_fbo: u32,
    viewport: Viewport,
    blend: Blend,
    draw_count: u64,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Target::new(width, height),
            framebuffers: HashMap::new(),
            active: Vec::new(),
            next_fbo: 1,
            viewport: Viewport::new(0, 0, width as i32, height as i32),
            blend: Blend::Replace,
            draw_count: 0,
        }
    }

    /// Number of draw commands executed. Test instrumentation.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    fn target_mut(&mut self) -> &mut Target {
        match self.active.last() {
            Some(fbo) => self
                .framebuffers
                .get_mut(fbo)
                .expect("active framebuffer exists"),
            None => &mut self.surface,
        }
    }

    fn to_pixels(&self, cmd: &DrawCommand) -> Vec<(f32, f32)> {
        let vp = self.viewport;
        cmd.vertices
            .iter()
            .map(|&[x, y]| {
                let (nx, ny) = cmd.transform.map_point(x, y);
                (
                    vp.x as f32 + (nx + 1.0) * 0.5 * vp.w as f32,
                    vp.y as f32 + (ny + 1.0) * 0.5 * vp.h as f32,
                )
            })
            .collect()
    }

    fn clip(&self) -> (i32, i32, i32, i32) {
        let target = match self.active.last() {
            Some(fbo) => &self.framebuffers[fbo],
            None => &self.surface,
        };
        let x0 = self.viewport.x.max(0);
        let y0 = self.viewport.y.max(0);
        let x1 = (self.viewport.x + self.viewport.w).min(target.width as i32);
        let y1 = (self.viewport.y + self.viewport.h).min(target.height as i32);
        (x0, y0, x1, y1)
    }

    fn put(&mut self, x: i32, y: i32, color: Color) {
        let (x0, y0, x1, y1) = self.clip();
        if x < x0 || y < y0 || x >= x1 || y >= y1 {
            return;
        }
        let blend = self.blend;
        let target = self.target_mut();
        let i = ((y as u32 * target.width + x as u32) * 4) as usize;
        let src = color.to_bytes();
        match blend {
            Blend::Replace => target.pixels[i..i + 4].copy_from_slice(&src),
            Blend::SrcOver => {
                let a = src[3] as u32;
                for c in 0..4 {
                    let d = target.pixels[i + c] as u32;
                    let s = src[c] as u32;
                    target.pixels[i + c] = ((s * a + d * (255 - a)) / 255) as u8;
                }
            }
            Blend::Additive => {
                for c in 0..4 {
                    let sum = target.pixels[i + c] as u32 + src[c] as u32;
                    target.pixels[i + c] = sum.min(255) as u8;
                }
            }
        }
    }

    fn fill_triangle(&mut self, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color) {
        // Signed doubled area; flip winding so the edge tests share a sign.
        let area = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
        if area == 0.0 {
            return;
        }
        let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };

        let (cx0, cy0, cx1, cy1) = self.clip();
        let min_x = (a.0.min(b.0).min(c.0).floor() as i32).max(cx0);
        let max_x = (a.0.max(b.0).max(c.0).ceil() as i32).min(cx1 - 1);
        let min_y = (a.1.min(b.1).min(c.1).floor() as i32).max(cy0);
        let max_y = (a.1.max(b.1).max(c.1).ceil() as i32).min(cy1 - 1);

        let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
            (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
        };
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                if edge(a, b, px, py) >= 0.0
                    && edge(b, c, px, py) >= 0.0
                    && edge(c, a, px, py) >= 0.0
                {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn draw_line(&mut self, a: (f32, f32), b: (f32, f32), color: Color) {
        let (mut x0, mut y0) = (a.0.round() as i32, a.1.round() as i32);
        let (x1, y1) = (b.0.round() as i32, b.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = Target::new(width, height);
    }

    fn set_viewport(&mut self, vp: Viewport) -> Result<(), SceneError> {
        self.viewport = vp.normalized().validated()?;
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId, SceneError> {
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidFramebufferSize(width, height));
        }
        let id = FramebufferId(self.next_fbo);
        self.next_fbo += 1;
        self.framebuffers.insert(id, Target::new(width, height));
        Ok(id)
    }

    fn activate_framebuffer(&mut self, fbo: FramebufferId) -> Result<(), SceneError> {
        if !self.framebuffers.contains_key(&fbo) {
            return Err(SceneError::Activation(format!(
                "unknown framebuffer {fbo:?}"
            )));
        }
        self.active.push(fbo);
        Ok(())
    }

    fn deactivate_framebuffer(&mut self) {
        self.active.pop();
    }

    fn destroy_framebuffer(&mut self, fbo: FramebufferId) {
        self.active.retain(|&f| f != fbo);
        self.framebuffers.remove(&fbo);
    }

    fn apply_state(&mut self, state: &GlState) {
        self.blend = if state.additive {
            Blend::Additive
        } else if state.blend {
            Blend::SrcOver
        } else {
            Blend::Replace
        };
    }

    fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        let target = self.target_mut();
        for px in target.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    fn draw(&mut self, cmd: &DrawCommand) -> Result<(), SceneError> {
        if let Some(indices) = &cmd.indices {
            let len = cmd.vertices.len();
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= len) {
                return Err(SceneError::Draw(format!(
                    "index {bad} out of range for {len} vertices"
                )));
            }
        }
        self.draw_count += 1;
        let px = self.to_pixels(cmd);
        let index = |i: usize| -> usize {
            match &cmd.indices {
                Some(indices) => indices[i] as usize,
                None => i,
            }
        };
        let count = cmd
            .indices
            .as_ref()
            .map(|i| i.len())
            .unwrap_or(px.len());

        match cmd.mode {
            DrawMode::Triangles => {
                for tri in (0..count).step_by(3) {
                    if tri + 2 >= count {
                        break;
                    }
                    self.fill_triangle(
                        px[index(tri)],
                        px[index(tri + 1)],
                        px[index(tri + 2)],
                        cmd.color,
                    );
                }
            }
            DrawMode::Lines => {
                for seg in (0..count).step_by(2) {
                    if seg + 1 >= count {
                        break;
                    }
                    self.draw_line(px[index(seg)], px[index(seg + 1)], cmd.color);
                }
            }
            DrawMode::LineStrip => {
                for seg in 1..count {
                    self.draw_line(px[index(seg - 1)], px[index(seg)], cmd.color);
                }
            }
            DrawMode::Points => {
                for i in 0..count {
                    let (x, y) = px[index(i)];
                    self.put(x.round() as i32, y.round() as i32, cmd.color);
                }
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> RenderImage {
        let target = self.target_mut();
        RenderImage {
            width: target.width,
            height: target.height,
            pixels: target.pixels.clone(),
        }
    }
}
