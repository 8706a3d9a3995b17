//! Flat-colored mesh content.

use crate::color::Color;
use crate::geometry::Axis;
use crate::visual::program::Uniform;
use crate::visual::share::{ViewState, VisualShare};
use crate::visual::VisualContent;

/// Triangle/line/point geometry with a single flat color.
pub struct MeshContent {
    vertices: Vec<[f32; 2]>,
    indices: Option<Vec<u32>>,
    color: Color,
    dirty: bool,
}

impl MeshContent {
    pub fn new(vertices: Vec<[f32; 2]>, color: Color) -> Self {
        Self {
            vertices,
            indices: None,
            color,
            dirty: true,
        }
    }

    pub fn indexed(vertices: Vec<[f32; 2]>, indices: Vec<u32>, color: Color) -> Self {
        Self {
            vertices,
            indices: Some(indices),
            color,
            dirty: true,
        }
    }

    /// An axis-aligned rectangle as two triangles.
    pub fn rect(x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        Self::indexed(
            vec![
                [x, y],
                [x + width, y],
                [x + width, y + height],
                [x, y + height],
            ],
            vec![0, 1, 2, 0, 2, 3],
            color,
        )
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.dirty = true;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Replace the geometry. The new buffers are uploaded on the next draw.
    pub fn set_data(&mut self, vertices: Vec<[f32; 2]>, indices: Option<Vec<u32>>) {
        self.vertices = vertices;
        self.indices = indices;
        self.dirty = true;
    }
}

impl VisualContent for MeshContent {
    fn prepare_draw(&mut self, share: &mut VisualShare, state: &mut ViewState) -> bool {
        if self.vertices.is_empty() {
            return false;
        }
        if self.dirty {
            share.set_geometry(self.vertices.clone(), self.indices.clone());
            self.dirty = false;
        }
        state
            .program
            .set_uniform("color", Uniform::Color(self.color));
        true
    }

    fn compute_bounds(&self, axis: Axis) -> Option<(f32, f32)> {
        let idx = match axis {
            Axis::X => 0,
            Axis::Y => 1,
        };
        let mut iter = self.vertices.iter().map(|v| v[idx]);
        let first = iter.next()?;
        let (mut lo, mut hi) = (first, first);
        for v in iter {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        Some((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DrawMode;

    #[test]
    fn test_bounds_per_axis() {
        let mesh = MeshContent::new(
            vec![[-3.0, 1.0], [5.0, 2.0], [0.0, -7.0]],
            Color::WHITE,
        );
        assert_eq!(mesh.compute_bounds(Axis::X), Some((-3.0, 5.0)));
        assert_eq!(mesh.compute_bounds(Axis::Y), Some((-7.0, 2.0)));
    }

    #[test]
    fn test_empty_mesh_has_no_bounds_and_skips_draw() {
        let mut mesh = MeshContent::new(Vec::new(), Color::WHITE);
        assert_eq!(mesh.compute_bounds(Axis::X), None);
        let mut share = VisualShare::new(DrawMode::Triangles);
        let mut state = ViewState::new();
        assert!(!mesh.prepare_draw(&mut share, &mut state));
    }

    #[test]
    fn test_upload_happens_once_until_dirty() {
        let mut mesh = MeshContent::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], Color::WHITE);
        let mut share = VisualShare::new(DrawMode::Triangles);
        let mut state = ViewState::new();
        assert!(mesh.prepare_draw(&mut share, &mut state));
        let buf = std::rc::Rc::clone(&share.vertices);
        assert!(mesh.prepare_draw(&mut share, &mut state));
        // Same buffer: no re-upload while clean.
        assert!(std::rc::Rc::ptr_eq(&buf, &share.vertices));

        mesh.set_data(vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]], None);
        assert!(mesh.prepare_draw(&mut share, &mut state));
        assert!(!std::rc::Rc::ptr_eq(&buf, &share.vertices));
    }

    #[test]
    fn test_rect_covers_extent() {
        let rect = MeshContent::rect(2.0, 3.0, 4.0, 5.0, Color::BLACK);
        assert_eq!(rect.compute_bounds(Axis::X), Some((2.0, 6.0)));
        assert_eq!(rect.compute_bounds(Axis::Y), Some((3.0, 8.0)));
    }
}
