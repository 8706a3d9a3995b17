use crate::error::SceneError;

/// An axis of the local coordinate system, used for bounds queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// An axis-aligned rectangle in some coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// An integer viewport rectangle relative to the active framebuffer.
///
/// Width and height may be negative on input; `normalized` flips the origin
/// and sign so that activation always sees non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Flip negative extents back across their origin.
    ///
    /// `(0, 0, -100, 50)` becomes `(-100, 0, 100, 50)`.
    pub fn normalized(self) -> Self {
        let mut vp = self;
        if vp.w < 0 {
            vp.x += vp.w;
            vp.w = -vp.w;
        }
        if vp.h < 0 {
            vp.y += vp.h;
            vp.h = -vp.h;
        }
        vp
    }

    /// Normalize and reject degenerate extents before any state is touched.
    pub fn validated(self) -> Result<Self, SceneError> {
        let vp = self.normalized();
        if vp.w == 0 || vp.h == 0 {
            return Err(SceneError::InvalidViewport {
                x: self.x,
                y: self.y,
                w: self.w,
                h: self.h,
            });
        }
        Ok(vp)
    }
}
