use crate::geometry::Viewport;

/// A 4x4 transformation matrix stored in row-major order.
///
/// Transforms are the links of the coordinate chain that maps visual-local
/// coordinates through document, canvas and framebuffer space into render
/// (normalized device) space. Only 2D affine content is ever stored, so the
/// inverse uses the closed-form 2D affine formula.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Matrix data in row-major order: [row0, row1, row2, row3]
    pub data: [f32; 16],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self::scale_translate(1.0, 1.0, x, y)
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::scale_translate(sx, sy, 0.0, 0.0)
    }

    /// Scale-then-translate transform: `p' = p * s + t`.
    pub fn scale_translate(sx: f32, sy: f32, tx: f32, ty: f32) -> Self {
        Self {
            data: [
                sx, 0.0, 0.0, tx, //
                0.0, sy, 0.0, ty, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
            ],
        }
    }

    /// Rotation around the Z axis.
    pub fn rotate(angle_radians: f32) -> Self {
        let cos = angle_radians.cos();
        let sin = angle_radians.sin();
        Self {
            data: [
                cos, -sin, 0.0, 0.0, //
                sin, cos, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
            ],
        }
    }

    /// The framebuffer→render leg for a viewport: maps framebuffer pixel
    /// coordinates inside `vp` onto (-1, -1)..(1, 1) render coordinates.
    ///
    /// The viewport must already be normalized (non-negative extents).
    pub fn ndc_from_viewport(vp: Viewport) -> Self {
        let sx = 2.0 / vp.w as f32;
        let sy = 2.0 / vp.h as f32;
        Self::scale_translate(sx, sy, -1.0 - vp.x as f32 * sx, -1.0 - vp.y as f32 * sy)
    }

    /// Compose this transform with another: `self * other`.
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Transform {
        let a = &self.data;
        let b = &other.data;
        let mut result = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[i * 4 + k] * b[k * 4 + j];
                }
                result[i * 4 + j] = sum;
            }
        }
        Transform { data: result }
    }

    /// Inverse via the closed-form 2D affine formula. A degenerate matrix
    /// (zero determinant) inverts to identity rather than producing NaNs.
    pub fn inverse(&self) -> Transform {
        let a = self.data[0];
        let b = self.data[1];
        let c = self.data[4];
        let d = self.data[5];
        let tx = self.data[3];
        let ty = self.data[7];

        let det = a * d - b * c;
        if det.abs() < 1e-10 {
            return Self::IDENTITY;
        }
        let inv = 1.0 / det;

        Transform {
            data: [
                d * inv,
                -b * inv,
                0.0,
                (-d * tx + b * ty) * inv,
                -c * inv,
                a * inv,
                0.0,
                (c * tx - a * ty) * inv,
                0.0,
                0.0,
                1.0,
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ],
        }
    }

    /// Transform a 2D point by this matrix.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let new_x = self.data[0] * x + self.data[1] * y + self.data[3];
        let new_y = self.data[4] * x + self.data[5] * y + self.data[7];
        (new_x, new_y)
    }

    /// Map an interval along one axis, returning it min-first. Needed for
    /// bounds queries under transforms with negative scale.
    pub fn map_interval(&self, axis: crate::geometry::Axis, lo: f32, hi: f32) -> (f32, f32) {
        use crate::geometry::Axis;
        let (a, b) = match axis {
            Axis::X => (self.map_point(lo, 0.0).0, self.map_point(hi, 0.0).0),
            Axis::Y => (self.map_point(0.0, lo).1, self.map_point(0.0, hi).1),
        };
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
