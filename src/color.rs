/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Encode a pick identifier into RGBA channels, little-endian: the low
    /// byte of the id lands in the red channel. The encoding is fixed at
    /// little-endian regardless of host byte order.
    pub fn from_pick_id(id: u32) -> Self {
        let [b0, b1, b2, b3] = id.to_le_bytes();
        Self {
            r: b0 as f32 / 255.0,
            g: b1 as f32 / 255.0,
            b: b2 as f32 / 255.0,
            a: b3 as f32 / 255.0,
        }
    }

    /// Decode 4 framebuffer bytes (RGBA order) back into a pick identifier.
    pub fn pick_id_from_bytes(bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }

    /// Quantize to 8-bit RGBA, the framebuffer storage format.
    pub fn to_bytes(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let color = Color::from_hex(0xFF0000);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.g, 0.0);
        assert_eq!(color.b, 0.0);
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn test_pick_id_round_trip() {
        let color = Color::from_pick_id(0x01020304);
        assert_eq!(color.to_bytes(), [4, 3, 2, 1]);
        assert_eq!(Color::pick_id_from_bytes([4, 3, 2, 1]), 0x01020304);
    }

    #[test]
    fn test_pick_id_background_is_zero() {
        assert_eq!(Color::pick_id_from_bytes([0, 0, 0, 0]), 0);
        assert_eq!(Color::from_pick_id(0), Color::TRANSPARENT);
    }

    #[test]
    fn test_to_bytes_clamps() {
        let color = Color::rgba(2.0, -1.0, 0.5, 1.0);
        assert_eq!(color.to_bytes(), [255, 0, 128, 255]);
    }
}
