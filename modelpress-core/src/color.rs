//! RGBA color values used for vertex colors and texture fallbacks

use serde::{Deserialize, Serialize};

/// A linear RGBA color with f32 components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba(pub [f32; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Rgba = Rgba([0.0, 0.0, 0.0, 1.0]);
    /// The color of an undisturbed tangent-space normal map texel
    pub const FLAT_NORMAL: Rgba = Rgba([0.5, 0.5, 1.0, 1.0]);

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba([r, g, b, a])
    }

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn g(&self) -> f32 {
        self.0[1]
    }

    pub fn b(&self) -> f32 {
        self.0[2]
    }

    pub fn a(&self) -> f32 {
        self.0[3]
    }

    /// Convert to 8-bit channels, clamping to the displayable range
    pub fn to_bytes(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.0[0]), q(self.0[1]), q(self.0[2]), q(self.0[3])]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes_clamps() {
        assert_eq!(Rgba::new(2.0, -1.0, 0.5, 1.0).to_bytes(), [255, 0, 128, 255]);
    }

    #[test]
    fn test_default_is_opaque_white() {
        assert_eq!(Rgba::default(), Rgba::WHITE);
    }
}
