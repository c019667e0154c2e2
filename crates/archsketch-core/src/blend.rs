//! Blend modes and straight-alpha pixel compositing.

use serde::{Deserialize, Serialize};

/// Standard separable compositing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    /// All blend modes, in menu order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::HardLight => "Hard Light",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
        }
    }

    /// Per-channel blend function `B(base, top)` on normalized values.
    fn channel(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Normal => top,
            BlendMode::Multiply => base * top,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Overlay => hard_light(top, base),
            BlendMode::Darken => base.min(top),
            BlendMode::Lighten => base.max(top),
            BlendMode::ColorDodge => {
                if base <= 0.0 {
                    0.0
                } else if top >= 1.0 {
                    1.0
                } else {
                    (base / (1.0 - top)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if base >= 1.0 {
                    1.0
                } else if top <= 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - base) / top).max(0.0)
                }
            }
            BlendMode::HardLight => hard_light(base, top),
            BlendMode::SoftLight => soft_light(base, top),
            BlendMode::Difference => (base - top).abs(),
            BlendMode::Exclusion => base + top - 2.0 * base * top,
        }
    }
}

fn hard_light(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base * 2.0 * top
    } else {
        let t = 2.0 * top - 1.0;
        base + t - base * t
    }
}

/// W3C soft light.
fn soft_light(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Composite `top` over `base` (both straight alpha) with `mode` at `opacity`.
///
/// `out_a = top_a + base_a * (1 - top_a)`. The blended colour is mixed with
/// the plain top colour where the base is transparent, so non-normal modes do
/// not darken empty pixels.
pub fn blend_pixel(base: [u8; 4], top: [u8; 4], mode: BlendMode, opacity: f32) -> [u8; 4] {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if mode == BlendMode::Normal && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    let base_a = base[3] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let b = base[c] as f32 / 255.0;
        let t = top[c] as f32 / 255.0;
        let mixed = (1.0 - base_a) * t + base_a * mode.channel(b, t);
        out[c] = to_u8((mixed * top_a + b * base_a * (1.0 - top_a)) / out_a);
    }
    out[3] = to_u8(out_a);
    out
}

/// Destination-out: remove `amount` (0..1) of the base pixel's coverage.
pub fn erase_pixel(base: [u8; 4], amount: f32) -> [u8; 4] {
    let amount = amount.clamp(0.0, 1.0);
    if amount <= 0.0 || base[3] == 0 {
        return base;
    }
    let a = base[3] as f32 / 255.0 * (1.0 - amount);
    let a = to_u8(a);
    if a == 0 {
        [0, 0, 0, 0]
    } else {
        [base[0], base[1], base[2], a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_top_is_noop() {
        let base = [10, 20, 30, 200];
        assert_eq!(blend_pixel(base, [255, 0, 0, 0], BlendMode::Multiply, 1.0), base);
    }

    #[test]
    fn test_normal_opaque_overwrites() {
        let top = [1, 2, 3, 255];
        assert_eq!(blend_pixel([200, 200, 200, 255], top, BlendMode::Normal, 1.0), top);
    }

    #[test]
    fn test_normal_half_opacity() {
        let out = blend_pixel([0, 0, 255, 255], [255, 0, 0, 255], BlendMode::Normal, 0.5);
        assert_eq!(out[3], 255);
        assert!((out[0] as i32 - 128).abs() <= 1);
        assert!((out[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_over_transparent_keeps_color() {
        let out = blend_pixel([0, 0, 0, 0], [200, 100, 50, 255], BlendMode::Multiply, 0.5);
        assert_eq!(&out[..3], &[200, 100, 50]);
        assert!((out[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_multiply_and_screen() {
        let base = [128, 255, 0, 255];
        let top = [128, 128, 128, 255];
        let m = blend_pixel(base, top, BlendMode::Multiply, 1.0);
        assert!((m[0] as i32 - 64).abs() <= 1);
        assert_eq!(m[1], 128);
        assert_eq!(m[2], 0);
        let s = blend_pixel(base, top, BlendMode::Screen, 1.0);
        assert!((s[0] as i32 - 192).abs() <= 1);
        assert_eq!(s[1], 255);
    }

    #[test]
    fn test_difference_of_equal_is_black() {
        let px = [90, 140, 30, 255];
        let out = blend_pixel(px, px, BlendMode::Difference, 1.0);
        assert_eq!(out, [0, 0, 0, 255]);
    }

    #[test]
    fn test_erase() {
        assert_eq!(erase_pixel([10, 10, 10, 255], 1.0), [0, 0, 0, 0]);
        let half = erase_pixel([10, 10, 10, 255], 0.5);
        assert!((half[3] as i32 - 128).abs() <= 1);
    }
}
