use kurbo::Point;

use crate::error::{LimnerError, LimnerResult};

/// Straight (non-premultiplied) RGBA8. All channel arithmetic in the engine
/// clamps to [0,255]; out-of-range inputs are tolerated, never errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `"RRGGBB"` or `"#RRGGBB"` into an opaque color.
    pub fn from_hex(s: &str) -> LimnerResult<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LimnerError::format(format!(
                "hex color must be 6 hex digits (got '{s}')"
            )));
        }
        let parse = |i: usize| -> LimnerResult<u8> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| LimnerError::format(format!("hex color '{s}': {e}")))
        };
        Ok(Self::opaque(parse(0)?, parse(2)?, parse(4)?))
    }

    /// Per-channel linear interpolation. `t` is clamped to [0,1]; channels
    /// are rounded and clamped to [0,255].
    pub fn lerp(c0: Self, c1: Self, t: f64) -> Self {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let ch = |a: u8, b: u8| -> u8 {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: ch(c0.r, c1.r),
            g: ch(c0.g, c1.g),
            b: ch(c0.b, c1.b),
            a: ch(c0.a, c1.a),
        }
    }

    /// Replace alpha with `a255` interpreted on a 0..=255 scale; negative or
    /// overlarge inputs clamp.
    pub fn with_alpha_f64(self, a255: f64) -> Self {
        let a = if a255.is_finite() {
            a255.round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        Self { a, ..self }
    }

    /// Multiply alpha by `opacity` in [0,1], clamped.
    pub fn scale_alpha(self, opacity: f64) -> Self {
        let op = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let a = (f64::from(self.a) * op).round().clamp(0.0, 255.0) as u8;
        Self { a, ..self }
    }
}

/// Normalized distance from `center` to `point` in units of `radius`.
///
/// Returns 0 at the center and 1 on the circle of `radius`; unclamped beyond
/// 1 so callers decide whether to clamp or extrapolate a falloff. A
/// non-positive radius yields 0 (the whole falloff collapses to its center
/// value).
pub fn radial_value(center: Point, radius: f64, point: Point) -> f64 {
    if !(radius > 0.0) {
        return 0.0;
    }
    center.distance(point) / radius
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Two endpoint colors plus a direction, evaluated per pixel.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum GradientSpec {
    Linear {
        from: Rgba,
        to: Rgba,
        axis: Axis,
    },
    Radial {
        from: Rgba,
        to: Rgba,
        center: Point,
        radius: f64,
    },
}

impl GradientSpec {
    pub fn eval(&self, x: u32, y: u32, width: u32, height: u32) -> Rgba {
        match *self {
            GradientSpec::Linear { from, to, axis } => {
                let t = match axis {
                    Axis::Vertical => {
                        if height <= 1 {
                            0.0
                        } else {
                            f64::from(y) / f64::from(height - 1)
                        }
                    }
                    Axis::Horizontal => {
                        if width <= 1 {
                            0.0
                        } else {
                            f64::from(x) / f64::from(width - 1)
                        }
                    }
                };
                Rgba::lerp(from, to, t)
            }
            GradientSpec::Radial {
                from,
                to,
                center,
                radius,
            } => {
                let t = radial_value(center, radius, Point::new(f64::from(x), f64::from(y)));
                Rgba::lerp(from, to, t)
            }
        }
    }
}
