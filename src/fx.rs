use kurbo::{Point, Rect};

use crate::{
    canvas::Canvas,
    color::Rgba,
    error::{LimnerError, LimnerResult},
    model::EffectInstance,
    rng::Rng64,
    shape::Shape,
};

/// Typed effect, parsed from an [`EffectInstance`]'s kind + JSON params.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Glow {
        color: Rgba,
        intensity: u32,
    },
    Vignette {
        strength: f64,
        falloff_band: f64,
    },
    ParticleScatter {
        count: u32,
        color: Rgba,
        size_range: [f64; 2],
        alpha_range: [f64; 2],
        bounds: Rect,
    },
    RadialBurst {
        center: Point,
        inner: Rgba,
        outer: Rgba,
        max_radius: f64,
        step: f64,
    },
    LightRays {
        center: Point,
        color: Rgba,
        count: u32,
        length: f64,
        max_width: u32,
    },
}

pub fn parse_effect(inst: &EffectInstance) -> LimnerResult<Effect> {
    let kind = inst.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(LimnerError::validation("effect kind must be non-empty"));
    }

    match kind.as_str() {
        "glow" => {
            let color = get_color(&inst.params, "color")?;
            let intensity = get_u32(&inst.params, "intensity")?;
            if intensity == 0 || intensity > 16 {
                return Err(LimnerError::validation("Glow.intensity must be in 1..=16"));
            }
            Ok(Effect::Glow { color, intensity })
        }
        "vignette" => {
            let strength = get_f64(&inst.params, "strength")?;
            let falloff_band = get_f64(&inst.params, "falloff_band")?;
            if !(0.0..=1.0).contains(&strength) {
                return Err(LimnerError::validation("Vignette.strength must be in 0..=1"));
            }
            if falloff_band <= 0.0 {
                return Err(LimnerError::validation("Vignette.falloff_band must be > 0"));
            }
            Ok(Effect::Vignette {
                strength,
                falloff_band,
            })
        }
        "particles" | "particle_scatter" | "particle-scatter" => {
            let count = get_u32(&inst.params, "count")?;
            let color = get_color(&inst.params, "color")?;
            let size_range = get_range(&inst.params, "size_range")?;
            let alpha_range = get_range(&inst.params, "alpha_range")?;
            let bounds = get_rect(&inst.params, "bounds")?;
            Ok(Effect::ParticleScatter {
                count,
                color,
                size_range,
                alpha_range,
                bounds,
            })
        }
        "radialburst" | "radial_burst" | "radial-burst" => {
            let center = get_point(&inst.params, "center")?;
            let inner = get_color(&inst.params, "inner")?;
            let outer = get_color(&inst.params, "outer")?;
            let max_radius = get_f64(&inst.params, "max_radius")?;
            let step = get_f64(&inst.params, "step")?;
            if max_radius <= 0.0 {
                return Err(LimnerError::validation("RadialBurst.max_radius must be > 0"));
            }
            if step <= 0.0 {
                return Err(LimnerError::validation("RadialBurst.step must be > 0"));
            }
            Ok(Effect::RadialBurst {
                center,
                inner,
                outer,
                max_radius,
                step,
            })
        }
        "lightrays" | "light_rays" | "light-rays" => {
            let center = get_point(&inst.params, "center")?;
            let color = get_color(&inst.params, "color")?;
            let count = get_u32(&inst.params, "count")?;
            let length = get_f64(&inst.params, "length")?;
            let max_width = get_u32(&inst.params, "max_width")?;
            if count == 0 {
                return Err(LimnerError::validation("LightRays.count must be > 0"));
            }
            if length <= 0.0 || max_width == 0 {
                return Err(LimnerError::validation(
                    "LightRays.length and max_width must be > 0",
                ));
            }
            Ok(Effect::LightRays {
                center,
                color,
                count,
                length,
                max_width,
            })
        }
        _ => Err(LimnerError::validation(format!(
            "unknown effect kind '{kind}'"
        ))),
    }
}

/// Blur-then-overlay halo: a colored silhouette of the source alpha mask is
/// blurred `intensity` times with increasing radius, then the sharp original
/// is composited back on top.
///
/// Pass radii grow as `4 * pass`; at intensity 3 the combined spread keeps
/// the halo alpha strictly positive and strictly falling well past 10px from
/// a shape edge.
pub fn glow(src: &Canvas, color: Rgba, intensity: u32) -> LimnerResult<Canvas> {
    let mut halo = src.tinted_mask(color);
    for pass in 1..=intensity {
        halo = halo.gaussian_blur(4 * pass)?;
    }
    halo.composite_over(src.clone())?;
    Ok(halo)
}

/// Darken toward the border: alpha rises monotonically from 0 where the
/// distance to the nearest edge reaches `falloff_band`, up to `strength` at
/// the border itself.
pub fn vignette(canvas: &mut Canvas, strength: f64, falloff_band: f64) {
    let strength = strength.clamp(0.0, 1.0);
    if !(falloff_band > 0.0) || strength <= 0.0 {
        return;
    }
    let (w, h) = (canvas.width(), canvas.height());
    if w == 0 || h == 0 {
        return;
    }
    for y in 0..h {
        for x in 0..w {
            let d = f64::from(x.min(y).min(w - 1 - x).min(h - 1 - y));
            if d >= falloff_band {
                continue;
            }
            let t = 1.0 - d / falloff_band;
            let a = (strength * t * 255.0).round().clamp(0.0, 255.0) as u8;
            canvas.blend_pixel(x, y, Rgba::new(0, 0, 0, a));
        }
    }
}

/// Scatter `count` filled discs uniformly over `bounds`.
///
/// Per particle the stream is consumed in a fixed order (x, y, size, alpha)
/// so a seeded run is byte-for-byte reproducible. `alpha_range` is on the
/// 0..=255 scale.
pub fn particle_scatter(
    canvas: &mut Canvas,
    count: u32,
    color: Rgba,
    size_range: [f64; 2],
    alpha_range: [f64; 2],
    bounds: Rect,
    rng: &mut Rng64,
) {
    for _ in 0..count {
        let x = rng.next_range_f64(bounds.x0, bounds.x1);
        let y = rng.next_range_f64(bounds.y0, bounds.y1);
        let size = rng.next_range_f64(size_range[0], size_range[1]);
        let alpha = rng.next_range_f64(alpha_range[0], alpha_range[1]);
        canvas.draw_shape(
            &Shape::Ellipse {
                center: Point::new(x, y),
                radius_x: size,
                radius_y: size,
            },
            color.with_alpha_f64(alpha),
            None,
        );
    }
}

/// Overpainted disc burst: discs from `max_radius` down to 0 in decrements
/// of `step`, each filled with `lerp(inner, outer, r/max_radius)` and alpha
/// scaled by the `1 - r/max_radius` falloff.
///
/// Outer discs are painted first; inner passes land on top. Painting
/// inner-to-outer would invert the glow appearance.
pub fn radial_burst(
    canvas: &mut Canvas,
    center: Point,
    inner: Rgba,
    outer: Rgba,
    max_radius: f64,
    step: f64,
) {
    if !(max_radius > 0.0) || !(step > 0.0) {
        return;
    }
    let mut r = max_radius;
    while r > 0.0 {
        let t = r / max_radius;
        let ring = Rgba::lerp(inner, outer, t).scale_alpha(1.0 - t);
        canvas.draw_shape(
            &Shape::Ellipse {
                center,
                radius_x: r,
                radius_y: r,
            },
            ring,
            None,
        );
        r -= step;
    }
}

/// Dramatic ray burst: `count` rays at evenly spaced angles, each jittered
/// by one uniform draw from the stream, drawn as strokes tapering from
/// `max_width` down to 1 with alpha proportional to width (widest first).
pub fn light_rays(
    canvas: &mut Canvas,
    center: Point,
    color: Rgba,
    count: u32,
    length: f64,
    max_width: u32,
    rng: &mut Rng64,
) {
    for i in 0..count {
        let jitter = rng.next_range_f64(-0.1, 0.1);
        let angle = std::f64::consts::TAU * f64::from(i) / f64::from(count) + jitter;
        let end = Point::new(
            center.x + angle.cos() * length,
            center.y + angle.sin() * length,
        );
        for w in (1..=max_width).rev() {
            let ray = color.scale_alpha(f64::from(w) / f64::from(max_width));
            canvas.draw_shape(
                &Shape::Line {
                    from: center,
                    to: end,
                    width: f64::from(w),
                },
                ray,
                None,
            );
        }
    }
}

fn get_u32(obj: &serde_json::Value, key: &str) -> LimnerResult<u32> {
    let Some(v) = obj.get(key) else {
        return Err(LimnerError::validation(format!(
            "missing effect param '{key}'"
        )));
    };
    let Some(n) = v.as_u64() else {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be an integer"
        )));
    };
    u32::try_from(n)
        .map_err(|_| LimnerError::validation(format!("effect param '{key}' is out of range")))
}

fn get_f64(obj: &serde_json::Value, key: &str) -> LimnerResult<f64> {
    let Some(v) = obj.get(key) else {
        return Err(LimnerError::validation(format!(
            "missing effect param '{key}'"
        )));
    };
    let Some(n) = v.as_f64() else {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be a number"
        )));
    };
    if !n.is_finite() {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be finite"
        )));
    }
    Ok(n)
}

/// Colors accept either a `"#RRGGBB"` hex string (opaque) or an
/// `[r, g, b, a]` array.
fn get_color(obj: &serde_json::Value, key: &str) -> LimnerResult<Rgba> {
    let Some(v) = obj.get(key) else {
        return Err(LimnerError::validation(format!(
            "missing effect param '{key}'"
        )));
    };
    if let Some(s) = v.as_str() {
        return Rgba::from_hex(s);
    }
    let Some(arr) = v.as_array() else {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be a hex string or [r,g,b,a]"
        )));
    };
    if arr.len() != 4 {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' array must have 4 channels"
        )));
    }
    let mut ch = [0u8; 4];
    for (i, item) in arr.iter().enumerate() {
        let n = item.as_u64().ok_or_else(|| {
            LimnerError::validation(format!("effect param '{key}' channels must be integers"))
        })?;
        ch[i] = u8::try_from(n).map_err(|_| {
            LimnerError::validation(format!("effect param '{key}' channels must be 0..=255"))
        })?;
    }
    Ok(Rgba::new(ch[0], ch[1], ch[2], ch[3]))
}

fn get_point(obj: &serde_json::Value, key: &str) -> LimnerResult<Point> {
    let pair = get_f64_array::<2>(obj, key)?;
    Ok(Point::new(pair[0], pair[1]))
}

fn get_range(obj: &serde_json::Value, key: &str) -> LimnerResult<[f64; 2]> {
    let pair = get_f64_array::<2>(obj, key)?;
    if pair[1] < pair[0] {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be [lo, hi] with lo <= hi"
        )));
    }
    Ok(pair)
}

fn get_rect(obj: &serde_json::Value, key: &str) -> LimnerResult<Rect> {
    let v = get_f64_array::<4>(obj, key)?;
    Ok(Rect::new(v[0], v[1], v[2], v[3]))
}

fn get_f64_array<const N: usize>(obj: &serde_json::Value, key: &str) -> LimnerResult<[f64; N]> {
    let Some(v) = obj.get(key) else {
        return Err(LimnerError::validation(format!(
            "missing effect param '{key}'"
        )));
    };
    let Some(arr) = v.as_array() else {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must be an array of {N} numbers"
        )));
    };
    if arr.len() != N {
        return Err(LimnerError::validation(format!(
            "effect param '{key}' must have length {N}"
        )));
    }
    let mut out = [0.0f64; N];
    for (i, item) in arr.iter().enumerate() {
        let n = item.as_f64().ok_or_else(|| {
            LimnerError::validation(format!("effect param '{key}' entries must be numbers"))
        })?;
        if !n.is_finite() {
            return Err(LimnerError::validation(format!(
                "effect param '{key}' entries must be finite"
            )));
        }
        out[i] = n;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(kind: &str, params: serde_json::Value) -> EffectInstance {
        EffectInstance {
            kind: kind.to_string(),
            params,
        }
    }

    #[test]
    fn parse_glow_with_hex_color() {
        let e = parse_effect(&inst(
            "glow",
            serde_json::json!({ "color": "#FFC864", "intensity": 3 }),
        ))
        .unwrap();
        assert_eq!(
            e,
            Effect::Glow {
                color: Rgba::opaque(255, 200, 100),
                intensity: 3
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_kind_and_bad_params() {
        assert!(parse_effect(&inst("wobble", serde_json::json!({}))).is_err());
        assert!(parse_effect(&inst("glow", serde_json::json!({ "intensity": 3 }))).is_err());
        assert!(
            parse_effect(&inst(
                "vignette",
                serde_json::json!({ "strength": 1.5, "falloff_band": 10.0 })
            ))
            .is_err()
        );
        assert!(
            parse_effect(&inst(
                "particles",
                serde_json::json!({
                    "count": 5, "color": [1, 2, 3, 4],
                    "size_range": [4.0, 1.0],
                    "alpha_range": [0.0, 255.0],
                    "bounds": [0.0, 0.0, 8.0, 8.0]
                })
            ))
            .is_err()
        );
    }

    #[test]
    fn glow_keeps_sharp_center_and_adds_halo() {
        let mut src = Canvas::transparent(32, 32).unwrap();
        src.draw_shape(
            &Shape::Ellipse {
                center: Point::new(16.0, 16.0),
                radius_x: 6.0,
                radius_y: 6.0,
            },
            Rgba::opaque(255, 200, 100),
            None,
        );
        let out = glow(&src, Rgba::opaque(255, 200, 100), 2).unwrap();
        assert_eq!(out.pixel(16, 16), Some(Rgba::opaque(255, 200, 100)));
        // Just outside the disc the source is empty but the halo is not.
        assert_eq!(src.pixel(16, 25).unwrap().a, 0);
        assert!(out.pixel(16, 25).unwrap().a > 0);
    }

    #[test]
    fn vignette_darkening_is_monotonic_toward_the_edge() {
        let mut c = Canvas::new(32, 32, Rgba::opaque(200, 200, 200)).unwrap();
        vignette(&mut c, 0.8, 12.0);
        let center = c.pixel(16, 16).unwrap().r;
        let mid = c.pixel(6, 16).unwrap().r;
        let edge = c.pixel(0, 16).unwrap().r;
        assert_eq!(center, 200);
        assert!(mid < center);
        assert!(edge < mid);
    }

    #[test]
    fn particle_scatter_draws_exactly_count_within_bounds() {
        let mut c = Canvas::transparent(64, 64).unwrap();
        let bounds = Rect::new(8.0, 8.0, 24.0, 24.0);
        let mut rng = Rng64::new(7);
        particle_scatter(
            &mut c,
            40,
            Rgba::opaque(255, 255, 255),
            [1.0, 1.0],
            [255.0, 255.0],
            bounds,
            &mut rng,
        );
        // Exactly 4 stream draws per particle.
        let mut expected = Rng64::new(7);
        for _ in 0..(40 * 4) {
            let _ = expected.next_u64();
        }
        assert_eq!(rng.next_u64(), expected.next_u64());
        // Nothing lands outside the region (plus the 1px particle radius).
        for y in 0..64 {
            for x in 0..64 {
                if c.pixel(x, y).unwrap().a != 0 {
                    assert!((7..=25).contains(&x) && (7..=25).contains(&y));
                }
            }
        }
    }

    #[test]
    fn radial_burst_is_brightest_at_the_center() {
        let mut c = Canvas::new(64, 64, Rgba::opaque(0, 0, 0)).unwrap();
        radial_burst(
            &mut c,
            Point::new(32.0, 32.0),
            Rgba::opaque(255, 68, 68),
            Rgba::opaque(255, 68, 68),
            30.0,
            2.0,
        );
        let center = c.pixel(32, 32).unwrap().r;
        let rim = c.pixel(32, 60).unwrap().r;
        let outside = c.pixel(0, 0).unwrap().r;
        assert!(center > rim);
        assert_eq!(outside, 0);
    }

    #[test]
    fn light_rays_consume_one_draw_per_ray() {
        let mut c = Canvas::transparent(64, 64).unwrap();
        let mut rng = Rng64::new(3);
        light_rays(
            &mut c,
            Point::new(32.0, 32.0),
            Rgba::new(255, 250, 200, 30),
            8,
            28.0,
            6,
            &mut rng,
        );
        let mut expected = Rng64::new(3);
        for _ in 0..8 {
            let _ = expected.next_u64();
        }
        assert_eq!(rng.next_u64(), expected.next_u64());
        assert!(c.pixel(32, 32).unwrap().a > 0);
    }
}
