use crate::error::{LimnerError, LimnerResult};

pub type StraightRgba8 = [u8; 4];

/// Straight-alpha "over": `out = dst*(1-a) + src*a` per color channel, with
/// alpha accumulating as `a_out = a_src + a_dst*(1-a_src)`. This is the sole
/// blending rule in the engine. `opacity` scales the source alpha and is
/// clamped to [0,1].
///
/// Integer Q8 arithmetic keeps results bit-identical across platforms.
pub fn over(dst: StraightRgba8, src: StraightRgba8, opacity: f32) -> StraightRgba8 {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return [src[0], src[1], src[2], 255];
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), u16::from(sa));
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Blend `src` over `dst` pixel by pixel. Both must be RGBA8 buffers of the
/// same length.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> LimnerResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(LimnerError::dimension(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
