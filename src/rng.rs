/// Seeded pseudo-random stream for particle jitter and color choice.
///
/// One `Rng64` is owned per Recipe execution; every effect that needs
/// randomness receives it explicitly and consumes draws in a documented
/// order, so a seed fully determines the pixel output.
#[derive(Clone, Copy, Debug)]
pub struct Rng64 {
    state: u64,
}

impl Rng64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        mix64(self.state)
    }

    pub fn next_f64_01(&mut self) -> f64 {
        // 53 bits of precision.
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform draw from `[lo, hi)`. A reversed or empty range returns `lo`
    /// but still consumes exactly one draw, so the stream layout stays fixed.
    pub fn next_range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        let u = self.next_f64_01();
        if !(hi > lo) {
            return lo;
        }
        lo + (hi - lo) * u
    }
}

/// SplitMix64 finalizer. Also used to fold text seeds down to a `u64`.
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
