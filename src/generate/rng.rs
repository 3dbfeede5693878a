use std::f64::consts::TAU;

const MODULUS: u64 = 2_147_483_647;

/// Park–Miller "minimal standard" linear congruential generator.
///
/// Each generator owns its sequence, so drawing from one never perturbs another. Use
/// [`Lcg::derive`] to give every layout family its own independent stream from one scene seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
    multiplier: u64,
}

impl Lcg {
    /// Classic multiplier.
    pub const MINSTD: u64 = 16_807;
    /// Revised multiplier with better spectral properties.
    pub const MINSTD2: u64 = 48_271;

    pub fn new(seed: u64) -> Self {
        Self::with_multiplier(seed, Self::MINSTD)
    }

    pub fn with_multiplier(seed: u64, multiplier: u64) -> Self {
        // The sequence is degenerate at 0, so a zero residue starts at 1 instead.
        let state = match seed % MODULUS {
            0 => 1,
            s => s,
        };
        Self { state, multiplier }
    }

    /// Independent generator for sub-family `salt` of `seed`.
    pub fn derive(seed: u64, salt: u64) -> Self {
        Self::new(mix64(seed ^ mix64(salt.wrapping_add(0x9E37_79B9_7F4A_7C15))))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = (self.state * self.multiplier) % MODULUS;
        self.state as u32
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32() - 1) / (MODULUS - 1) as f64
    }

    /// Uniform value in `[lo, hi)`.
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform index in `0..n`; `n == 0` yields 0.
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Random phase in `[0, 2π)`.
    pub fn phase(&mut self) -> f64 {
        self.next_f64() * TAU
    }

    /// `1.0` or `-1.0` with equal probability.
    pub fn sign(&mut self) -> f64 {
        if self.next_f64() < 0.5 { -1.0 } else { 1.0 }
    }
}

/// SplitMix64 finalizer.
pub(crate) fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
#[path = "../../tests/unit/generate/rng.rs"]
mod tests;
