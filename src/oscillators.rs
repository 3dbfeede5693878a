//! Periodic modulation functions of elapsed time.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{clamp01, smoothstep};

/// Fast sinusoidal flicker in `[1 - depth, 1]`.
pub fn flicker(t: f64, rate: f64, phase: f64, depth: f64) -> f64 {
    let depth = depth.clamp(0.0, 1.0);
    1.0 - depth * (0.5 - 0.5 * (t * rate + phase).sin())
}

/// Rare blink-out events: a slow sinusoid pushed through a narrow smoothstep near its crest,
/// so it is zero almost all the time and briefly rises to one.
pub fn blink_dip(t: f64, rate: f64, phase: f64) -> f64 {
    smoothstep(0.965, 0.995, (t * rate + phase).sin())
}

/// Brightness oscillating in `[floor, 1]`.
pub fn twinkle(t: f64, rate: f64, phase: f64, floor: f64) -> f64 {
    let floor = floor.clamp(0.0, 1.0);
    floor + (1.0 - floor) * (0.5 + 0.5 * (t * rate + phase).sin())
}

/// Scale factor `1 ± depth` for breathing glows.
pub fn pulse(t: f64, rate: f64, depth: f64) -> f64 {
    1.0 + (t * rate).sin() * depth
}

/// Sharp, mostly-zero spikes: `max(0, sin)^power`.
pub fn spike(t: f64, rate: f64, phase: f64, power: i32) -> f64 {
    (t * rate + phase).sin().max(0.0).powi(power)
}

/// Per-window lighting parameters, drawn once by the generator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowLight {
    pub base: f64,
    pub flicker_rate: f64,
    pub flicker_phase: f64,
    pub blink_rate: f64,
    pub blink_phase: f64,
}

impl WindowLight {
    /// `base × flicker(t) × (1 − blink_dip(t))`, clamped to `[0, 1]`.
    pub fn brightness(&self, t: f64) -> f64 {
        clamp01(
            self.base
                * flicker(t, self.flicker_rate, self.flicker_phase, 0.3)
                * (1.0 - blink_dip(t, self.blink_rate, self.blink_phase)),
        )
    }
}

#[cfg(test)]
#[path = "../tests/unit/oscillators.rs"]
mod tests;
