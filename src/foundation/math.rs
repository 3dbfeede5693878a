use std::f64::consts::TAU;

/// Fractional part in `[0, 1)`, also for negative inputs.
pub fn fract(x: f64) -> f64 {
    let f = x - x.floor();
    // `x - floor(x)` can round up to exactly 1.0 for tiny negative inputs.
    if f >= 1.0 { 0.0 } else { f }
}

/// Hermite smoothstep between `edge0` and `edge1`.
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Wrap `x` into the half-open range `[min, max)`.
///
/// Returns the wrapped value together with the shift that was applied, so dependent state can be
/// moved by the same amount.
pub fn wrap_range(x: f64, min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span.is_nan() || span <= 0.0 || !x.is_finite() {
        return (min, min - x);
    }
    if x >= min && x < max {
        return (x, 0.0);
    }
    let wrapped = min + fract((x - min) / span) * span;
    // Guard the upper bound against rounding in the multiply-add above.
    let wrapped = if wrapped >= max { min } else { wrapped };
    (wrapped, wrapped - x)
}

/// Wrap into `[0, 1)`.
pub fn wrap_unit(x: f64) -> f64 {
    wrap_range(x, 0.0, 1.0).0
}

/// `sin(t * rate + phase)` remapped from `[-1, 1]` to `[0, 1]`.
pub fn unit_wave(t: f64, rate: f64, phase: f64) -> f64 {
    0.5 + 0.5 * (t * rate + phase).sin()
}

/// Convert turns (fractions of a full revolution) to radians.
pub fn turns(x: f64) -> f64 {
    x * TAU
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
