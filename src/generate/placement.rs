use crate::generate::rng::Lcg;
use serde::{Deserialize, Serialize};

/// Cursor-packing rule for non-overlapping entities along a horizontal row.
///
/// Coordinates are normalized to the viewport width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowSpec {
    /// Left edge of the first entity.
    pub start: f64,
    /// Packing stops once the cursor passes this coordinate.
    pub end: f64,
    pub width_min: f64,
    pub width_max: f64,
    pub gap_min: f64,
    pub gap_max: f64,
    /// Hard cap on the number of entities, whatever the widths turn out to be.
    pub max_items: usize,
}

/// Pack entities left to right: each one starts where the previous one ended plus a gap.
///
/// This is the closed-form placement rule: it never rejects a draw, so entities cannot overlap and
/// the loop always terminates. `make` receives the generator, the left edge and the width, and may
/// draw further per-entity attributes from the same sequence.
pub fn pack_row<T>(
    rng: &mut Lcg,
    spec: RowSpec,
    mut make: impl FnMut(&mut Lcg, f64, f64) -> T,
) -> Vec<T> {
    let width_min = spec.width_min.max(1e-4);
    let width_max = spec.width_max.max(width_min);
    let gap_min = spec.gap_min.max(0.0);
    let gap_max = spec.gap_max.max(gap_min);

    let mut out = Vec::new();
    let mut cursor = spec.start;
    while cursor < spec.end && out.len() < spec.max_items {
        let width = rng.range(width_min, width_max);
        out.push(make(rng, cursor, width));
        cursor += width + rng.range(gap_min, gap_max);
    }
    out
}

/// Draw `count` positions in `[lo, hi)` that keep at least `min_spacing` from each other.
///
/// Each position gets at most `max_attempts` candidate draws. When none satisfies the spacing, the
/// candidate farthest from its nearest neighbor is accepted instead, so crowded requests degrade
/// to a best-effort layout rather than looping.
pub fn scatter_spaced(
    rng: &mut Lcg,
    count: usize,
    lo: f64,
    hi: f64,
    min_spacing: f64,
    max_attempts: usize,
) -> Vec<f64> {
    let attempts = max_attempts.max(1);
    let mut out: Vec<f64> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut best = (f64::NEG_INFINITY, lo);
        for _ in 0..attempts {
            let candidate = rng.range(lo, hi);
            let clearance = out
                .iter()
                .map(|p| (p - candidate).abs())
                .fold(f64::INFINITY, f64::min);
            if clearance >= min_spacing {
                best = (clearance, candidate);
                break;
            }
            if clearance > best.0 {
                best = (clearance, candidate);
            }
        }
        out.push(best.1);
    }
    out
}

/// Silhouette ridge sampled at evenly spaced stations, with a valley carved in the middle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RidgeSpec {
    /// Number of stations, including both ends.
    pub stations: usize,
    /// Baseline height (normalized, 0 = top of viewport).
    pub base: f64,
    /// Peak amplitude above the baseline.
    pub amplitude: f64,
    /// Center of the valley envelope.
    pub valley_center: f64,
    /// Gaussian width of the valley envelope.
    pub valley_width: f64,
    /// How much of the amplitude the valley removes at its center (`0..=1`).
    pub valley_depth: f64,
}

/// One station of a ridge profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RidgeSample {
    pub x: f64,
    pub y: f64,
}

pub fn ridge_profile(rng: &mut Lcg, spec: RidgeSpec) -> Vec<RidgeSample> {
    let n = spec.stations.max(2);
    let depth = spec.valley_depth.clamp(0.0, 1.0);
    let width = spec.valley_width.max(1e-3);
    (0..n)
        .map(|i| {
            let x = i as f64 / (n - 1) as f64;
            let d = (x - spec.valley_center) / width;
            let envelope = 1.0 - depth * (-d * d).exp();
            let peak = rng.range(0.35, 1.0);
            RidgeSample {
                x,
                y: spec.base - spec.amplitude * peak * envelope,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/generate/placement.rs"]
mod tests;
