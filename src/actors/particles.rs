use serde::{Deserialize, Serialize};

use crate::foundation::math::wrap_unit;
use crate::generate::rng::Lcg;
use crate::oscillators::twinkle;

/// Static description of one particle, produced by a layout generator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleSeed {
    pub x: f64,
    pub y: f64,
    /// Normalized units per second.
    pub vx: f64,
    pub vy: f64,
    /// Radius as a fraction of the surface's shorter side.
    pub size: f64,
    pub phase: f64,
    pub twinkle_rate: f64,
}

/// Live particle. Owns its generator so respawn jitter never depends on other particles.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub phase: f64,
    pub twinkle_rate: f64,
    rng: Lcg,
}

impl Particle {
    /// Brightness in `[floor, 1]` at `elapsed`.
    pub fn brightness(&self, elapsed: f64, floor: f64) -> f64 {
        twinkle(elapsed, self.twinkle_rate, self.phase, floor)
    }
}

/// A set of independently integrated particles that respawn at the opposite vertical bound.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleField {
    pub particles: Vec<Particle>,
    /// Vertical extent; particles leaving it re-enter from the other side.
    pub y_bounds: (f64, f64),
    respawns: u64,
}

impl ParticleField {
    pub fn new(seeds: &[ParticleSeed], seed: u64, y_bounds: (f64, f64)) -> Self {
        let particles = seeds
            .iter()
            .enumerate()
            .map(|(i, s)| Particle {
                x: s.x,
                y: s.y,
                vx: s.vx,
                vy: s.vy,
                size: s.size,
                phase: s.phase,
                twinkle_rate: s.twinkle_rate,
                rng: Lcg::derive(seed, i as u64),
            })
            .collect();
        Self {
            particles,
            y_bounds,
            respawns: 0,
        }
    }

    /// Integrate every particle by `delta` seconds.
    ///
    /// A particle leaving `y_bounds` re-enters at the opposite bound with a fresh x drawn from its
    /// own sequence, not jittered around its previous lane.
    pub fn step(&mut self, delta: f64) {
        let dt = delta.max(0.0);
        let (top, bottom) = self.y_bounds;
        for p in &mut self.particles {
            p.x = wrap_unit(p.x + p.vx * dt);
            p.y += p.vy * dt;
            let respawn_at = if p.y > bottom {
                Some(top)
            } else if p.y < top {
                Some(bottom)
            } else {
                None
            };
            if let Some(y) = respawn_at {
                p.y = y;
                p.x = p.rng.next_f64();
                self.respawns += 1;
            }
        }
    }

    /// Total respawns since creation.
    pub fn respawns(&self) -> u64 {
        self.respawns
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/actors/particles.rs"]
mod tests;
