use std::f64::consts::PI;

use serde::Serialize;

use crate::foundation::core::{Point, Vec2};
use crate::foundation::math::{fract, lerp, wrap_range};

pub const LEG_COUNT: usize = 4;

/// Gait timing shared by every leg of a walker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaitParams {
    /// Full gait cycles per second.
    pub step_rate: f64,
    /// Fraction of the cycle a foot spends planted.
    pub duty: f64,
    /// Phase offset of each leg within the cycle.
    pub leg_offsets: [f64; LEG_COUNT],
}

impl Default for GaitParams {
    /// Lateral-sequence walk: back-left, front-left, back-right, front-right.
    fn default() -> Self {
        Self {
            step_rate: 1.0,
            duty: 0.6,
            leg_offsets: [0.0, 0.5, 0.25, 0.75],
        }
    }
}

/// Contact state of one leg, in the walker's normalized x coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GaitLeg {
    /// Where the foot is (or was last) planted.
    pub contact: f64,
    /// Where the foot will land at the end of the current swing.
    pub next_contact: f64,
    pub stance: bool,
}

/// Foot placement for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegPose {
    pub foot_x: f64,
    /// Lift as a fraction of the maximum foot height, `0` while planted.
    pub lift: f64,
}

/// A quadruped moving at constant speed along x, wrapping between `bounds`.
#[derive(Clone, Debug, PartialEq)]
pub struct Walker {
    pub x: f64,
    /// Normalized units per second; negative walks left.
    pub speed: f64,
    /// Actor phase offset in cycles.
    pub phase: f64,
    pub gait: GaitParams,
    pub bounds: (f64, f64),
    /// Hip position of each leg relative to `x`, in walk direction.
    pub hip_offsets: [f64; LEG_COUNT],
    pub legs: [GaitLeg; LEG_COUNT],
    /// Seconds of integrated motion. The gait phase runs on this clock so feet and body
    /// always cover the same ground.
    pub gait_time: f64,
}

impl Walker {
    /// Create a walker with its feet planted for the start of the gait cycle.
    pub fn new(
        x: f64,
        speed: f64,
        phase: f64,
        gait: GaitParams,
        bounds: (f64, f64),
        hip_offsets: [f64; LEG_COUNT],
    ) -> Self {
        let mut w = Self {
            x,
            speed,
            phase,
            gait: GaitParams {
                step_rate: if gait.step_rate > 0.0 { gait.step_rate } else { 1.0 },
                duty: gait.duty.clamp(0.05, 0.95),
                ..gait
            },
            bounds,
            hip_offsets,
            legs: [GaitLeg {
                contact: x,
                next_contact: x,
                stance: true,
            }; LEG_COUNT],
            gait_time: 0.0,
        };
        w.prime();
        w
    }

    /// Ground covered during one gait cycle. Signed like `speed`.
    pub fn stride(&self) -> f64 {
        self.speed / self.gait.step_rate
    }

    pub fn hip(&self, leg: usize) -> f64 {
        self.x + self.hip_offsets[leg] * self.speed.signum()
    }

    pub fn leg_phase(&self, leg: usize) -> f64 {
        fract(self.gait_time * self.gait.step_rate + self.phase + self.gait.leg_offsets[leg])
    }

    /// Re-plant every foot for the current gait time without any transition history.
    pub fn prime(&mut self) {
        let stride = self.stride();
        let duty = self.gait.duty;
        for leg in 0..LEG_COUNT {
            let p = self.leg_phase(leg);
            let hip = self.hip(leg);
            self.legs[leg] = if p < duty {
                let contact = hip + stride * (duty / 2.0 - p);
                GaitLeg {
                    contact,
                    next_contact: contact,
                    stance: true,
                }
            } else {
                let next = hip + stride * (1.0 - p + duty / 2.0);
                GaitLeg {
                    contact: next - stride,
                    next_contact: next,
                    stance: false,
                }
            };
        }
    }

    /// Integrate position and gait over `delta` seconds, wrapping at `bounds`.
    ///
    /// Long deltas are split so no leg skips a stance or swing phase. Returns the total wrap
    /// shift applied (zero when no wrap happened).
    pub fn advance(&mut self, delta: f64) -> f64 {
        if !delta.is_finite() || delta <= 0.0 {
            return 0.0;
        }
        let max_step = self.gait.duty.min(1.0 - self.gait.duty) / self.gait.step_rate / 2.0;
        let steps = (delta / max_step).ceil().max(1.0);
        let h = delta / steps;
        let mut total = 0.0;
        for _ in 0..steps as u64 {
            self.x += self.speed * h;
            self.gait_time += h;
            let (x, shift) = wrap_range(self.x, self.bounds.0, self.bounds.1);
            self.x = x;
            if shift != 0.0 {
                for leg in &mut self.legs {
                    leg.contact += shift;
                    leg.next_contact += shift;
                }
                total += shift;
            }
            self.update_legs();
        }
        total
    }

    /// Apply stance/swing transitions for the current gait phase.
    pub fn update_legs(&mut self) {
        let stride = self.stride();
        for leg in 0..LEG_COUNT {
            let in_stance = self.leg_phase(leg) < self.gait.duty;
            let state = &mut self.legs[leg];
            match (state.stance, in_stance) {
                (true, false) => {
                    state.next_contact = state.contact + stride;
                    state.stance = false;
                }
                (false, true) => {
                    state.contact = state.next_contact;
                    state.stance = true;
                }
                _ => {}
            }
        }
    }

    pub fn pose(&self, leg: usize) -> LegPose {
        let state = self.legs[leg];
        if state.stance {
            return LegPose {
                foot_x: state.contact,
                lift: 0.0,
            };
        }
        let p = self.leg_phase(leg);
        let s = ((p - self.gait.duty) / (1.0 - self.gait.duty)).clamp(0.0, 1.0);
        LegPose {
            foot_x: lerp(state.contact, state.next_contact, s),
            lift: (PI * s).sin().max(0.0),
        }
    }
}

/// Knee position of a two-segment leg from `hip` to `foot`.
///
/// The knee sits off the hip–foot line, perpendicular to it, on the side selected by `bend`
/// (`1.0` or `-1.0`). Out-of-reach feet straighten the leg instead of failing.
pub fn leg_joints(hip: Point, foot: Point, upper: f64, lower: f64, bend: f64) -> Point {
    let v = foot - hip;
    let reach = (upper + lower).max(1e-9);
    let d = v.hypot().clamp(1e-9, reach * 0.999);
    let dir = if v.hypot() > 1e-9 {
        v / v.hypot()
    } else {
        Vec2::new(0.0, 1.0)
    };
    let along = (upper * upper - lower * lower + d * d) / (2.0 * d);
    let off = (upper * upper - along * along).max(0.0).sqrt();
    let normal = Vec2::new(-dir.y, dir.x);
    hip + dir * along + normal * off * bend.signum()
}

#[cfg(test)]
#[path = "../../tests/unit/actors/gait.rs"]
mod tests;
