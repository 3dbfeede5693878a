//! Per-instance animation state for moving scene elements.

pub mod gait;
pub mod particles;

pub use gait::{GaitLeg, GaitParams, LegPose, Walker, leg_joints};
pub use particles::{Particle, ParticleField, ParticleSeed};
