//! Seeded procedural generation.
//!
//! Everything in here is a pure function of its inputs: no wall clock, no I/O, no global state.

pub mod placement;
pub mod rng;

pub use placement::{RidgeSample, RidgeSpec, RowSpec, pack_row, ridge_profile, scatter_spaced};
pub use rng::Lcg;
