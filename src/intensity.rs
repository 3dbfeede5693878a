//! Visual intensity: an external mode signal turned into glow/opacity multipliers.

use crate::foundation::error::BackdropError;
use crate::signal::{Signal, Subscription};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Effects mode chosen by the host application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FxMode {
    /// Reduced effects.
    Clear,
    #[default]
    Cinematic,
    /// Maximum effects.
    Max,
}

impl FxMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cinematic => "cinematic",
            Self::Max => "max",
        }
    }

    pub fn intensity(self) -> Intensity {
        match self {
            Self::Clear => Intensity {
                glow: 0.35,
                opacity: 0.7,
            },
            Self::Cinematic => Intensity::NEUTRAL,
            Self::Max => Intensity {
                glow: 1.45,
                opacity: 1.15,
            },
        }
    }
}

impl std::str::FromStr for FxMode {
    type Err = BackdropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" | "reduced" => Ok(Self::Clear),
            "cinematic" => Ok(Self::Cinematic),
            "max" | "maximum" => Ok(Self::Max),
            other => Err(BackdropError::validation(format!(
                "unknown fx mode \"{other}\" (expected clear, cinematic or max)"
            ))),
        }
    }
}

/// Multipliers applied by draw stages. Geometry is never scaled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Intensity {
    /// Scales glow alphas (halos, light cones, auroras).
    pub glow: f32,
    /// Scales decorative overlay opacity (haze, mist, grain).
    pub opacity: f32,
}

impl Intensity {
    pub const NEUTRAL: Self = Self {
        glow: 1.0,
        opacity: 1.0,
    };

    /// Scale a glow alpha, clamped to `[0, 1]`.
    pub fn glow_alpha(&self, alpha: f32) -> f32 {
        (alpha * self.glow).clamp(0.0, 1.0)
    }

    /// Scale an overlay alpha, clamped to `[0, 1]`.
    pub fn overlay_alpha(&self, alpha: f32) -> f32 {
        (alpha * self.opacity).clamp(0.0, 1.0)
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Holds the current multipliers, updated by change notification rather than polling.
///
/// The compositor calls [`IntensityAdapter::sample`] once at the start of each frame, so a change
/// that arrives mid-frame takes effect from the next frame on.
#[derive(Debug)]
pub struct IntensityAdapter {
    current: Rc<Cell<Intensity>>,
    _subscription: Option<Subscription>,
}

impl IntensityAdapter {
    /// Follow `signal` until the adapter is dropped.
    pub fn observe(signal: &Signal<FxMode>) -> Self {
        let current = Rc::new(Cell::new(signal.get().intensity()));
        let sink = Rc::clone(&current);
        let subscription = signal.subscribe(move |mode| {
            tracing::debug!(mode = mode.as_str(), "fx mode changed");
            sink.set(mode.intensity());
        });
        Self {
            current,
            _subscription: Some(subscription),
        }
    }

    /// Adapter that never changes.
    pub fn fixed(intensity: Intensity) -> Self {
        Self {
            current: Rc::new(Cell::new(intensity)),
            _subscription: None,
        }
    }

    pub fn sample(&self) -> Intensity {
        self.current.get()
    }

    /// Glow multiplier.
    pub fn multiplier(&self) -> f32 {
        self.current.get().glow
    }
}

#[cfg(test)]
#[path = "../tests/unit/intensity.rs"]
mod tests;
