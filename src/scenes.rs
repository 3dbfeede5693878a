//! Themed backdrops built on the shared engine.

use serde::{Deserialize, Serialize};

use crate::compositor::{SceneInstance, SceneRenderer};
use crate::foundation::core::Rgba;
use crate::foundation::error::{BackdropError, BackdropResult};
use crate::layout::{LayoutCache, LayoutParams};

mod common;
pub mod hyperborea;
pub mod moonlight;
pub mod storm_dusk;

pub use hyperborea::Hyperborea;
pub use moonlight::Moonlight;
pub use storm_dusk::StormDusk;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneId {
    /// Winter village under a spinning sun, with walking mammoths and snow.
    #[default]
    Hyperborea,
    /// Rain-soaked skyline at dusk under a moving cloud deck.
    StormDusk,
    /// Moonlit alpine ridges under aurora bands.
    Moonlight,
}

impl SceneId {
    pub const ALL: [SceneId; 3] = [SceneId::Hyperborea, SceneId::StormDusk, SceneId::Moonlight];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hyperborea => "hyperborea",
            Self::StormDusk => "storm_dusk",
            Self::Moonlight => "moonlight",
        }
    }

    /// Seed used when the host does not pick one.
    pub fn default_seed(self) -> u64 {
        match self {
            Self::Hyperborea => 101,
            Self::StormDusk => 19,
            Self::Moonlight => 42,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Hyperborea => "icy sky, spinning sun, village windows, walking mammoths, snow",
            Self::StormDusk => "storm clouds, skyline lights, traffic streaks, drizzle",
            Self::Moonlight => "stars, aurora bands, pulsing moon, layered ridges, mist",
        }
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SceneId {
    type Err = BackdropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == norm)
            .ok_or_else(|| {
                BackdropError::validation(format!(
                    "unknown scene \"{s}\" (expected one of: hyperborea, storm_dusk, moonlight)"
                ))
            })
    }
}

/// Instantiate scene `id`, sharing its layout through `cache`.
pub fn create_scene(
    id: SceneId,
    cache: &LayoutCache,
    seed: u64,
    params: &LayoutParams,
    background: Option<Rgba>,
) -> BackdropResult<Box<dyn SceneRenderer>> {
    Ok(match id {
        SceneId::Hyperborea => Box::new(SceneInstance::<Hyperborea>::new(
            cache, seed, params, background,
        )?),
        SceneId::StormDusk => Box::new(SceneInstance::<StormDusk>::new(
            cache, seed, params, background,
        )?),
        SceneId::Moonlight => Box::new(SceneInstance::<Moonlight>::new(
            cache, seed, params, background,
        )?),
    })
}

#[cfg(test)]
#[path = "../tests/unit/scenes.rs"]
mod tests;
