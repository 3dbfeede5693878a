use std::path::{Path, PathBuf};

use crate::{
    clock::ClockOpts,
    foundation::core::{Rgba, Viewport},
    foundation::error::{BackdropError, BackdropResult},
    intensity::FxMode,
    layout::LayoutParams,
    scenes::SceneId,
    surface::manager::SurfaceOpts,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackdropConfig {
    pub scene: SceneId,
    /// Layout seed; `None` uses the scene's canonical seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Entity density multiplier in `0.25..=4`.
    pub detail: f64,
    pub fx: FxMode,
    pub clock: ClockConfig,
    pub surface: SurfaceOpts,
    /// Viewport used by offline hosts (CLI, tests).
    pub viewport: ViewportConfig,
    /// Optional image drawn by scenes that have an image stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
    /// Clear colour; transparent when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgba>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    pub max_delta_ms: f64,
    pub time_scale: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            scene: SceneId::default(),
            seed: None,
            detail: 1.0,
            fx: FxMode::default(),
            clock: ClockConfig::default(),
            surface: SurfaceOpts::default(),
            viewport: ViewportConfig::default(),
            asset: None,
            background: None,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        let opts = ClockOpts::default();
        Self {
            max_delta_ms: opts.max_delta_secs * 1000.0,
            time_scale: opts.time_scale,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        let vp = Viewport::default();
        Self {
            width: vp.css_width,
            height: vp.css_height,
            device_pixel_ratio: vp.device_pixel_ratio,
        }
    }
}

impl BackdropConfig {
    pub fn from_json_str(s: &str) -> BackdropResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> BackdropResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BackdropError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> BackdropResult<()> {
        if !self.detail.is_finite() || !(0.25..=4.0).contains(&self.detail) {
            return Err(BackdropError::validation(format!(
                "detail must be within 0.25..=4, got {}",
                self.detail
            )));
        }
        positive("clock.max_delta_ms", self.clock.max_delta_ms)?;
        positive("clock.time_scale", self.clock.time_scale)?;
        positive(
            "surface.max_device_pixel_ratio",
            self.surface.max_device_pixel_ratio,
        )?;
        positive("viewport.width", self.viewport.width)?;
        positive("viewport.height", self.viewport.height)?;
        positive(
            "viewport.device_pixel_ratio",
            self.viewport.device_pixel_ratio,
        )?;
        if let Some(bg) = self.background
            && [bg.r, bg.g, bg.b, bg.a].iter().any(|c| !c.is_finite())
        {
            return Err(BackdropError::validation("background colour must be finite"));
        }
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| self.scene.default_seed())
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            detail: self.detail,
        }
    }

    pub fn clock_opts(&self) -> ClockOpts {
        ClockOpts {
            time_scale: self.clock.time_scale,
            max_delta_secs: self.clock.max_delta_ms / 1000.0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.viewport.width,
            self.viewport.height,
            self.viewport.device_pixel_ratio,
        )
    }
}

fn positive(field: &str, v: f64) -> BackdropResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(BackdropError::validation(format!(
            "{field} must be finite and > 0, got {v}"
        )))
    }
}
