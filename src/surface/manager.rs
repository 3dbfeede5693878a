use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{SurfaceSize, Viewport};
use crate::surface::draw::{DrawSurface, PatternId, PatternTile};

/// Surface manager options.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceOpts {
    /// Device pixel ratios above this are clamped to bound the backing-store size.
    pub max_device_pixel_ratio: f64,
}

impl Default for SurfaceOpts {
    fn default() -> Self {
        Self {
            max_device_pixel_ratio: 2.0,
        }
    }
}

/// Lazily built pattern tiles, valid for one surface size.
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: HashMap<&'static str, Option<PatternId>>,
    builds: u64,
}

impl PatternCache {
    /// Return the pattern registered under `name`, building and registering it on first use.
    ///
    /// A surface without pattern support yields `None` once and is not asked again until the
    /// cache is invalidated.
    pub fn get_or_build(
        &mut self,
        name: &'static str,
        surface: &mut dyn DrawSurface,
        build: impl FnOnce(SurfaceSize) -> PatternTile,
    ) -> Option<PatternId> {
        if let Some(id) = self.entries.get(name) {
            return *id;
        }
        let tile = build(surface.size());
        let id = surface.create_pattern(&tile);
        self.builds += 1;
        tracing::debug!(name, w = tile.width, h = tile.height, ok = id.is_some(), "built pattern");
        self.entries.insert(name, id);
        id
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of tiles built since creation.
    pub fn build_count(&self) -> u64 {
        self.builds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns the surface's pixel dimensions and everything cached per size.
#[derive(Debug, Default)]
pub struct SurfaceManager {
    opts: SurfaceOpts,
    size: Option<SurfaceSize>,
    /// What the surface reported after the last `set_size`; surfaces may clamp the request.
    accepted: Option<SurfaceSize>,
    resizes: u64,
    patterns: PatternCache,
}

impl SurfaceManager {
    pub fn new(opts: SurfaceOpts) -> Self {
        Self {
            opts,
            ..Self::default()
        }
    }

    /// Backing-store size for `viewport`: `floor(css × dpr)` with the ratio sanitized and clamped.
    pub fn backing_size(&self, viewport: Viewport) -> SurfaceSize {
        let max_dpr = if self.opts.max_device_pixel_ratio.is_finite()
            && self.opts.max_device_pixel_ratio > 0.0
        {
            self.opts.max_device_pixel_ratio
        } else {
            1.0
        };
        let dpr = if viewport.device_pixel_ratio.is_finite() && viewport.device_pixel_ratio > 0.0 {
            viewport.device_pixel_ratio.min(max_dpr)
        } else {
            1.0
        };
        let px = |css: f64| -> u32 {
            if css.is_finite() && css > 0.0 {
                (css * dpr).floor().min(f64::from(u32::MAX)) as u32
            } else {
                0
            }
        };
        SurfaceSize::new(px(viewport.css_width), px(viewport.css_height))
    }

    /// Bring `surface` in line with `viewport`.
    ///
    /// Only an actual dimension change touches the surface and drops size-dependent caches;
    /// returns whether that happened.
    pub fn resize(&mut self, viewport: Viewport, surface: &mut dyn DrawSurface) -> bool {
        let target = self.backing_size(viewport);
        if self.size == Some(target) && self.accepted == Some(surface.size()) {
            return false;
        }
        surface.set_size(target);
        self.size = Some(target);
        self.accepted = Some(surface.size());
        self.resizes += 1;
        self.patterns.invalidate();
        tracing::debug!(w = target.width, h = target.height, dpr = viewport.device_pixel_ratio, "surface resized");
        true
    }

    /// Current dimensions; zero before the first resize.
    pub fn size(&self) -> SurfaceSize {
        self.size.unwrap_or_default()
    }

    /// Number of effective resizes.
    pub fn resize_count(&self) -> u64 {
        self.resizes
    }

    pub fn patterns(&mut self) -> &mut PatternCache {
        &mut self.patterns
    }

    pub fn opts(&self) -> SurfaceOpts {
        self.opts
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/manager.rs"]
mod tests;
