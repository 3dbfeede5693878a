//! Drawing helpers shared by the scenes.

use crate::compositor::{SkipReason, StageCtx, StageOutcome};
use crate::foundation::core::{BezPath, Point, Rect, Rgba, SurfaceSize};
use crate::generate::rng::Lcg;
use crate::surface::draw::{Capability, CompositeOp, DrawSurface, Paint, PatternTile};

pub(crate) const SCANLINES: &str = "scanlines";
pub(crate) const GRAIN: &str = "grain";

pub(crate) static NEEDS_CLIP: &[Capability] = &[Capability::Clip];
pub(crate) static NEEDS_PATTERNS: &[Capability] = &[Capability::Patterns];
pub(crate) static NEEDS_IMAGES: &[Capability] = &[Capability::Images];

/// `Rgba` from 8-bit channels and a float alpha.
pub(crate) fn rgba(r: u8, g: u8, b: u8, a: f64) -> Rgba {
    Rgba::rgb8(r, g, b).with_alpha(a as f32)
}

/// Fill the horizontal band `[y0, y1)` (fractions of the height) with a vertical gradient.
pub(crate) fn vertical_band(
    surface: &mut dyn DrawSurface,
    size: SurfaceSize,
    y0: f64,
    y1: f64,
    stops: &[(f32, Rgba)],
) {
    let (top, bottom) = (y0 * size.h(), y1 * size.h());
    if bottom <= top {
        return;
    }
    surface.fill_rect(
        Rect::new(0.0, top, size.w(), bottom),
        &Paint::vertical(top, bottom, stops),
    );
}

/// Fill the bounding square of a radial gradient centered on `center`.
pub(crate) fn radial_glow(
    surface: &mut dyn DrawSurface,
    center: Point,
    inner: f64,
    outer: f64,
    stops: &[(f32, Rgba)],
) {
    if outer <= 0.0 {
        return;
    }
    surface.fill_rect(
        Rect::new(
            center.x - outer,
            center.y - outer,
            center.x + outer,
            center.y + outer,
        ),
        &Paint::radial(center, inner, outer, stops),
    );
}

/// Switch to additive blending for glows. Surfaces without composite selection keep source-over.
pub(crate) fn additive(surface: &mut dyn DrawSurface) {
    if surface.supports(Capability::CompositeOps) {
        surface.set_composite(CompositeOp::Lighter);
    }
}

/// Radial darkening toward the edges over the whole surface.
pub(crate) fn vignette(
    surface: &mut dyn DrawSurface,
    size: SurfaceSize,
    center: (f64, f64),
    inner: f64,
    outer: f64,
    stops: &[(f32, Rgba)],
) {
    let c = size.at(center.0, center.1);
    surface.fill_rect(size.rect(), &Paint::radial(c, inner, outer, stops));
}

/// 4×4 tile: two dark rows over two light rows.
pub(crate) fn scanline_tile(dark_alpha: f64, light_alpha: f64) -> PatternTile {
    let dark = (dark_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    let light = (light_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    PatternTile::from_fn(4, 4, |_, y| {
        if y < 2 {
            [0, 0, 0, dark]
        } else {
            [255, 255, 255, light]
        }
    })
}

/// 96×96 tile of sparse black and white specks, fixed by `seed`.
pub(crate) fn grain_tile(seed: u64, specks: usize) -> PatternTile {
    const SIDE: u32 = 96;
    let mut rng = Lcg::with_multiplier(seed, Lcg::MINSTD2);
    let mut texels = vec![[0u8; 4]; (SIDE * SIDE) as usize];
    for _ in 0..specks {
        let x = rng.index(SIDE as usize);
        let y = rng.index(SIDE as usize);
        let alpha = rng.range(0.06, 0.22);
        let shade = if rng.chance(0.45) { 255 } else { 0 };
        texels[y * SIDE as usize + x] = [shade, shade, shade, (alpha * 255.0).round() as u8];
    }
    PatternTile::from_fn(SIDE, SIDE, |x, y| texels[(y * SIDE + x) as usize])
}

/// Cover the surface with the cached pattern `name`, building it with `build` after a resize.
pub(crate) fn tiled_overlay<L, S>(
    ctx: &mut StageCtx<'_, L, S>,
    name: &'static str,
    alpha: f32,
    build: impl FnOnce(SurfaceSize) -> PatternTile,
) -> StageOutcome {
    let Some(id) = ctx.patterns.get_or_build(name, &mut *ctx.surface, build) else {
        return StageOutcome::Skipped(SkipReason::MissingCapability(Capability::Patterns));
    };
    let size = ctx.size();
    ctx.surface.set_global_alpha(alpha);
    ctx.surface.fill_rect(size.rect(), &Paint::Pattern { id });
    StageOutcome::Drawn
}

/// Smoothed profile through `points` (pixel space): quadratic segments through the midpoints.
///
/// When `close` is set the path continues down to the bottom edge and back.
pub(crate) fn smooth_profile(points: &[Point], size: SurfaceSize, close: bool) -> BezPath {
    let mut path = BezPath::new();
    let Some(first) = points.first() else {
        return path;
    };
    path.move_to(*first);
    for pair in points.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        path.quad_to(prev, prev.midpoint(cur));
    }
    if let Some(last) = points.last() {
        path.line_to(*last);
        if close {
            path.line_to((last.x, size.h()));
            path.line_to((first.x, size.h()));
            path.close_path();
        }
    }
    path
}

/// Straight-edged silhouette through `points`, closed along the bottom edge.
pub(crate) fn filled_profile(points: &[Point], size: SurfaceSize) -> BezPath {
    let mut path = BezPath::new();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return path;
    };
    path.move_to((first.x, size.h()));
    for p in points {
        path.line_to(*p);
    }
    path.line_to((last.x, size.h()));
    path.close_path();
    path
}
