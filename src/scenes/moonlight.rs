//! Moonlit alpine ridges under aurora bands.

use serde::Serialize;

use super::common::{
    GRAIN, NEEDS_PATTERNS, additive, radial_glow, rgba, smooth_profile, tiled_overlay,
    vertical_band, vignette,
};
use crate::compositor::{Scene, Stage, StageCtx, StageKind, StageOutcome};
use crate::foundation::core::{Point, Rect, Rgba, SurfaceSize};
use crate::foundation::math::wrap_range;
use crate::generate::Lcg;
use crate::layout::LayoutParams;
use crate::oscillators::pulse;
use crate::scenes::SceneId;
use crate::surface::draw::{Paint, PatternTile, StrokeStyle, circle, polyline};

const SKY_TOP: Rgba = Rgba::hex(0x040810);
const SKY_MID: Rgba = Rgba::hex(0x0a1628);
const SKY_LOW: Rgba = Rgba::hex(0x0e2040);
const HORIZON: Rgba = Rgba::hex(0x1a3454);
const MOUNTAIN_FAR: Rgba = Rgba::hex(0x0a1a2e);
const MOUNTAIN_MID: Rgba = Rgba::hex(0x060e1a);
const MOUNTAIN_NEAR: Rgba = Rgba::hex(0x030810);
const CONTOUR_GOLD: Rgba = Rgba::rgb8(233, 176, 103);
const CONTOUR_BLUE: Rgba = Rgba::rgb8(103, 195, 238);
const STAR_COLORS: [Rgba; 5] = [
    Rgba::hex(0xd4e4ff),
    Rgba::hex(0xf4d2a4),
    Rgba::hex(0xe0e8ff),
    Rgba::hex(0xffd6ff),
    Rgba::hex(0xd4f0ff),
];

const AURORA_GREEN: Rgba = Rgba::hex(0x22cc66);
const AURORA_AMBER: Rgba = Rgba::hex(0xe09030);
const AURORA_RED: Rgba = Rgba::hex(0xcc3030);
const AURORA_CYAN: Rgba = Rgba::hex(0x3388dd);
const AURORA_TEAL: Rgba = Rgba::hex(0x20aa88);

/// Aurora geometry is authored on a 1920×1080 canvas.
const REFERENCE: (f64, f64) = (1920.0, 1080.0);

pub const STAR_COUNT: usize = 140;
pub const MIST_COUNT: usize = 25;
const MIST_BOUNDS: (f64, f64) = (-0.2, 1.2);

const SALT_STARS: u64 = 1;
const SALT_MIST: u64 = 2;
const SALT_GRAIN: u64 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AuroraBand {
    pub y: f64,
    /// Reference pixels.
    pub amplitude: f64,
    /// Radians per reference pixel.
    pub freq: f64,
    pub speed: f64,
    pub color: Rgba,
    /// Reference pixels.
    pub width: f64,
    pub opacity: f64,
}

impl AuroraBand {
    const fn new(
        y: f64,
        amplitude: f64,
        freq: f64,
        speed: f64,
        color: Rgba,
        width: f64,
        opacity: f64,
    ) -> Self {
        Self {
            y,
            amplitude,
            freq,
            speed,
            color,
            width,
            opacity,
        }
    }

    /// Vertical displacement in reference pixels at reference column `x`.
    pub fn wave(&self, x: f64, t: f64) -> f64 {
        let a = (x * self.freq + t * self.speed).sin();
        let b = (x * self.freq * 1.7 + t * self.speed * 0.8 + 2.0).sin() * 0.5;
        let c = (x * self.freq * 0.4 + t * self.speed * 1.3 + 4.5).sin() * 0.3;
        (a + b + c) * self.amplitude
    }
}

pub const AURORA_BANDS: [AuroraBand; 10] = [
    AuroraBand::new(0.04, 8.0, 0.003, 0.15, AURORA_GREEN, 2.0, 0.55),
    AuroraBand::new(0.06, 10.0, 0.004, 0.12, AURORA_AMBER, 2.2, 0.50),
    AuroraBand::new(0.08, 7.0, 0.005, 0.18, AURORA_GREEN, 1.8, 0.45),
    AuroraBand::new(0.10, 12.0, 0.003, 0.10, AURORA_RED, 2.5, 0.42),
    AuroraBand::new(0.12, 9.0, 0.006, 0.14, AURORA_AMBER, 1.6, 0.40),
    AuroraBand::new(0.14, 11.0, 0.004, 0.20, AURORA_TEAL, 2.0, 0.38),
    AuroraBand::new(0.16, 6.0, 0.005, 0.16, AURORA_CYAN, 1.5, 0.35),
    AuroraBand::new(0.18, 8.0, 0.007, 0.11, AURORA_GREEN, 1.8, 0.30),
    AuroraBand::new(0.20, 10.0, 0.003, 0.22, AURORA_AMBER, 2.0, 0.28),
    AuroraBand::new(0.22, 5.0, 0.006, 0.13, AURORA_CYAN, 1.4, 0.22),
];

/// A mountain layer: fixed ridge stations plus the contour lines echoed below the ridge.
pub struct MountainLayer {
    pub ridge: &'static [(f64, f64)],
    pub fill: Rgba,
    pub contour: Rgba,
    pub contour_width: f64,
    /// Vertical offsets of the contour copies.
    pub offsets: &'static [f64],
    /// Contour alpha at offset `o` is `alpha_base - alpha_slope * o`.
    pub alpha_base: f64,
    pub alpha_slope: f64,
}

pub static MOUNTAINS: [MountainLayer; 3] = [
    MountainLayer {
        ridge: &[
            (0.0, 0.56), (0.06, 0.54), (0.12, 0.57), (0.18, 0.53), (0.25, 0.56),
            (0.32, 0.52), (0.38, 0.55), (0.44, 0.51), (0.50, 0.54), (0.56, 0.50),
            (0.62, 0.53), (0.68, 0.49), (0.74, 0.52), (0.80, 0.48), (0.86, 0.51),
            (0.92, 0.53), (1.0, 0.50),
        ],
        fill: MOUNTAIN_FAR,
        contour: CONTOUR_BLUE,
        contour_width: 1.0,
        offsets: &[0.02, 0.045, 0.07, 0.095],
        alpha_base: 0.14 * 0.12,
        alpha_slope: 0.14 * 0.8,
    },
    MountainLayer {
        ridge: &[
            (0.0, 0.62), (0.05, 0.58), (0.10, 0.61), (0.16, 0.56), (0.22, 0.59),
            (0.28, 0.55), (0.35, 0.60), (0.42, 0.54), (0.48, 0.58), (0.55, 0.53),
            (0.62, 0.57), (0.68, 0.52), (0.75, 0.56), (0.82, 0.54), (0.88, 0.58),
            (0.94, 0.55), (1.0, 0.57),
        ],
        fill: MOUNTAIN_MID,
        contour: CONTOUR_GOLD,
        contour_width: 1.0,
        offsets: &[0.015, 0.035, 0.055, 0.075],
        alpha_base: 0.18 * 0.14,
        alpha_slope: 0.18 * 1.2,
    },
    MountainLayer {
        ridge: &[
            (0.0, 0.72), (0.08, 0.66), (0.15, 0.70), (0.22, 0.63), (0.30, 0.68),
            (0.38, 0.72), (0.45, 0.65), (0.52, 0.70), (0.58, 0.64), (0.65, 0.68),
            (0.72, 0.62), (0.78, 0.67), (0.85, 0.60), (0.92, 0.65), (1.0, 0.62),
        ],
        fill: MOUNTAIN_NEAR,
        contour: CONTOUR_GOLD,
        contour_width: 1.2,
        offsets: &[0.02, 0.045, 0.07, 0.095],
        alpha_base: 0.06,
        alpha_slope: 0.35,
    },
];

impl MountainLayer {
    fn points(&self, size: SurfaceSize, dy: f64) -> Vec<Point> {
        self.ridge
            .iter()
            .map(|&(x, y)| size.at(x, y + dy))
            .collect()
    }

    fn contour_alpha(&self, offset: f64) -> f64 {
        (self.alpha_base - self.alpha_slope * offset).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    /// Reference pixels.
    pub radius: f64,
    pub brightness: f64,
    pub speed: f64,
    pub color: Rgba,
}

impl Star {
    /// Twinkling alpha; stars dip out entirely for part of each cycle.
    pub fn alpha(&self, t: f64) -> f64 {
        let twinkle = 0.4 + 0.6 * (t * self.speed + self.x * 100.0 + self.y * 50.0).sin();
        (self.brightness * twinkle).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MistPuff {
    pub x: f64,
    pub y: f64,
    /// Reference pixels.
    pub size: f64,
    /// Widths per second.
    pub speed: f64,
    pub opacity: f64,
    pub drift: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MoonlightLayout {
    pub stars: Vec<Star>,
    pub mist: Vec<MistPuff>,
    pub grain_seed: u64,
}

#[derive(Clone, Debug)]
pub struct MoonlightState {
    /// Horizontal position of each mist puff, wrapping over `[-0.2, 1.2)`.
    pub mist_x: Vec<f64>,
}

pub struct Moonlight;

impl Scene for Moonlight {
    type Layout = MoonlightLayout;
    type State = MoonlightState;

    const ID: SceneId = SceneId::Moonlight;

    fn generate(seed: u64, params: &LayoutParams) -> MoonlightLayout {
        let mut rng = Lcg::derive(seed, SALT_STARS);
        let stars = (0..params.count(STAR_COUNT))
            .map(|_| Star {
                x: rng.next_f64(),
                y: rng.range(0.0, 0.55),
                radius: rng.range(0.5, 2.3),
                brightness: rng.range(0.3, 1.0),
                speed: rng.range(0.3, 2.3),
                color: STAR_COLORS[rng.index(STAR_COLORS.len())],
            })
            .collect();

        let mut rng = Lcg::derive(seed, SALT_MIST);
        let mist = (0..params.count(MIST_COUNT))
            .map(|_| MistPuff {
                x: rng.next_f64(),
                y: rng.range(0.38, 0.60),
                size: rng.range(80.0, 280.0),
                speed: rng.range(0.002, 0.008),
                opacity: rng.range(0.01, 0.05),
                drift: rng.phase(),
            })
            .collect();

        MoonlightLayout {
            stars,
            mist,
            grain_seed: Lcg::derive(seed, SALT_GRAIN).next_u32().into(),
        }
    }

    fn init_state(layout: &MoonlightLayout, _seed: u64) -> MoonlightState {
        MoonlightState {
            mist_x: layout.mist.iter().map(|m| m.x).collect(),
        }
    }

    fn stages() -> Vec<Stage<MoonlightLayout, MoonlightState>> {
        vec![
            Stage::new("sky", StageKind::Sky, draw_sky),
            Stage::new("stars", StageKind::Sky, draw_stars),
            Stage::new("bands", StageKind::Atmosphere, draw_bands),
            Stage::new("aurora", StageKind::Atmosphere, draw_aurora),
            Stage::new("haze", StageKind::Atmosphere, draw_haze),
            Stage::new("moon", StageKind::Celestial, draw_moon),
            Stage::new("mountains", StageKind::Silhouette, draw_mountains),
            Stage::new("mist", StageKind::Particles, draw_mist),
            Stage::new("grain", StageKind::Post, draw_grain).requiring(NEEDS_PATTERNS),
            Stage::new("vignette", StageKind::Post, draw_vignette),
        ]
    }
}

/// 64×64 gray noise at a fixed low alpha.
fn noise_tile(seed: u64) -> PatternTile {
    let mut rng = Lcg::new(seed);
    PatternTile::from_fn(64, 64, |_, _| {
        let v = (rng.next_f64() * 255.0) as u8;
        [v, v, v, 30]
    })
}

type Ctx<'a> = StageCtx<'a, MoonlightLayout, MoonlightState>;

fn draw_sky(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    ctx.surface.fill_rect(
        size.rect(),
        &Paint::vertical(
            0.0,
            size.h() * 0.65,
            &[(0.0, SKY_TOP), (0.3, SKY_MID), (0.65, SKY_LOW), (1.0, HORIZON)],
        ),
    );
    StageOutcome::Drawn
}

fn draw_stars(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    let scale = size.w() / REFERENCE.0;
    for star in &ctx.layout.stars {
        let alpha = star.alpha(t);
        if alpha <= 0.0 {
            continue;
        }
        ctx.surface.fill_path(
            &circle(size.at(star.x, star.y), star.radius * scale),
            &Paint::solid(star.color.with_alpha(alpha as f32)),
        );
    }
    StageOutcome::Drawn
}

fn draw_bands(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    let line = StrokeStyle::new(1.0);
    for i in 0..20 {
        let y = (0.24 + i as f64 / 20.0 * 0.18) * size.h();
        let alpha = ctx.overlay(0.02 + (t * 0.1 + i as f64 * 0.7).sin() * 0.012);
        ctx.surface.stroke_path(
            &polyline([Point::new(0.0, y), Point::new(size.w(), y)]),
            &line,
            &Paint::solid(Rgba::rgb8(60, 180, 220).with_alpha(alpha)),
        );
    }
    StageOutcome::Drawn
}

fn draw_aurora(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let t = ctx.t();
    let to_ref = REFERENCE.0 / w;
    let step = (w / 640.0).max(3.0);
    let columns = (w / step).ceil() as usize;
    additive(ctx.surface);
    for band in &AURORA_BANDS {
        let alpha = ctx.glow(band.opacity * (0.7 + 0.3 * (t * 0.2 + band.y * 30.0).sin()));
        let points = (0..=columns).map(|i| {
            let x = (i as f64 * step).min(w);
            let y = band.y * h + band.wave(x * to_ref, t) * (h / REFERENCE.1);
            Point::new(x, y)
        });
        ctx.surface.stroke_path(
            &polyline(points),
            &StrokeStyle::new(band.width * w / REFERENCE.0),
            &Paint::solid(band.color.with_alpha(alpha)),
        );
    }
    StageOutcome::Drawn
}

/// Teal-to-amber glow at the horizon with slowly drifting cloud strips.
fn draw_haze(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let t = ctx.t();
    let (y0, band) = (0.42, 0.22);
    let intensity = ctx.frame.intensity;
    let fade = |a: f64| intensity.overlay_alpha(a as f32);
    vertical_band(
        ctx.surface,
        size,
        y0 - band * 0.3,
        y0 + band,
        &[
            (0.0, Rgba::rgb8(58, 136, 153).with_alpha(0.0)),
            (0.3, Rgba::rgb8(58, 136, 153).with_alpha(fade(0.08))),
            (0.5, Rgba::rgb8(123, 172, 184).with_alpha(fade(0.12))),
            (0.7, Rgba::rgb8(192, 128, 64).with_alpha(fade(0.10))),
            (1.0, Rgba::rgb8(192, 128, 64).with_alpha(0.0)),
        ],
    );

    let amber = Rgba::rgb8(192, 128, 64);
    let pale = Rgba::rgb8(244, 210, 164);
    let strip = 8.0 * h / REFERENCE.1;
    for i in 0..5 {
        let cy = (y0 + i as f64 / 5.0 * band * 0.8) * h;
        let drift = (t * 0.08 + i as f64 * 1.5).sin() * w * 0.02;
        let alpha = 0.04 + (t * 0.05 + i as f64).sin() * 0.015;
        ctx.surface.fill_rect(
            Rect::new(0.0, cy - strip, w, cy + strip),
            &Paint::linear(
                Point::new(drift, 0.0),
                Point::new(w + drift, 0.0),
                &[
                    (0.0, amber.with_alpha(0.0)),
                    (0.2, amber.with_alpha(fade(alpha))),
                    (0.5, pale.with_alpha(fade(alpha * 1.5))),
                    (0.8, amber.with_alpha(fade(alpha))),
                    (1.0, amber.with_alpha(0.0)),
                ],
            ),
        );
    }
    StageOutcome::Drawn
}

fn draw_moon(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let c = size.at(0.5, 0.32);
    let r = size.min_side() * 0.028;
    let breathe = pulse(ctx.t(), 0.3, 0.06);

    let rings = [
        (12.0 * breathe, [(0.0, rgba(233, 176, 103, 0.06)), (0.4, rgba(103, 195, 238, 0.03))]),
        (5.0 * breathe, [(0.0, rgba(244, 210, 164, 0.20)), (0.5, rgba(233, 176, 103, 0.08))]),
        (2.5, [(0.0, rgba(244, 220, 180, 0.45)), (0.6, rgba(233, 176, 103, 0.15))]),
    ];
    for (reach, stops) in rings {
        let stops: Vec<(f32, Rgba)> = stops
            .iter()
            .map(|&(o, col)| (o, col.with_alpha(ctx.glow(f64::from(col.a)))))
            .chain([(1.0, Rgba::TRANSPARENT)])
            .collect();
        ctx.surface.save();
        additive(ctx.surface);
        radial_glow(ctx.surface, c, 0.0, r * reach, &stops);
        ctx.surface.restore();
    }

    let highlight = Point::new(c.x - r * 0.15, c.y - r * 0.15);
    ctx.surface.fill_path(
        &circle(c, r),
        &Paint::radial(
            highlight,
            0.0,
            r * 1.15,
            &[
                (0.0, Rgba::hex(0xf8dca8)),
                (0.5, Rgba::hex(0xe9b067)),
                (0.85, Rgba::hex(0xd89540)),
                (1.0, Rgba::hex(0xc07828)),
            ],
        ),
    );
    let crater = Paint::solid(Rgba::hex(0xa07030).with_alpha(0.15));
    for (dx, dy, cr) in [(0.2, -0.15, 0.18), (-0.25, 0.2, 0.14), (0.05, 0.35, 0.10)] {
        ctx.surface
            .fill_path(&circle(Point::new(c.x + r * dx, c.y + r * dy), r * cr), &crater);
    }
    StageOutcome::Drawn
}

fn draw_mountains(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    for layer in &MOUNTAINS {
        ctx.surface.fill_path(
            &smooth_profile(&layer.points(size, 0.0), size, true),
            &Paint::solid(layer.fill),
        );
        let style = StrokeStyle::new(layer.contour_width);
        for &offset in layer.offsets {
            let alpha = layer.contour_alpha(offset);
            ctx.surface.stroke_path(
                &smooth_profile(&layer.points(size, offset), size, false),
                &style,
                &Paint::solid(layer.contour.with_alpha(alpha as f32)),
            );
        }
    }
    StageOutcome::Drawn
}

fn draw_mist(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let (t, dt) = (ctx.t(), ctx.dt());
    let scale = w / REFERENCE.0;
    let tint = Rgba::rgb8(120, 170, 200);
    for (x, puff) in ctx.state.mist_x.iter_mut().zip(&ctx.layout.mist) {
        *x = wrap_range(*x + puff.speed * dt, MIST_BOUNDS.0, MIST_BOUNDS.1).0;
    }
    for (&x, puff) in ctx.state.mist_x.iter().zip(&ctx.layout.mist) {
        let center = Point::new(x * w, puff.y * h + (t * 0.15 + puff.drift).sin() * h * 0.01);
        let alpha = ctx.overlay(puff.opacity * (0.6 + 0.4 * (t * 0.08 + puff.drift).sin()));
        radial_glow(
            ctx.surface,
            center,
            0.0,
            puff.size * scale,
            &[(0.0, tint.with_alpha(alpha)), (1.0, tint.with_alpha(0.0))],
        );
    }
    StageOutcome::Drawn
}

fn draw_grain(ctx: &mut Ctx<'_>) -> StageOutcome {
    let alpha = ctx.overlay(0.04);
    let seed = ctx.layout.grain_seed;
    tiled_overlay(ctx, GRAIN, alpha, |_| noise_tile(seed))
}

fn draw_vignette(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let stops = [(0.5, 0.15), (0.8, 0.45), (1.0, 0.70)]
        .map(|(o, a)| (o, Rgba::BLACK.with_alpha(ctx.overlay(a))));
    vignette(
        ctx.surface,
        size,
        (0.5, 0.45),
        size.w() * 0.2,
        size.w() * 0.85,
        &[(0.0, Rgba::TRANSPARENT), stops[0], stops[1], stops[2]],
    );
    StageOutcome::Drawn
}

#[cfg(test)]
#[path = "../../tests/unit/scenes/moonlight.rs"]
mod tests;
