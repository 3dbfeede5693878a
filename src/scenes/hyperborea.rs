//! Winter village under a spinning sun.
//!
//! Exercises every stage category: sky gradient, aurora ribbons, a sun glow plus an optional
//! spinning sun image, two generated ridges, a village with clipped window glow, walking mammoths
//! with planted feet, falling snow, and vignette plus scanlines.

use serde::Serialize;

use super::common::{
    NEEDS_CLIP, NEEDS_IMAGES, NEEDS_PATTERNS, SCANLINES, additive, filled_profile, radial_glow,
    rgba, scanline_tile, tiled_overlay, vertical_band, vignette,
};
use crate::actors::gait::LEG_COUNT;
use crate::actors::{GaitParams, ParticleField, ParticleSeed, Walker, leg_joints};
use crate::compositor::{Scene, SkipReason, Stage, StageCtx, StageKind, StageOutcome};
use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba, SurfaceSize};
use crate::foundation::math::{turns, wrap_unit};
use crate::generate::{Lcg, RidgeSample, RidgeSpec, RowSpec, pack_row, ridge_profile};
use crate::layout::LayoutParams;
use crate::oscillators::{WindowLight, pulse};
use crate::scenes::SceneId;
use crate::surface::draw::{
    DrawSurface, Paint, StrokeStyle, circle, ellipse, polyline, rect_path,
};

const SKY_TOP: Rgba = Rgba::hex(0x0b1320);
const SKY_MID: Rgba = Rgba::hex(0x162338);
const SKY_LOW: Rgba = Rgba::hex(0x203450);
const HORIZON: Rgba = Rgba::hex(0x2c4365);
const SNOW_GROUND: Rgba = Rgba::hex(0x8f9fb8);
const SNOW_DARK: Rgba = Rgba::hex(0x5a6c87);
const MOUNTAIN_FAR: Rgba = Rgba::hex(0x1c2e48);
const MOUNTAIN_NEAR: Rgba = Rgba::hex(0x233959);
const VILLAGE: Rgba = Rgba::hex(0x141d2e);
const WINDOW_GLOW: Rgba = Rgba::hex(0xfbbc05);
const MAMMOTH_BODY: Rgba = Rgba::hex(0x0f1725);
const MAMMOTH_TUSK: Rgba = Rgba::hex(0xcbd5e1);
const RIBBON_COLORS: [Rgba; 3] = [Rgba::hex(0x6ee7b7), Rgba::hex(0x93c5fd), Rgba::hex(0xc4b5fd)];

/// Snowflakes at unit detail.
pub const SNOW_COUNT: usize = 200;
pub const MAMMOTH_COUNT: usize = 3;
/// Village ground line, as a fraction of the height.
const VILLAGE_BASE: f64 = 0.58;
/// Mammoths wrap over this horizontal range so they walk fully off-screen before re-entering.
const MAMMOTH_BOUNDS: (f64, f64) = (-0.2, 1.2);
const SNOW_BOUNDS: (f64, f64) = (-0.1, 1.0);

const SALT_SNOW: u64 = 1;
const SALT_RIDGES: u64 = 2;
const SALT_VILLAGE: u64 = 3;
const SALT_MAMMOTHS: u64 = 4;
const SALT_AURORA: u64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ridge {
    pub samples: Vec<RidgeSample>,
    pub color: Rgba,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct House {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub roof_height: f64,
    pub windows: Vec<WindowLight>,
}

impl House {
    fn body(&self, size: SurfaceSize) -> Rect {
        let base = VILLAGE_BASE * size.h();
        Rect::new(
            self.x * size.w(),
            base - self.height * size.h(),
            (self.x + self.width) * size.w(),
            base,
        )
    }

    fn roof(&self, size: SurfaceSize) -> BezPath {
        let body = self.body(size);
        let hw = body.width();
        let mut roof = BezPath::new();
        roof.move_to((body.x0 - hw * 0.1, body.y0));
        roof.line_to((body.x0 + hw * 0.5, body.y0 - self.roof_height * size.h()));
        roof.line_to((body.x1 + hw * 0.1, body.y0));
        roof.close_path();
        roof
    }

    /// Window rectangles, evenly spaced across the body.
    fn window_rects(&self, size: SurfaceSize) -> impl Iterator<Item = Rect> + '_ {
        let body = self.body(size);
        let (hw, hh) = (body.width(), body.height());
        let (win_w, win_h) = (hw * 0.15, hh * 0.3);
        let spacing = hw / (self.windows.len() + 1) as f64;
        (0..self.windows.len()).map(move |i| {
            let x = body.x0 + spacing * (i + 1) as f64 - win_w / 2.0;
            let y = body.y1 - hh * 0.6;
            Rect::new(x, y, x + win_w, y + win_h)
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MammothSeed {
    pub x: f64,
    /// Ground line under the feet.
    pub y: f64,
    /// Body half-length as a fraction of the width.
    pub size: f64,
    /// Signed, normalized units per second.
    pub speed: f64,
    /// Gait phase offset in cycles.
    pub phase: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AuroraRibbon {
    pub y: f64,
    pub amplitude: f64,
    /// Wave cycles across the width.
    pub frequency: f64,
    pub speed: f64,
    pub phase: f64,
    /// Stroke width as a fraction of the height.
    pub width: f64,
    pub color: Rgba,
    pub alpha: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HyperboreaLayout {
    pub snow: Vec<ParticleSeed>,
    pub ridges: Vec<Ridge>,
    pub houses: Vec<House>,
    pub mammoths: Vec<MammothSeed>,
    pub ribbons: Vec<AuroraRibbon>,
}

#[derive(Clone, Debug)]
pub struct HyperboreaState {
    pub snow: ParticleField,
    pub mammoths: Vec<Walker>,
}

pub struct Hyperborea;

impl Scene for Hyperborea {
    type Layout = HyperboreaLayout;
    type State = HyperboreaState;

    const ID: SceneId = SceneId::Hyperborea;

    fn generate(seed: u64, params: &LayoutParams) -> HyperboreaLayout {
        HyperboreaLayout {
            snow: generate_snow(&mut Lcg::derive(seed, SALT_SNOW), params.count(SNOW_COUNT)),
            ridges: generate_ridges(&mut Lcg::derive(seed, SALT_RIDGES)),
            houses: generate_village(&mut Lcg::derive(seed, SALT_VILLAGE)),
            mammoths: generate_mammoths(&mut Lcg::derive(seed, SALT_MAMMOTHS)),
            ribbons: generate_ribbons(&mut Lcg::derive(seed, SALT_AURORA)),
        }
    }

    fn init_state(layout: &HyperboreaLayout, seed: u64) -> HyperboreaState {
        HyperboreaState {
            snow: ParticleField::new(&layout.snow, seed, SNOW_BOUNDS),
            mammoths: layout.mammoths.iter().map(mammoth_walker).collect(),
        }
    }

    fn stages() -> Vec<Stage<HyperboreaLayout, HyperboreaState>> {
        vec![
            Stage::new("sky", StageKind::Sky, draw_sky),
            Stage::new("aurora", StageKind::Atmosphere, draw_aurora),
            Stage::new("sun_glow", StageKind::Celestial, draw_sun_glow),
            Stage::new("sun_disc", StageKind::Celestial, draw_sun_disc).requiring(NEEDS_IMAGES),
            Stage::new("ridges", StageKind::Silhouette, draw_ridges),
            Stage::new("ground", StageKind::Silhouette, draw_ground),
            Stage::new("village", StageKind::Structure, draw_village),
            Stage::new("window_glow", StageKind::Structure, draw_window_glow)
                .requiring(NEEDS_CLIP),
            Stage::new("mammoths", StageKind::Actors, draw_mammoths),
            Stage::new("snow", StageKind::Particles, draw_snow),
            Stage::new("vignette", StageKind::Post, draw_vignette),
            Stage::new("scanlines", StageKind::Post, draw_scanlines).requiring(NEEDS_PATTERNS),
        ]
    }
}

fn generate_snow(rng: &mut Lcg, count: usize) -> Vec<ParticleSeed> {
    (0..count)
        .map(|_| ParticleSeed {
            x: rng.next_f64(),
            y: rng.next_f64(),
            vx: rng.range(-0.025, 0.025),
            vy: rng.range(0.1, 0.25),
            size: rng.range(0.5, 2.0) / 720.0,
            phase: rng.phase(),
            twinkle_rate: rng.range(0.8, 2.0),
        })
        .collect()
}

fn generate_ridges(rng: &mut Lcg) -> Vec<Ridge> {
    let far = ridge_profile(
        rng,
        RidgeSpec {
            stations: 11,
            base: 0.55,
            amplitude: 0.2,
            valley_center: 0.5,
            valley_width: 0.16,
            valley_depth: 0.6,
        },
    );
    let near = ridge_profile(
        rng,
        RidgeSpec {
            stations: 9,
            base: 0.60,
            amplitude: 0.15,
            valley_center: 0.5,
            valley_width: 0.2,
            valley_depth: 0.5,
        },
    );
    vec![
        Ridge {
            samples: far,
            color: MOUNTAIN_FAR,
        },
        Ridge {
            samples: near,
            color: MOUNTAIN_NEAR,
        },
    ]
}

fn generate_village(rng: &mut Lcg) -> Vec<House> {
    let cluster = |rng: &mut Lcg, start: f64, end: f64| {
        let mut row = pack_row(
            rng,
            RowSpec {
                start,
                end,
                width_min: 0.04,
                width_max: 0.07,
                gap_min: 0.008,
                gap_max: 0.02,
                max_items: 3,
            },
            |rng, x, width| House {
                x,
                width,
                height: rng.range(0.03, 0.06),
                roof_height: rng.range(0.02, 0.04),
                windows: (0..1 + rng.index(3))
                    .map(|_| WindowLight {
                        base: rng.range(0.75, 1.0),
                        flicker_rate: rng.range(5.0, 11.0),
                        flicker_phase: rng.phase(),
                        blink_rate: rng.range(0.12, 0.35),
                        blink_phase: rng.phase(),
                    })
                    .collect(),
            },
        );
        row.retain(|h| h.x + h.width <= end);
        row
    };
    let mut houses = cluster(rng, 0.12, 0.32);
    houses.extend(cluster(rng, 0.62, 0.86));
    houses
}

fn generate_mammoths(rng: &mut Lcg) -> Vec<MammothSeed> {
    (0..MAMMOTH_COUNT)
        .map(|_| MammothSeed {
            x: rng.range(-0.1, 1.1),
            y: rng.range(0.7, 0.85),
            size: rng.range(0.02, 0.035),
            speed: rng.range(0.02, 0.04) * rng.sign(),
            phase: rng.next_f64(),
        })
        .collect()
}

fn generate_ribbons(rng: &mut Lcg) -> Vec<AuroraRibbon> {
    (0..3)
        .map(|i| AuroraRibbon {
            y: rng.range(0.08, 0.22),
            amplitude: rng.range(0.01, 0.025),
            frequency: rng.range(2.0, 5.0),
            speed: rng.range(0.05, 0.15),
            phase: rng.phase(),
            width: rng.range(0.004, 0.008),
            color: RIBBON_COLORS[i % RIBBON_COLORS.len()],
            alpha: rng.range(0.08, 0.16),
        })
        .collect()
}

/// Walker for one mammoth. Step rate is chosen so one stride is about a body length.
fn mammoth_walker(m: &MammothSeed) -> Walker {
    let s = m.size;
    Walker::new(
        m.x,
        m.speed,
        m.phase,
        GaitParams {
            step_rate: m.speed.abs() / (s * 1.1),
            ..GaitParams::default()
        },
        MAMMOTH_BOUNDS,
        [0.75 * s, 0.55 * s, -0.55 * s, -0.75 * s],
    )
}

type Ctx<'a> = StageCtx<'a, HyperboreaLayout, HyperboreaState>;

fn draw_sky(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    vertical_band(
        ctx.surface,
        size,
        0.0,
        0.6,
        &[(0.0, SKY_TOP), (0.5, SKY_MID), (0.85, SKY_LOW), (1.0, HORIZON)],
    );
    StageOutcome::Drawn
}

fn draw_aurora(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    additive(ctx.surface);
    for r in &ctx.layout.ribbons {
        let alpha = ctx.glow(r.alpha * (0.7 + 0.3 * (t * 0.2 + r.phase).sin()));
        if alpha <= 0.0 {
            continue;
        }
        let points = (0..=48).map(|i| {
            let nx = i as f64 / 48.0;
            let y = r.y
                + r.amplitude * (turns(r.frequency * nx) + t * r.speed + r.phase).sin()
                + r.amplitude
                    * 0.4
                    * (turns(r.frequency * 1.7 * nx) - t * r.speed * 0.7 + r.phase * 1.3).sin();
            size.at(nx, y)
        });
        ctx.surface.stroke_path(
            &polyline(points),
            &StrokeStyle::round(r.width * size.h()),
            &Paint::solid(r.color.with_alpha(alpha)),
        );
    }
    StageOutcome::Drawn
}

fn sun_geometry(size: SurfaceSize) -> (Point, f64) {
    (size.at(0.5, 0.35), size.min_side() * 0.45)
}

fn draw_sun_glow(ctx: &mut Ctx<'_>) -> StageOutcome {
    let (c, sz) = sun_geometry(ctx.size());
    let breathe = pulse(ctx.t(), 0.3, 0.05);
    let halo = rgba(155, 196, 255, 1.0);
    additive(ctx.surface);
    // Concentric halos, widest and faintest first.
    for (radius, alpha) in [(1.5, 0.04), (1.1, 0.08)] {
        let a = ctx.glow(alpha);
        radial_glow(
            ctx.surface,
            c,
            0.0,
            sz * radius * breathe,
            &[(0.0, halo.with_alpha(a)), (1.0, halo.with_alpha(0.0))],
        );
    }
    let (core, rim) = (ctx.glow(0.3), ctx.glow(0.15));
    radial_glow(
        ctx.surface,
        c,
        sz * 0.1,
        sz * 0.8 * breathe,
        &[
            (0.0, Rgba::WHITE.with_alpha(core)),
            (0.3, halo.with_alpha(rim)),
            (1.0, Rgba::TRANSPARENT),
        ],
    );
    StageOutcome::Drawn
}

fn draw_sun_disc(ctx: &mut Ctx<'_>) -> StageOutcome {
    let Some(image) = ctx.asset else {
        return StageOutcome::Skipped(SkipReason::AssetPending);
    };
    let (c, sz) = sun_geometry(ctx.size());
    let half = sz / 2.0;
    let spin = Affine::translate(c.to_vec2()) * Affine::rotate(ctx.t() * 0.2);
    ctx.surface.set_transform(spin);
    ctx.surface
        .draw_image(image, Rect::new(-half, -half, half, half));
    StageOutcome::Drawn
}

fn draw_ridges(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    for ridge in &ctx.layout.ridges {
        let points: Vec<Point> = ridge.samples.iter().map(|s| size.at(s.x, s.y)).collect();
        ctx.surface
            .fill_path(&filled_profile(&points, size), &Paint::solid(ridge.color));
    }
    StageOutcome::Drawn
}

fn draw_ground(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    vertical_band(
        ctx.surface,
        size,
        0.55,
        1.0,
        &[(0.0, SNOW_DARK), (1.0, SNOW_GROUND)],
    );
    StageOutcome::Drawn
}

/// Silhouettes first, then the window panes on top of their own house.
fn draw_village(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    let wall = Paint::solid(VILLAGE);
    for house in &ctx.layout.houses {
        ctx.surface.fill_rect(house.body(size), &wall);
        ctx.surface.fill_path(&house.roof(size), &wall);
    }
    for house in &ctx.layout.houses {
        for (light, rect) in house.windows.iter().zip(house.window_rects(size)) {
            let b = light.brightness(t);
            ctx.surface
                .fill_rect(rect, &Paint::solid(WINDOW_GLOW.with_alpha(b as f32)));
        }
    }
    StageOutcome::Drawn
}

/// Window halos, clipped to their house so they never spill onto neighbors or the sky.
fn draw_window_glow(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    additive(ctx.surface);
    for house in &ctx.layout.houses {
        ctx.surface.save();
        ctx.surface.clip(&rect_path(house.body(size)));
        for (light, rect) in house.windows.iter().zip(house.window_rects(size)) {
            let a = ctx.glow(0.45 * light.brightness(t));
            radial_glow(
                ctx.surface,
                rect.center(),
                0.0,
                rect.width() * 2.5,
                &[(0.0, WINDOW_GLOW.with_alpha(a)), (1.0, WINDOW_GLOW.with_alpha(0.0))],
            );
        }
        ctx.surface.restore();
    }
    StageOutcome::Drawn
}

fn draw_mammoths(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (t, dt) = (ctx.t(), ctx.dt());
    for (walker, seed) in ctx.state.mammoths.iter_mut().zip(&ctx.layout.mammoths) {
        walker.advance(dt);
        draw_mammoth(ctx.surface, size, walker, seed, t);
    }
    StageOutcome::Drawn
}

fn draw_mammoth(
    surface: &mut dyn DrawSurface,
    size: SurfaceSize,
    walker: &Walker,
    m: &MammothSeed,
    t: f64,
) {
    let s = m.size * size.w();
    let cx = walker.x * size.w();
    if cx < -3.0 * s || cx > size.w() + 3.0 * s {
        return;
    }
    let dir = if walker.speed < 0.0 { -1.0 } else { 1.0 };
    let ground = m.y * size.h();
    let hip_y = ground - 0.85 * s;
    let body = Paint::solid(MAMMOTH_BODY);

    let leg_style = StrokeStyle::round(0.26 * s);
    for leg in 0..LEG_COUNT {
        let pose = walker.pose(leg);
        let hip = Point::new(walker.hip(leg) * size.w(), hip_y);
        let foot = Point::new(pose.foot_x * size.w(), ground - pose.lift * 0.25 * s);
        let bend = if leg < 2 { dir } else { -dir };
        let knee = leg_joints(hip, foot, 0.48 * s, 0.48 * s, bend);
        surface.stroke_path(&polyline([hip, knee, foot]), &leg_style, &body);
    }

    surface.fill_path(
        &ellipse(Point::new(cx, hip_y - 0.2 * s), 1.15 * s, 0.65 * s, 0.0),
        &body,
    );
    surface.fill_path(
        &ellipse(Point::new(cx + dir * 0.35 * s, hip_y - 0.6 * s), 0.6 * s, 0.45 * s, 0.0),
        &body,
    );
    surface.fill_path(
        &circle(Point::new(cx + dir * 1.1 * s, hip_y - 0.35 * s), 0.45 * s),
        &body,
    );

    let wobble = (t * 1.5 + turns(m.phase)).sin() * 0.1;
    let mut trunk = BezPath::new();
    trunk.move_to((cx + dir * 1.4 * s, hip_y - 0.3 * s));
    trunk.quad_to(
        (cx + dir * (1.75 - wobble) * s, hip_y + 0.2 * s),
        (cx + dir * 1.5 * s, hip_y + 0.75 * s),
    );
    surface.stroke_path(&trunk, &StrokeStyle::round(0.2 * s), &body);

    let mut tusk = BezPath::new();
    tusk.move_to((cx + dir * 1.25 * s, hip_y - 0.05 * s));
    tusk.quad_to(
        (cx + dir * 2.1 * s, hip_y + 0.15 * s),
        (cx + dir * 1.95 * s, hip_y - 0.4 * s),
    );
    surface.stroke_path(
        &tusk,
        &StrokeStyle::round(0.1 * s),
        &Paint::solid(MAMMOTH_TUSK),
    );
}

fn draw_snow(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (t, dt) = (ctx.t(), ctx.dt());
    ctx.state.snow.step(dt);
    for p in &ctx.state.snow.particles {
        let sway = (t + p.phase).sin() * 0.004;
        let center = size.at(wrap_unit(p.x + sway), p.y);
        let alpha = 0.7 * p.brightness(t, 0.6);
        ctx.surface.fill_path(
            &circle(center, p.size * size.min_side()),
            &Paint::solid(Rgba::WHITE.with_alpha(alpha as f32)),
        );
    }
    StageOutcome::Drawn
}

fn draw_vignette(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let edge = ctx.overlay(0.5);
    vignette(
        ctx.surface,
        size,
        (0.5, 0.5),
        size.w() * 0.3,
        size.w() * 0.8,
        &[(0.0, Rgba::TRANSPARENT), (1.0, Rgba::BLACK.with_alpha(edge))],
    );
    StageOutcome::Drawn
}

fn draw_scanlines(ctx: &mut Ctx<'_>) -> StageOutcome {
    let alpha = ctx.overlay(1.0);
    tiled_overlay(ctx, SCANLINES, alpha, |_| scanline_tile(0.06, 0.0))
}

#[cfg(test)]
#[path = "../../tests/unit/scenes/hyperborea.rs"]
mod tests;
