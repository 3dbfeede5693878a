//! Rain-soaked skyline at dusk.

use serde::Serialize;

use super::common::{
    GRAIN, NEEDS_PATTERNS, SCANLINES, additive, grain_tile, radial_glow, rgba, scanline_tile,
    tiled_overlay, vertical_band, vignette,
};
use crate::actors::{ParticleField, ParticleSeed};
use crate::compositor::{Scene, Stage, StageCtx, StageKind, StageOutcome};
use crate::foundation::core::{BezPath, Point, Rect, Rgba, SurfaceSize};
use crate::foundation::math::{fract, wrap_unit};
use crate::generate::{Lcg, RowSpec, pack_row};
use crate::layout::LayoutParams;
use crate::oscillators::spike;
use crate::scenes::SceneId;
use crate::surface::draw::{Paint, StrokeStyle, circle, polyline};

const SKY_TOP: Rgba = Rgba::hex(0x070b16);
const SKY_MID: Rgba = Rgba::hex(0x101b30);
const SKY_LOW: Rgba = Rgba::hex(0x1a2a43);
const SKY_EDGE: Rgba = Rgba::hex(0x253a58);
const SILHOUETTE_NEAR: Rgba = Rgba::hex(0x05090f);
const SILHOUETTE_MID: Rgba = Rgba::hex(0x0a121f);
const SILHOUETTE_FAR: Rgba = Rgba::hex(0x111c2f);
const LAMP_WARM: Rgba = Rgba::hex(0xffd69d);
const LAMP_COOL: Rgba = Rgba::hex(0xc4d9ff);

/// Pixel sizes below are authored for a 720 px tall surface and scale with the height.
const REFERENCE_HEIGHT: f64 = 720.0;
/// Skyline ground line, as a fraction of the height.
const SKYLINE_BASE: f64 = 0.69;

pub const SPIRE_COUNT: usize = 90;
pub const STREET_LIGHT_COUNT: usize = 30;
pub const CAR_COUNT: usize = 34;
pub const DROP_COUNT: usize = 120;
const LOW_LIGHT_COUNT: usize = 18;

const SALT_BUILDINGS: u64 = 1;
const SALT_LIGHTS: u64 = 2;
const SALT_STREET: u64 = 3;
const SALT_TRAFFIC: u64 = 4;
const SALT_DRIZZLE: u64 = 5;
const SALT_SPIRES: u64 = 6;
const GRAIN_SEED: u64 = 907;

/// One band of the cloud deck. Nearer layers are thicker, denser and slower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CloudLayer {
    pub y: f64,
    pub thickness: f64,
    pub amp: f64,
    pub freq_a: f64,
    pub freq_b: f64,
    pub speed: f64,
    pub phase: f64,
    pub color: Rgba,
}

impl CloudLayer {
    const fn new(
        y: f64,
        thickness: f64,
        amp: f64,
        freq: (f64, f64),
        speed: f64,
        phase: f64,
        color: Rgba,
    ) -> Self {
        Self {
            y,
            thickness,
            amp,
            freq_a: freq.0,
            freq_b: freq.1,
            speed,
            phase,
            color,
        }
    }

    /// Upper edge at `nx`, in normalized height.
    pub fn top(&self, nx: f64, t: f64) -> f64 {
        use std::f64::consts::PI;
        let a = (nx * PI * self.freq_a + self.phase + t * self.speed).sin() * self.amp;
        let b = (nx * PI * self.freq_b + self.phase * 0.8 - t * self.speed * 0.62).sin()
            * self.amp
            * 0.46;
        self.y + a + b
    }

    /// Lower edge at `nx`, in normalized height.
    pub fn bottom(&self, nx: f64, t: f64) -> f64 {
        use std::f64::consts::PI;
        self.y
            + self.thickness
            + (nx * PI * self.freq_a * 0.72 + self.phase * 1.2 + t * self.speed * 0.38).sin()
                * self.amp
                * 0.35
            + (nx * PI * self.freq_b * 0.46 - self.phase + t * self.speed * 0.19).sin()
                * self.amp
                * 0.2
    }
}

const fn cloud_tone(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    Rgba::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a)
}

pub const CLOUD_LAYERS: [CloudLayer; 4] = [
    CloudLayer::new(0.08, 0.23, 0.020, (7.2, 12.4), 0.035, 0.3, cloud_tone(18, 28, 46, 0.94)),
    CloudLayer::new(0.18, 0.18, 0.018, (5.7, 10.1), 0.045, 1.1, cloud_tone(28, 41, 63, 0.82)),
    CloudLayer::new(0.30, 0.16, 0.015, (4.8, 8.7), 0.055, 2.2, cloud_tone(40, 58, 86, 0.66)),
    CloudLayer::new(0.44, 0.12, 0.012, (4.3, 7.2), 0.06, 2.8, cloud_tone(58, 79, 112, 0.30)),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofStyle {
    Flat,
    Gable,
    Tower,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Building {
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub roof: RoofStyle,
    /// `0.3..1`; shallow buildings take the mid silhouette tone.
    pub depth: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Spire {
    pub x: f64,
    pub height: f64,
    pub width: f64,
    pub phase: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LightDot {
    pub x: f64,
    pub y: f64,
    /// Reference pixels.
    pub radius: f64,
    /// Reference pixels.
    pub glow: f64,
    pub alpha: f64,
    pub flicker: f64,
    pub phase: f64,
    pub warm: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StreetLight {
    pub x: f64,
    /// Foot of the pole.
    pub y: f64,
    pub height: f64,
    pub alpha: f64,
    pub flicker: f64,
    pub phase: f64,
    pub warm: bool,
}

impl StreetLight {
    /// Flickering brightness with rare sharp dropouts, never fully dark.
    pub fn brightness(&self, t: f64) -> f64 {
        let dropout = spike(t, 0.95, self.phase * 1.7, 9);
        let flicker = 0.66 + 0.34 * (t * self.flicker + self.phase).sin();
        self.alpha * (flicker - dropout * 0.58).max(0.06)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Car {
    pub lane: usize,
    /// `1.0` drives right, `-1.0` drives left.
    pub direction: f64,
    pub offset: f64,
    /// Lane lengths per second.
    pub speed: f64,
    /// Reference pixels.
    pub length: f64,
    pub phase: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Raindrop {
    pub seed: ParticleSeed,
    /// Reference pixels.
    pub len: f64,
    pub alpha: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Branch {
    pub x: f64,
    pub y: f64,
    pub length: f64,
    pub bend: f64,
    pub dir: f64,
    pub phase: f64,
}

pub const BRANCHES: [Branch; 6] = [
    Branch { x: 0.09, y: 1.03, length: 0.42, bend: 0.12, dir: 1.0, phase: 0.2 },
    Branch { x: 0.15, y: 1.02, length: 0.34, bend: 0.11, dir: 1.0, phase: 1.1 },
    Branch { x: 0.23, y: 1.04, length: 0.26, bend: 0.08, dir: 1.0, phase: 1.8 },
    Branch { x: 0.91, y: 1.03, length: 0.40, bend: 0.13, dir: -1.0, phase: 0.5 },
    Branch { x: 0.85, y: 1.02, length: 0.31, bend: 0.09, dir: -1.0, phase: 1.4 },
    Branch { x: 0.78, y: 1.05, length: 0.22, bend: 0.07, dir: -1.0, phase: 2.4 },
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StormDuskLayout {
    pub buildings: Vec<Building>,
    pub spires: Vec<Spire>,
    pub lights: Vec<LightDot>,
    pub street_lights: Vec<StreetLight>,
    pub traffic: Vec<Car>,
    pub drizzle: Vec<Raindrop>,
}

#[derive(Clone, Debug)]
pub struct StormDuskState {
    /// Position of each car along its lane, in `[0, 1)`.
    pub traffic: Vec<f64>,
    pub drizzle: ParticleField,
}

pub struct StormDusk;

impl Scene for StormDusk {
    type Layout = StormDuskLayout;
    type State = StormDuskState;

    const ID: SceneId = SceneId::StormDusk;

    fn generate(seed: u64, params: &LayoutParams) -> StormDuskLayout {
        let buildings = generate_buildings(&mut Lcg::derive(seed, SALT_BUILDINGS));
        let lights = generate_lights(
            &mut Lcg::derive(seed, SALT_LIGHTS),
            &buildings,
            params.count(LOW_LIGHT_COUNT),
        );
        StormDuskLayout {
            spires: generate_spires(&mut Lcg::derive(seed, SALT_SPIRES), params.count(SPIRE_COUNT)),
            street_lights: generate_street_lights(
                &mut Lcg::derive(seed, SALT_STREET),
                params.count(STREET_LIGHT_COUNT),
            ),
            traffic: generate_traffic(&mut Lcg::derive(seed, SALT_TRAFFIC), params.count(CAR_COUNT)),
            drizzle: generate_drizzle(&mut Lcg::derive(seed, SALT_DRIZZLE), params.count(DROP_COUNT)),
            buildings,
            lights,
        }
    }

    fn init_state(layout: &StormDuskLayout, seed: u64) -> StormDuskState {
        let drops: Vec<ParticleSeed> = layout.drizzle.iter().map(|d| d.seed).collect();
        StormDuskState {
            traffic: layout.traffic.iter().map(|c| c.offset).collect(),
            drizzle: ParticleField::new(&drops, seed, (0.0, 1.0)),
        }
    }

    fn stages() -> Vec<Stage<StormDuskLayout, StormDuskState>> {
        vec![
            Stage::new("sky", StageKind::Sky, draw_sky),
            Stage::new("clouds", StageKind::Atmosphere, draw_clouds),
            Stage::new("horizon", StageKind::Atmosphere, draw_horizon),
            Stage::new("skyline", StageKind::Silhouette, draw_skyline),
            Stage::new("window_lights", StageKind::Structure, draw_window_lights),
            Stage::new("street_lights", StageKind::Structure, draw_street_lights),
            Stage::new("traffic", StageKind::Actors, draw_traffic),
            Stage::new("drizzle", StageKind::Particles, draw_drizzle),
            Stage::new("branches", StageKind::Foreground, draw_branches),
            Stage::new("grain", StageKind::Post, draw_grain).requiring(NEEDS_PATTERNS),
            Stage::new("scanlines", StageKind::Post, draw_scanlines).requiring(NEEDS_PATTERNS),
            Stage::new("vignette", StageKind::Post, draw_vignette),
        ]
    }
}

fn generate_buildings(rng: &mut Lcg) -> Vec<Building> {
    pack_row(
        rng,
        RowSpec {
            start: -0.05,
            end: 1.06,
            width_min: 0.026,
            width_max: 0.09,
            gap_min: 0.003,
            gap_max: 0.015,
            max_items: 256,
        },
        |rng, x, width| Building {
            x,
            width,
            height: rng.range(0.05, 0.19),
            roof: match rng.index(3) {
                0 => RoofStyle::Flat,
                1 => RoofStyle::Gable,
                _ => RoofStyle::Tower,
            },
            depth: rng.range(0.3, 1.0),
        },
    )
}

fn generate_spires(rng: &mut Lcg, count: usize) -> Vec<Spire> {
    (0..count)
        .map(|_| Spire {
            x: rng.next_f64(),
            height: rng.range(0.02, 0.11),
            width: rng.range(0.003, 0.012),
            phase: rng.phase(),
        })
        .collect()
}

/// One or two lit windows per building, then a scatter of low street-level dots.
fn generate_lights(rng: &mut Lcg, buildings: &[Building], low_count: usize) -> Vec<LightDot> {
    let mut dots = Vec::with_capacity(buildings.len() * 2 + low_count);
    for b in buildings {
        let count = if rng.chance(0.4) { 2 } else { 1 };
        for _ in 0..count {
            dots.push(LightDot {
                x: b.x + b.width * rng.range(0.2, 0.8),
                y: 0.66 - b.height * rng.range(0.15, 0.35),
                radius: rng.range(1.0, 3.2),
                glow: rng.range(16.0, 46.0),
                alpha: rng.range(0.24, 0.74),
                flicker: rng.range(0.6, 2.8),
                phase: rng.phase(),
                warm: rng.chance(0.75),
            });
        }
    }
    for _ in 0..low_count {
        dots.push(LightDot {
            x: rng.next_f64(),
            y: rng.range(0.72, 0.91),
            radius: rng.range(1.1, 3.9),
            glow: rng.range(20.0, 56.0),
            alpha: rng.range(0.22, 0.68),
            flicker: rng.range(0.4, 2.1),
            phase: rng.phase(),
            warm: rng.chance(0.6),
        });
    }
    dots
}

fn generate_street_lights(rng: &mut Lcg, count: usize) -> Vec<StreetLight> {
    (0..count)
        .map(|i| StreetLight {
            x: rng.range(-0.06, 1.06),
            y: 0.70 + (i % 3) as f64 * 0.045 + rng.range(0.0, 0.045),
            height: rng.range(0.03, 0.11),
            alpha: rng.range(0.26, 0.70),
            flicker: rng.range(0.9, 3.6),
            phase: rng.phase(),
            warm: rng.chance(0.72),
        })
        .collect()
}

fn generate_traffic(rng: &mut Lcg, count: usize) -> Vec<Car> {
    (0..count)
        .map(|i| Car {
            lane: i % 2,
            direction: rng.sign(),
            offset: rng.next_f64(),
            speed: rng.range(0.018, 0.074),
            length: rng.range(8.0, 28.0),
            phase: rng.phase(),
        })
        .collect()
}

fn generate_drizzle(rng: &mut Lcg, count: usize) -> Vec<Raindrop> {
    (0..count)
        .map(|_| {
            let (x, y) = (rng.next_f64(), rng.next_f64());
            let len = rng.range(8.0, 30.0);
            let speed = rng.range(0.08, 0.3);
            let width = rng.range(0.5, 1.7);
            let phase = rng.phase();
            Raindrop {
                seed: ParticleSeed {
                    x,
                    y,
                    vx: 0.0,
                    vy: speed,
                    size: width,
                    phase,
                    twinkle_rate: 1.8,
                },
                len,
                alpha: rng.range(0.18, 0.58),
            }
        })
        .collect()
}

type Ctx<'a> = StageCtx<'a, StormDuskLayout, StormDuskState>;

/// Reference pixels to device pixels.
fn px(size: SurfaceSize) -> f64 {
    size.h() / REFERENCE_HEIGHT
}

fn draw_sky(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    vertical_band(
        ctx.surface,
        size,
        0.0,
        1.0,
        &[(0.0, SKY_TOP), (0.38, SKY_MID), (0.68, SKY_LOW), (1.0, SKY_EDGE)],
    );

    let warm = Rgba::rgb8(247, 166, 102);
    let cool = Rgba::rgb8(130, 164, 214);
    let (warm_core, warm_mid) = (ctx.glow(0.36), ctx.glow(0.08));
    let (cool_core, cool_mid) = (ctx.glow(0.24), ctx.glow(0.10));
    let warm_center = size.at(0.16, 0.66);
    ctx.surface.fill_rect(
        Rect::new(0.0, h * 0.45, w, h),
        &Paint::radial(
            warm_center,
            0.0,
            h * 0.45,
            &[
                (0.0, warm.with_alpha(warm_core)),
                (0.38, warm.with_alpha(warm_mid)),
                (1.0, warm.with_alpha(0.0)),
            ],
        ),
    );
    let cool_center = size.at(0.82, 0.54);
    ctx.surface.fill_rect(
        Rect::new(0.0, h * 0.2, w, h),
        &Paint::radial(
            cool_center,
            0.0,
            h * 0.52,
            &[
                (0.0, cool.with_alpha(cool_core)),
                (0.34, cool.with_alpha(cool_mid)),
                (1.0, cool.with_alpha(0.0)),
            ],
        ),
    );

    // Lightning tension: a rare, brief brightening of the whole sky.
    let tension = spike(ctx.t(), 0.11, 0.8, 7) * 0.12;
    if tension > 0.01 {
        let flash = ctx.glow(tension);
        ctx.surface.fill_rect(
            Rect::new(0.0, 0.0, w, h * 0.78),
            &Paint::solid(rgba(180, 206, 255, f64::from(flash))),
        );
    }
    StageOutcome::Drawn
}

fn cloud_path(layer: &CloudLayer, size: SurfaceSize, t: f64) -> BezPath {
    let (w, h) = (size.w(), size.h());
    let step = (w / 42.0).floor().max(26.0);
    let columns = ((w + 2.0 * step) / step).ceil() as usize;
    let xs: Vec<f64> = (0..=columns).map(|i| -step + i as f64 * step).collect();
    let top = xs.iter().map(|&x| Point::new(x, layer.top(x / w, t) * h));
    let bottom = xs
        .iter()
        .rev()
        .map(|&x| Point::new(x, layer.bottom(x / w, t) * h));
    let mut path = polyline(top.chain(bottom));
    path.close_path();
    path
}

/// Cloud deck, top band first; lower bands overlap the one above.
fn draw_clouds(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let t = ctx.t();
    for layer in &CLOUD_LAYERS {
        let shade = Paint::vertical(
            0.0,
            (layer.y + layer.thickness) * size.h(),
            &[
                (0.0, layer.color),
                (0.7, layer.color),
                (1.0, rgba(16, 27, 43, 0.08)),
            ],
        );
        ctx.surface.fill_path(&cloud_path(layer, size, t), &shade);
    }
    let band = Rgba::rgb8(148, 175, 222);
    let edge = ctx.glow(0.10);
    vertical_band(
        ctx.surface,
        size,
        0.5,
        0.7,
        &[(0.0, band.with_alpha(edge)), (1.0, band.with_alpha(0.0))],
    );
    StageOutcome::Drawn
}

fn draw_horizon(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let breathe = 0.84 + (ctx.t() * 0.22).sin() * 0.16;
    let warm = Rgba::rgb8(249, 170, 114);
    let cool = Rgba::rgb8(138, 170, 218);
    let (warm_peak, cool_peak) = (ctx.glow(0.24 * breathe), ctx.glow(0.16));
    additive(ctx.surface);
    vertical_band(
        ctx.surface,
        size,
        0.55,
        0.68,
        &[
            (0.0, warm.with_alpha(0.0)),
            (0.46, warm.with_alpha(warm_peak)),
            (1.0, warm.with_alpha(0.0)),
        ],
    );
    vertical_band(
        ctx.surface,
        size,
        0.56,
        0.71,
        &[
            (0.0, cool.with_alpha(0.0)),
            (0.5, cool.with_alpha(cool_peak)),
            (1.0, cool.with_alpha(0.0)),
        ],
    );
    StageOutcome::Drawn
}

fn draw_skyline(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let t = ctx.t();
    let base = SKYLINE_BASE * h;

    ctx.surface.save();
    ctx.surface.set_global_alpha(0.84);
    let far = Paint::solid(SILHOUETTE_FAR);
    for s in &ctx.layout.spires {
        let x = s.x * w;
        let sh = s.height * h * (0.95 + (t * 0.08 + s.phase).sin() * 0.06);
        let sw = s.width * w;
        let mut spire = polyline([
            Point::new(x - sw, base + h * 0.01),
            Point::new(x, base - sh),
            Point::new(x + sw, base + h * 0.01),
        ]);
        spire.close_path();
        ctx.surface.fill_path(&spire, &far);
    }
    for b in &ctx.layout.buildings {
        let (x, bw, bh) = (b.x * w, b.width * w, b.height * h);
        let top = base - bh;
        let shade = Paint::solid(if b.depth < 0.55 {
            SILHOUETTE_MID
        } else {
            SILHOUETTE_NEAR
        });
        ctx.surface
            .fill_rect(Rect::new(x, top, x + bw, base + h * 0.02), &shade);
        match b.roof {
            RoofStyle::Flat => {}
            RoofStyle::Gable => {
                let mut roof = polyline([
                    Point::new(x, top),
                    Point::new(x + bw * 0.5, top - bh * 0.25),
                    Point::new(x + bw, top),
                ]);
                roof.close_path();
                ctx.surface.fill_path(&roof, &shade);
            }
            RoofStyle::Tower => ctx.surface.fill_rect(
                Rect::new(x + bw * 0.35, top - bh * 0.2, x + bw * 0.65, top),
                &shade,
            ),
        }
    }
    ctx.surface.restore();

    let blend = Rgba::rgb8(146, 173, 214);
    vertical_band(
        ctx.surface,
        size,
        SKYLINE_BASE - 0.2,
        SKYLINE_BASE + 0.2,
        &[
            (0.0, blend.with_alpha(0.0)),
            (0.45, blend.with_alpha(0.12)),
            (1.0, blend.with_alpha(0.0)),
        ],
    );
    vertical_band(
        ctx.surface,
        size,
        SKYLINE_BASE - 0.02,
        1.0,
        &[
            (0.0, rgba(10, 16, 26, 0.12)),
            (0.45, rgba(9, 14, 22, 0.46)),
            (1.0, rgba(6, 10, 16, 0.68)),
        ],
    );
    let (mist_top, mist_mid) = (ctx.overlay(0.20), ctx.overlay(0.12));
    vertical_band(
        ctx.surface,
        size,
        SKYLINE_BASE + 0.02,
        1.0,
        &[
            (0.0, Rgba::rgb8(156, 182, 224).with_alpha(mist_top)),
            (0.35, Rgba::rgb8(108, 133, 168).with_alpha(mist_mid)),
            (1.0, rgba(16, 24, 36, 0.0)),
        ],
    );
    StageOutcome::Drawn
}

fn draw_window_lights(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let k = px(size);
    let t = ctx.t();
    for light in &ctx.layout.lights {
        let c = size.at(light.x, light.y);
        let alpha = light.alpha * (0.72 + 0.28 * (t * light.flicker + light.phase).sin());
        let color = if light.warm { LAMP_WARM } else { LAMP_COOL };
        let (core, mid) = (ctx.glow(alpha), ctx.glow(0.27));

        ctx.surface.save();
        additive(ctx.surface);
        radial_glow(
            ctx.surface,
            c,
            0.0,
            light.glow * k,
            &[
                (0.0, color.with_alpha(core)),
                (0.4, color.with_alpha(mid)),
                (1.0, color.with_alpha(0.0)),
            ],
        );
        ctx.surface.restore();

        ctx.surface.fill_path(
            &circle(c, light.radius * k),
            &Paint::solid(color.with_alpha((alpha + 0.3).min(1.0) as f32)),
        );

        let reach = (16.0 + light.glow * 0.45) * k;
        let start = Point::new(c.x, c.y + 2.0 * k);
        let end = Point::new(c.x + (t * 0.5 + light.phase).sin() * 4.0 * k, c.y + reach);
        ctx.surface.stroke_path(
            &polyline([start, end]),
            &StrokeStyle::new((light.radius * 0.72 * k).max(1.0)),
            &Paint::linear(
                start,
                Point::new(start.x, end.y),
                &[
                    (0.0, color.with_alpha((alpha * 0.36) as f32)),
                    (1.0, rgba(120, 138, 168, 0.0)),
                ],
            ),
        );
    }
    StageOutcome::Drawn
}

fn draw_street_lights(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let k = px(size);
    let t = ctx.t();
    let base = SKYLINE_BASE * h;
    for lamp in &ctx.layout.street_lights {
        let (x, y) = (lamp.x * w, lamp.y * h);
        if x < -40.0 * k || x > w + 40.0 * k {
            continue;
        }
        let top = y - lamp.height * h;
        let alpha = lamp.brightness(t);
        let (core_rgb, halo_rgb, reflect_rgb) = if lamp.warm {
            (
                Rgba::rgb8(255, 216, 152),
                Rgba::rgb8(255, 198, 132),
                Rgba::rgb8(255, 208, 138),
            )
        } else {
            (
                Rgba::rgb8(182, 213, 255),
                Rgba::rgb8(168, 198, 236),
                Rgba::rgb8(180, 206, 244),
            )
        };

        ctx.surface.stroke_path(
            &polyline([Point::new(x, y + 2.0 * k), Point::new(x, top)]),
            &StrokeStyle::round((1.35 * k).max(1.0)),
            &Paint::solid(rgba(24, 33, 46, 0.66 - alpha * 0.3)),
        );
        let head = if lamp.warm { LAMP_WARM } else { Rgba::rgb8(198, 223, 255) };
        ctx.surface.fill_path(
            &circle(Point::new(x, top), 1.8 * k),
            &Paint::solid(head.with_alpha((alpha + 0.2).min(0.92) as f32)),
        );

        let reach = 22.0 * k + lamp.height * h * 0.24;
        let (core, halo) = (ctx.glow(alpha * 0.95), ctx.glow(alpha * 0.34));
        ctx.surface.save();
        additive(ctx.surface);
        radial_glow(
            ctx.surface,
            Point::new(x, top),
            0.0,
            reach,
            &[
                (0.0, core_rgb.with_alpha(core)),
                (0.5, halo_rgb.with_alpha(halo)),
                (1.0, Rgba::TRANSPARENT),
            ],
        );
        ctx.surface.restore();

        let reflect_len = (9.0 * k).max((y - base) * 0.55);
        let start = Point::new(x, y);
        let end = Point::new(x + (t * 0.8 + lamp.phase).sin() * 4.0 * k, y + reflect_len);
        ctx.surface.stroke_path(
            &polyline([start, end]),
            &StrokeStyle::round((1.05 * k).max(1.0)),
            &Paint::linear(
                start,
                Point::new(x, end.y),
                &[
                    (0.0, reflect_rgb.with_alpha((alpha * 0.3) as f32)),
                    (1.0, rgba(100, 124, 158, 0.0)),
                ],
            ),
        );
    }
    StageOutcome::Drawn
}

/// Advance every car along its lane by the clamped frame delta.
fn advance_traffic(state: &mut StormDuskState, cars: &[Car], dt: f64) {
    for (progress, car) in state.traffic.iter_mut().zip(cars) {
        *progress = fract(*progress + car.speed * dt);
    }
}

fn draw_traffic(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let k = px(size);
    let (t, dt) = (ctx.t(), ctx.dt());
    let base = SKYLINE_BASE * h;
    let lanes = [base + h * 0.045, base + h * 0.085];

    let lane_glow = Rgba::rgb8(126, 150, 189);
    let (top, bottom) = (lanes[0] - 8.0 * k, lanes[1] + 14.0 * k);
    ctx.surface.fill_rect(
        Rect::new(0.0, top, w, bottom),
        &Paint::vertical(
            top,
            bottom,
            &[
                (0.0, lane_glow.with_alpha(0.0)),
                (0.5, lane_glow.with_alpha(0.08)),
                (1.0, lane_glow.with_alpha(0.0)),
            ],
        ),
    );

    advance_traffic(ctx.state, &ctx.layout.traffic, dt);
    let head_rgb = Rgba::rgb8(255, 236, 206);
    let tail_rgb = Rgba::rgb8(255, 124, 102);
    for (car, &progress) in ctx.layout.traffic.iter().zip(&ctx.state.traffic) {
        let along = if car.direction > 0.0 { progress } else { 1.0 - progress };
        let x = along * w * 1.24 - w * 0.12;
        if x < -50.0 * k || x > w + 50.0 * k {
            continue;
        }
        let y = lanes[car.lane % 2] + (t * 0.75 + car.phase).sin() * h * 0.0026;
        let len = car.length * k;
        let dir = car.direction;
        let head_x = x + dir * len * 0.45;
        let tail_x = x - dir * len * 0.45;
        let head_alpha = 0.28 + (t * 2.1 + car.phase).sin() * 0.14;
        let tail_alpha = 0.22 + (t * 1.6 + car.phase + 1.4).sin() * 0.1;

        let head_from = Point::new(head_x - dir * len * 2.1, y);
        let head_to = Point::new(head_x, y);
        ctx.surface.stroke_path(
            &polyline([head_from, head_to]),
            &StrokeStyle::round((1.8 * k).max(1.1)),
            &Paint::linear(
                head_from,
                head_to,
                &[
                    (0.0, head_rgb.with_alpha(0.0)),
                    (1.0, head_rgb.with_alpha(head_alpha.max(0.05) as f32)),
                ],
            ),
        );
        ctx.surface.fill_path(
            &circle(head_to, 1.25 * k),
            &Paint::solid(head_rgb.with_alpha((head_alpha + 0.2).max(0.12) as f32)),
        );

        let tail_y = y + 0.5 * k;
        let tail_from = Point::new(tail_x + dir * len * 1.8, tail_y);
        let tail_to = Point::new(tail_x, tail_y);
        ctx.surface.stroke_path(
            &polyline([tail_from, tail_to]),
            &StrokeStyle::round((1.5 * k).max(1.0)),
            &Paint::linear(
                tail_from,
                tail_to,
                &[
                    (0.0, tail_rgb.with_alpha(0.0)),
                    (1.0, tail_rgb.with_alpha(tail_alpha.max(0.05) as f32)),
                ],
            ),
        );
        ctx.surface.fill_path(
            &circle(tail_to, k),
            &Paint::solid(rgba(255, 126, 103, (tail_alpha + 0.18).max(0.08))),
        );

        let wet_from = Point::new(x, y + 2.0 * k);
        let wet_to = Point::new(x + dir * len * 0.18, y + 13.0 * k);
        ctx.surface.stroke_path(
            &polyline([wet_from, wet_to]),
            &StrokeStyle::round((1.2 * k).max(0.8)),
            &Paint::linear(
                wet_from,
                Point::new(x, wet_to.y),
                &[
                    (0.0, rgba(170, 190, 224, 0.08 + head_alpha * 0.18)),
                    (1.0, rgba(170, 190, 224, 0.0)),
                ],
            ),
        );
    }
    StageOutcome::Drawn
}

fn draw_drizzle(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let k = px(size);
    let (t, dt) = (ctx.t(), ctx.dt());
    ctx.state.drizzle.step(dt);
    let stretch = 0.7 + h / 1800.0;
    for (p, drop) in ctx.state.drizzle.particles.iter().zip(&ctx.layout.drizzle) {
        let y = p.y * h;
        if y < h * 0.07 || y > h * 0.95 {
            continue;
        }
        let x = wrap_unit(p.x + (t * 0.1 + p.phase).sin() * 0.014) * w;
        let len = drop.len * k * stretch;
        let alpha = drop.alpha * (0.66 + 0.34 * (t * 1.8 + p.phase).sin());
        ctx.surface.stroke_path(
            &polyline([Point::new(x, y), Point::new(x - len * 0.32, y + len)]),
            &StrokeStyle::round(p.size * k),
            &Paint::solid(rgba(168, 190, 224, alpha)),
        );
    }
    StageOutcome::Drawn
}

fn draw_branches(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (w, h) = (size.w(), size.h());
    let k = px(size);
    let t = ctx.t();
    let ink = Paint::solid(rgba(16, 22, 30, 0.62));
    let limb = StrokeStyle::round((2.4 * k).max(1.2));
    let twig = StrokeStyle::round((1.4 * k).max(1.0));
    for b in &BRANCHES {
        let root = size.at(b.x, b.y);
        let sway = (t * 0.24 + b.phase).sin() * w * 0.0025;
        let tip = Point::new(root.x + b.dir * b.length * w * 0.26 + sway, root.y - b.length * h);

        let mut path = BezPath::new();
        path.move_to(root);
        path.quad_to(
            Point::new(root.x + b.dir * b.bend * w * 0.5 + sway * 0.6, root.y - b.length * h * 0.58),
            tip,
        );
        ctx.surface.stroke_path(&path, &limb, &ink);

        for i in 0..4 {
            let along = 0.2 + i as f64 * 0.18;
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            let from = root.lerp(tip, along);
            let to = Point::new(
                from.x + b.dir * side * w * (0.018 + along * 0.03),
                from.y - h * (0.018 + along * 0.012),
            );
            ctx.surface.stroke_path(&polyline([from, to]), &twig, &ink);
        }
    }
    StageOutcome::Drawn
}

fn draw_grain(ctx: &mut Ctx<'_>) -> StageOutcome {
    let alpha = ctx.overlay(0.085);
    tiled_overlay(ctx, GRAIN, alpha, |_| grain_tile(GRAIN_SEED, 1100))
}

fn draw_scanlines(ctx: &mut Ctx<'_>) -> StageOutcome {
    let alpha = ctx.overlay(0.15);
    tiled_overlay(ctx, SCANLINES, alpha, |_| scanline_tile(0.14, 0.03))
}

fn draw_vignette(ctx: &mut Ctx<'_>) -> StageOutcome {
    let size = ctx.size();
    let (mid, edge) = (ctx.overlay(0.22), ctx.overlay(0.58));
    vignette(
        ctx.surface,
        size,
        (0.5, 0.48),
        size.h() * 0.12,
        size.h() * 0.82,
        &[
            (0.0, Rgba::TRANSPARENT),
            (0.66, Rgba::BLACK.with_alpha(mid)),
            (1.0, Rgba::BLACK.with_alpha(edge)),
        ],
    );
    StageOutcome::Drawn
}

#[cfg(test)]
#[path = "../../tests/unit/scenes/storm_dusk.rs"]
mod tests;
