use super::*;
use crate::assets::DecodedImage;
use crate::clock::FrameTime;
use crate::compositor::{FrameCtx, SceneInstance, SceneRenderer};
use crate::intensity::{FxMode, Intensity};
use crate::layout::LayoutCache;
use crate::surface::draw::Capability;
use crate::surface::manager::PatternCache;
use crate::surface::recording::{Capabilities, DrawOp, RecordingSurface};

fn frame(n: u64, intensity: Intensity) -> FrameCtx {
    FrameCtx {
        time: FrameTime {
            elapsed_secs: n as f64 / 60.0,
            delta_secs: if n == 0 { 0.0 } else { 1.0 / 60.0 },
            frame: n,
        },
        size: SurfaceSize::new(320, 180),
        intensity,
    }
}

fn instance(cache: &LayoutCache, seed: u64) -> SceneInstance<Hyperborea> {
    SceneInstance::new(cache, seed, &LayoutParams::default(), None).unwrap()
}

#[test]
fn layout_is_a_pure_function_of_the_seed() {
    let params = LayoutParams::default();
    let a = Hyperborea::generate(42, &params);
    assert_eq!(a, Hyperborea::generate(42, &params));
    assert_ne!(a, Hyperborea::generate(43, &params));
    assert_eq!(a.snow.len(), SNOW_COUNT);
    assert_eq!(a.mammoths.len(), MAMMOTH_COUNT);
    assert_eq!(a.ridges.len(), 2);
}

#[test]
fn detail_scales_particles_but_not_structures() {
    let full = Hyperborea::generate(7, &LayoutParams::default());
    let half = Hyperborea::generate(7, &LayoutParams { detail: 0.5 });
    assert_eq!(half.snow.len(), SNOW_COUNT / 2);
    assert_eq!(full.houses, half.houses);
    assert_eq!(full.ridges, half.ridges);
}

#[test]
fn village_stays_in_its_clusters() {
    for seed in [1, 42, 101, 9_999] {
        let layout = Hyperborea::generate(seed, &LayoutParams::default());
        assert!(!layout.houses.is_empty());
        for house in &layout.houses {
            let in_left = house.x >= 0.12 && house.x + house.width <= 0.32 + 1e-9;
            let in_right = house.x >= 0.62 && house.x + house.width <= 0.86 + 1e-9;
            assert!(in_left || in_right, "{house:?}");
            assert!((1..=3).contains(&house.windows.len()));
        }
    }
}

#[test]
fn mammoths_stay_inside_their_wrap_range() {
    let cache = LayoutCache::new();
    let mut scene = instance(&cache, 42);
    let mut surface = RecordingSurface::new(SurfaceSize::new(320, 180));
    let mut patterns = PatternCache::default();
    for n in 0..600 {
        scene.render_frame(&mut surface, &frame(n, Intensity::NEUTRAL), &mut patterns, None);
    }
    for w in &scene.state().mammoths {
        assert!(w.x >= MAMMOTH_BOUNDS.0 && w.x < MAMMOTH_BOUNDS.1, "{}", w.x);
    }
}

#[test]
fn basic_surfaces_skip_optional_stages_only() {
    let cache = LayoutCache::new();
    let mut scene = instance(&cache, 42);
    let mut surface =
        RecordingSurface::with_capabilities(SurfaceSize::new(320, 180), Capabilities::BASIC);
    let mut patterns = PatternCache::default();

    let report = scene.render_frame(&mut surface, &frame(0, Intensity::NEUTRAL), &mut patterns, None);
    for stage in ["sun_disc", "window_glow", "scanlines"] {
        assert!(
            matches!(report.skip_reason(stage), Some(SkipReason::MissingCapability(_))),
            "{stage}"
        );
    }
    for stage in ["sky", "ridges", "village", "mammoths", "snow", "vignette"] {
        assert!(report.was_drawn(stage), "{stage}");
    }
    assert_eq!(
        report.skip_reason("window_glow"),
        Some(SkipReason::MissingCapability(Capability::Clip))
    );
}

#[test]
fn sun_disc_waits_for_its_image() {
    let cache = LayoutCache::new();
    let mut scene = instance(&cache, 42);
    let mut surface = RecordingSurface::new(SurfaceSize::new(320, 180));
    let log = surface.log();
    let mut patterns = PatternCache::default();

    let report = scene.render_frame(&mut surface, &frame(0, Intensity::NEUTRAL), &mut patterns, None);
    assert_eq!(report.skip_reason("sun_disc"), Some(SkipReason::AssetPending));
    assert!(report.was_drawn("scanlines"));

    log.take();
    let image = DecodedImage::from_premul(2, 2, vec![255; 16]).unwrap();
    let report = scene.render_frame(
        &mut surface,
        &frame(1, Intensity::NEUTRAL),
        &mut patterns,
        Some(&image),
    );
    assert!(report.was_drawn("sun_disc"));
    assert_eq!(
        log.ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::DrawImage { .. }))
            .count(),
        1
    );
}

#[test]
fn glow_follows_the_fx_mode() {
    fn first_radial_alpha(mode: FxMode) -> f32 {
        let cache = LayoutCache::new();
        let mut scene = instance(&cache, 42);
        let mut surface = RecordingSurface::new(SurfaceSize::new(320, 180));
        let log = surface.log();
        scene.render_frame(
            &mut surface,
            &frame(0, mode.intensity()),
            &mut PatternCache::default(),
            None,
        );
        log.ops()
            .iter()
            .find_map(|op| match op.paint() {
                Some((Paint::Radial { stops, .. }, _)) => Some(stops[0].color.a),
                _ => None,
            })
            .expect("sun glow draws a radial gradient")
    }
    let clear = first_radial_alpha(FxMode::Clear);
    let cinematic = first_radial_alpha(FxMode::Cinematic);
    let max = first_radial_alpha(FxMode::Max);
    assert!(clear < cinematic && cinematic < max, "{clear} {cinematic} {max}");
}

#[test]
fn window_glow_is_clipped_per_house() {
    let cache = LayoutCache::new();
    let mut scene = instance(&cache, 101);
    let houses = scene.layout().houses.len();
    let mut surface = RecordingSurface::new(SurfaceSize::new(320, 180));
    let log = surface.log();
    scene.render_frame(
        &mut surface,
        &frame(0, Intensity::NEUTRAL),
        &mut PatternCache::default(),
        None,
    );
    let clips = log
        .ops()
        .iter()
        .filter(|op| matches!(op, DrawOp::Clip { .. }))
        .count();
    assert_eq!(clips, houses);
    assert_eq!(surface.save_depth(), 0);
}
