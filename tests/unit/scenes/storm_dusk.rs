use super::*;
use crate::clock::FrameTime;
use crate::compositor::{FrameCtx, SceneInstance, SceneRenderer, SkipReason};
use crate::intensity::Intensity;
use crate::layout::LayoutCache;
use crate::surface::manager::PatternCache;
use crate::surface::recording::{Capabilities, DrawOp, RecordingSurface};

fn frame(n: u64) -> FrameCtx {
    FrameCtx {
        time: FrameTime {
            elapsed_secs: n as f64 / 60.0,
            delta_secs: if n == 0 { 0.0 } else { 1.0 / 60.0 },
            frame: n,
        },
        size: SurfaceSize::new(480, 270),
        intensity: Intensity::NEUTRAL,
    }
}

#[test]
fn skyline_is_reproducible_and_never_overlaps() {
    let params = LayoutParams::default();
    let layout = StormDusk::generate(19, &params);
    assert_eq!(layout, StormDusk::generate(19, &params));
    assert_ne!(layout.buildings, StormDusk::generate(20, &params).buildings);

    assert!(layout.buildings.len() > 10);
    for pair in layout.buildings.windows(2) {
        assert!(pair[0].x + pair[0].width <= pair[1].x, "{pair:?}");
    }
    let first = layout.buildings[0];
    assert_eq!(first.x, -0.05);
    assert!(layout.buildings.last().is_some_and(|b| b.x < 1.06));
    assert_eq!(layout.spires.len(), SPIRE_COUNT);
    assert_eq!(layout.traffic.len(), CAR_COUNT);
    assert_eq!(layout.drizzle.len(), DROP_COUNT);
    assert!(layout.lights.len() >= layout.buildings.len() + LOW_LIGHT_COUNT);
}

#[test]
fn street_lights_dip_but_never_go_dark() {
    let layout = StormDusk::generate(19, &LayoutParams::default());
    for lamp in &layout.street_lights {
        for i in 0..2_000 {
            let b = lamp.brightness(i as f64 * 0.05);
            assert!(b >= lamp.alpha * 0.06 - 1e-12, "{b}");
            assert!(b <= lamp.alpha + 1e-12, "{b}");
        }
    }
}

#[test]
fn cloud_layers_keep_their_thickness() {
    for layer in &CLOUD_LAYERS {
        for i in 0..=20 {
            let nx = i as f64 / 20.0;
            let gap = layer.bottom(nx, 3.7) - layer.top(nx, 3.7);
            assert!(gap > layer.thickness * 0.5, "{gap}");
        }
    }
}

#[test]
fn traffic_moves_only_with_the_frame_delta() {
    let cache = LayoutCache::new();
    let mut scene = SceneInstance::<StormDusk>::new(&cache, 19, &LayoutParams::default(), None).unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(480, 270));
    let mut patterns = PatternCache::default();
    let start = scene.state().traffic.clone();

    scene.render_frame(&mut surface, &frame(0), &mut patterns, None);
    assert_eq!(scene.state().traffic, start, "zero delta on the first frame");

    scene.render_frame(&mut surface, &frame(1), &mut patterns, None);
    for ((after, before), car) in scene
        .state()
        .traffic
        .iter()
        .zip(&start)
        .zip(&scene.layout().traffic)
    {
        let expected = fract(before + car.speed / 60.0);
        assert!((after - expected).abs() < 1e-12);
        assert!((0.0..1.0).contains(after));
    }
}

#[test]
fn overlays_are_built_once_and_skipped_without_patterns() {
    let cache = LayoutCache::new();
    let mut scene = SceneInstance::<StormDusk>::new(&cache, 19, &LayoutParams::default(), None).unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(480, 270));
    let log = surface.log();
    let mut patterns = PatternCache::default();
    for n in 0..3 {
        let report = scene.render_frame(&mut surface, &frame(n), &mut patterns, None);
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    }
    let built = log
        .ops()
        .iter()
        .filter(|op| matches!(op, DrawOp::CreatePattern { .. }))
        .count();
    assert_eq!(built, 2, "grain and scanlines tiles are cached");

    let mut basic = RecordingSurface::with_capabilities(SurfaceSize::new(480, 270), Capabilities::BASIC);
    let report = scene.render_frame(&mut basic, &frame(3), &mut PatternCache::default(), None);
    assert!(matches!(report.skip_reason("grain"), Some(SkipReason::MissingCapability(_))));
    assert!(matches!(report.skip_reason("scanlines"), Some(SkipReason::MissingCapability(_))));
    assert!(report.was_drawn("branches"));
    assert!(report.was_drawn("vignette"));
}

#[test]
fn branches_sit_in_front_of_the_drizzle() {
    let cache = LayoutCache::new();
    let scene = SceneInstance::<StormDusk>::new(&cache, 19, &LayoutParams::default(), None).unwrap();
    let names = scene.stage_names();
    let pos = |name| names.iter().position(|n| *n == name).unwrap();
    assert!(pos("drizzle") < pos("branches"));
    assert!(pos("branches") < pos("vignette"));
    assert!(pos("window_lights") < pos("traffic"));
}
