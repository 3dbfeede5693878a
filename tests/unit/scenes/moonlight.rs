use super::*;
use crate::clock::FrameTime;
use crate::compositor::{FrameCtx, SceneInstance, SceneRenderer, SkipReason};
use crate::intensity::Intensity;
use crate::layout::LayoutCache;
use crate::surface::manager::PatternCache;
use crate::surface::recording::{Capabilities, RecordingSurface};

fn frame(n: u64, dt: f64) -> FrameCtx {
    FrameCtx {
        time: FrameTime {
            elapsed_secs: n as f64 * dt,
            delta_secs: if n == 0 { 0.0 } else { dt },
            frame: n,
        },
        size: SurfaceSize::new(400, 300),
        intensity: Intensity::NEUTRAL,
    }
}

#[test]
fn sky_content_is_seeded() {
    let params = LayoutParams::default();
    let layout = Moonlight::generate(42, &params);
    assert_eq!(layout, Moonlight::generate(42, &params));
    assert_ne!(layout.stars, Moonlight::generate(7, &params).stars);
    assert_eq!(layout.stars.len(), STAR_COUNT);
    assert_eq!(layout.mist.len(), MIST_COUNT);
    for star in &layout.stars {
        assert!((0.0..0.55).contains(&star.y));
        assert!((0.3..1.0).contains(&star.brightness));
    }
    for puff in &layout.mist {
        assert!((0.38..0.60).contains(&puff.y));
    }
}

#[test]
fn star_alpha_never_goes_negative() {
    let layout = Moonlight::generate(42, &LayoutParams::default());
    for star in &layout.stars {
        for i in 0..500 {
            let a = star.alpha(i as f64 * 0.1);
            assert!((0.0..=1.0).contains(&a), "{a}");
        }
    }
}

#[test]
fn every_contour_line_stays_visible() {
    for layer in &MOUNTAINS {
        for &offset in layer.offsets {
            assert!(layer.contour_alpha(offset) > 0.0);
        }
        let fades = layer
            .offsets
            .windows(2)
            .all(|w| layer.contour_alpha(w[1]) < layer.contour_alpha(w[0]));
        assert!(fades, "deeper contours are fainter");
    }
}

#[test]
fn aurora_wave_is_bounded_by_its_amplitude() {
    for band in &AURORA_BANDS {
        for i in 0..400 {
            let w = band.wave(i as f64 * 4.8, i as f64 * 0.37);
            assert!(w.abs() <= band.amplitude * 1.8 + 1e-9);
        }
    }
}

#[test]
fn mist_drifts_and_wraps() {
    let cache = LayoutCache::new();
    let mut scene =
        SceneInstance::<Moonlight>::new(&cache, 42, &LayoutParams::default(), None).unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(400, 300));
    let mut patterns = PatternCache::default();
    let start = scene.state().mist_x.clone();

    // Large deltas are clamped by the clock upstream; here they are fed directly.
    for n in 0..400 {
        scene.render_frame(&mut surface, &frame(n, 1.0), &mut patterns, None);
    }
    let end = &scene.state().mist_x;
    assert_ne!(&start, end);
    for x in end {
        assert!((MIST_BOUNDS.0..MIST_BOUNDS.1).contains(x), "{x}");
    }
    assert_eq!(patterns.build_count(), 1, "grain tile is built once per size");
}

#[test]
fn pipeline_order_and_degradation() {
    let cache = LayoutCache::new();
    let mut scene =
        SceneInstance::<Moonlight>::new(&cache, 42, &LayoutParams::default(), None).unwrap();
    let names = scene.stage_names();
    assert_eq!(names.first(), Some(&"sky"));
    assert_eq!(names.last(), Some(&"vignette"));

    let mut basic =
        RecordingSurface::with_capabilities(SurfaceSize::new(400, 300), Capabilities::BASIC);
    let report = scene.render_frame(&mut basic, &frame(0, 0.016), &mut PatternCache::default(), None);
    assert!(matches!(
        report.skip_reason("grain"),
        Some(SkipReason::MissingCapability(_))
    ));
    assert_eq!(report.drawn.len(), names.len() - 1);
}
