use super::*;
use crate::foundation::core::Rect;
use crate::surface::draw::Paint;
use crate::surface::recording::{Capabilities, DrawOp, RecordingSurface};

#[derive(Debug, Default)]
struct Layout {
    fill: f64,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<&'static str>,
}

fn sky(ctx: &mut StageCtx<'_, Layout, State>) -> StageOutcome {
    ctx.state.calls.push("sky");
    let size = ctx.size();
    ctx.surface
        .fill_rect(size.rect(), &Paint::solid(Rgba::rgb8(10, 20, 30)));
    StageOutcome::Drawn
}

fn leaky(ctx: &mut StageCtx<'_, Layout, State>) -> StageOutcome {
    ctx.state.calls.push("leaky");
    ctx.surface.set_global_alpha(0.25);
    ctx.surface
        .set_transform(kurbo::Affine::translate((5.0, 5.0)));
    StageOutcome::Drawn
}

fn bar(ctx: &mut StageCtx<'_, Layout, State>) -> StageOutcome {
    ctx.state.calls.push("bar");
    let w = ctx.layout.fill;
    ctx.surface
        .fill_rect(Rect::new(0.0, 0.0, w, 2.0), &Paint::solid(Rgba::WHITE));
    StageOutcome::Drawn
}

fn needs_asset(ctx: &mut StageCtx<'_, Layout, State>) -> StageOutcome {
    ctx.state.calls.push("needs_asset");
    match ctx.asset {
        Some(_) => StageOutcome::Drawn,
        None => StageOutcome::Skipped(SkipReason::AssetPending),
    }
}

fn frame(n: u64, w: u32, h: u32) -> FrameCtx {
    FrameCtx {
        time: FrameTime {
            elapsed_secs: n as f64 / 60.0,
            delta_secs: 1.0 / 60.0,
            frame: n,
        },
        size: SurfaceSize::new(w, h),
        intensity: Intensity::NEUTRAL,
    }
}

#[test]
fn stages_run_in_declared_order_once_per_frame() {
    let mut comp = Compositor::new(vec![
        Stage::new("sky", StageKind::Sky, sky),
        Stage::new("leaky", StageKind::Structure, leaky),
        Stage::new("bar", StageKind::Post, bar),
    ])
    .unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(8, 8));
    let mut state = State::default();
    let mut patterns = PatternCache::default();
    let layout = Layout { fill: 4.0 };

    let report = comp.render_frame(
        &mut surface,
        &frame(0, 8, 8),
        &layout,
        &mut state,
        &mut patterns,
        None,
    );
    assert_eq!(state.calls, vec!["sky", "leaky", "bar"]);
    assert_eq!(report.drawn, vec!["sky", "leaky", "bar"]);
    assert!(report.skipped.is_empty());
    assert_eq!(surface.save_depth(), 0);
}

#[test]
fn frame_begins_with_clear_and_state_does_not_leak() {
    let mut comp = Compositor::new(vec![
        Stage::new("leaky", StageKind::Sky, leaky),
        Stage::new("bar", StageKind::Post, bar),
    ])
    .unwrap()
    .with_background(Some(Rgba::BLACK));
    let mut surface = RecordingSurface::new(SurfaceSize::new(8, 8));
    let log = surface.log();
    let mut state = State::default();
    let mut patterns = PatternCache::default();

    comp.render_frame(
        &mut surface,
        &frame(0, 8, 8),
        &Layout { fill: 3.0 },
        &mut state,
        &mut patterns,
        None,
    );
    let ops = log.take();
    assert_eq!(
        ops.first(),
        Some(&DrawOp::Clear {
            color: Some(Rgba::BLACK)
        })
    );
    let fill = ops
        .iter()
        .find_map(|op| op.paint())
        .expect("bar fills");
    assert_eq!(fill.1, 1.0, "alpha set by a previous stage must not leak");
    assert_eq!(surface.transform(), kurbo::Affine::IDENTITY);
}

#[test]
fn missing_capability_skips_stage_and_keeps_the_rest() {
    static NEEDS_CLIP: &[Capability] = &[Capability::Clip];
    let mut comp = Compositor::new(vec![
        Stage::new("sky", StageKind::Sky, sky),
        Stage::new("leaky", StageKind::Structure, leaky).requiring(NEEDS_CLIP),
        Stage::new("bar", StageKind::Post, bar),
    ])
    .unwrap();
    let mut surface =
        RecordingSurface::with_capabilities(SurfaceSize::new(8, 8), Capabilities::BASIC);
    let mut state = State::default();
    let mut patterns = PatternCache::default();

    for n in 0..3 {
        let report = comp.render_frame(
            &mut surface,
            &frame(n, 8, 8),
            &Layout::default(),
            &mut state,
            &mut patterns,
            None,
        );
        assert_eq!(report.drawn, vec!["sky", "bar"]);
        assert_eq!(
            report.skip_reason("leaky"),
            Some(SkipReason::MissingCapability(Capability::Clip))
        );
    }
    assert!(!state.calls.contains(&"leaky"));
}

#[test]
fn stage_may_skip_itself_while_asset_is_pending() {
    let mut comp = Compositor::new(vec![
        Stage::new("sky", StageKind::Sky, sky),
        Stage::new("needs_asset", StageKind::Celestial, needs_asset),
    ])
    .unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(4, 4));
    let mut state = State::default();
    let mut patterns = PatternCache::default();
    let f = frame(0, 4, 4);

    let report = comp.render_frame(&mut surface, &f, &Layout::default(), &mut state, &mut patterns, None);
    assert_eq!(report.skip_reason("needs_asset"), Some(SkipReason::AssetPending));

    let image = DecodedImage::from_premul(1, 1, vec![255, 255, 255, 255]).unwrap();
    let report = comp.render_frame(
        &mut surface,
        &f,
        &Layout::default(),
        &mut state,
        &mut patterns,
        Some(&image),
    );
    assert!(report.was_drawn("needs_asset"));
}

#[test]
fn empty_surface_draws_nothing() {
    let mut comp = Compositor::new(vec![Stage::new("sky", StageKind::Sky, sky)]).unwrap();
    let mut surface = RecordingSurface::new(SurfaceSize::new(0, 0));
    let log = surface.log();
    let mut state = State::default();
    let report = comp.render_frame(
        &mut surface,
        &frame(0, 0, 0),
        &Layout::default(),
        &mut state,
        &mut PatternCache::default(),
        None,
    );
    assert!(report.drawn.is_empty());
    assert_eq!(report.skip_reason("sky"), Some(SkipReason::EmptySurface));
    assert!(log.is_empty());
    assert!(state.calls.is_empty());
}

#[test]
fn invalid_pipelines_are_rejected() {
    let empty: Vec<Stage<Layout, State>> = Vec::new();
    assert!(Compositor::new(empty).is_err());

    let out_of_order = vec![
        Stage::new("bar", StageKind::Post, bar),
        Stage::new("sky", StageKind::Sky, sky),
    ];
    let err = Compositor::new(out_of_order).unwrap_err();
    assert!(err.to_string().contains("out of order"));

    let dup = vec![
        Stage::new("sky", StageKind::Sky, sky),
        Stage::new("sky", StageKind::Atmosphere, bar),
    ];
    let err = Compositor::new(dup).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn stage_kinds_are_ordered_back_to_front() {
    assert!(StageKind::Sky < StageKind::Atmosphere);
    assert!(StageKind::Celestial < StageKind::Silhouette);
    assert!(StageKind::Structure < StageKind::Actors);
    assert!(StageKind::Particles < StageKind::Foreground);
    assert!(StageKind::Foreground < StageKind::Post);
}
