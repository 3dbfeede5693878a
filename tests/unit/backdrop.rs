use super::*;
use crate::driver::ManualScheduler;
use crate::scenes::SceneId;
use crate::surface::{DrawOp, OpLog, RecordingSurface};

fn small_viewport() -> Viewport {
    Viewport::new(320.0, 180.0, 1.0)
}

fn moonlight() -> Backdrop {
    let config = BackdropConfig {
        scene: SceneId::Moonlight,
        ..BackdropConfig::default()
    };
    Backdrop::new(config, Rc::new(LayoutCache::new())).unwrap()
}

fn mount(backdrop: &mut Backdrop, signals: &HostSignals) -> (ManualScheduler, OpLog) {
    let scheduler = ManualScheduler::new();
    let surface = RecordingSurface::new(SurfaceSize::new(1, 1));
    let log = surface.log();
    backdrop
        .mount(Some(Box::new(surface)), signals, Box::new(scheduler.clone()))
        .unwrap();
    (scheduler, log)
}

fn fire(backdrop: &mut Backdrop, scheduler: &ManualScheduler, ms: f64) -> TickOutcome {
    let req = scheduler.take_pending().expect("a frame is pending");
    backdrop.on_frame(req, ms)
}

#[test]
fn mount_without_a_surface_is_an_error() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let scheduler = ManualScheduler::new();
    let err = backdrop
        .mount(None, &signals, Box::new(scheduler.clone()))
        .unwrap_err();
    assert!(err.to_string().starts_with("surface error:"), "{err}");
    assert_eq!(backdrop.state(), LifecycleState::Unmounted);
    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(signals.viewport.listener_count(), 0);
}

#[test]
fn mount_sizes_the_surface_and_schedules_one_frame() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(Viewport::new(320.0, 180.0, 2.0), FxMode::Cinematic);
    let (scheduler, log) = mount(&mut backdrop, &signals);

    assert_eq!(backdrop.state(), LifecycleState::Running);
    assert_eq!(backdrop.surface_size(), Some(SurfaceSize::new(640, 360)));
    assert_eq!(scheduler.pending_count(), 1);
    assert_eq!(
        log.ops().first(),
        Some(&DrawOp::SetSize {
            width: 640,
            height: 360
        })
    );

    assert_eq!(fire(&mut backdrop, &scheduler, 0.0), TickOutcome::Continued);
    assert_eq!(fire(&mut backdrop, &scheduler, 16.0), TickOutcome::Continued);
    assert_eq!(backdrop.frames_drawn(), 2);
    assert_eq!(backdrop.last_report().map(|r| r.frame), Some(1));
    assert_eq!(scheduler.pending_count(), 1, "exactly one frame in flight");
}

#[test]
fn teardown_is_idempotent_and_releases_everything() {
    let mut never = moonlight();
    never.teardown();
    never.teardown();
    assert_eq!(never.state(), LifecycleState::Unmounted);

    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let (scheduler, log) = mount(&mut backdrop, &signals);
    fire(&mut backdrop, &scheduler, 0.0);
    let stale = scheduler.take_pending().unwrap();
    assert_eq!(signals.fx.listener_count(), 1);
    assert_eq!(signals.viewport.listener_count(), 1);
    assert_eq!(signals.visible.listener_count(), 1);

    backdrop.teardown();
    backdrop.teardown();
    assert_eq!(backdrop.state(), LifecycleState::Mounted);
    assert_eq!(backdrop.surface_size(), None);
    assert_eq!(signals.fx.listener_count(), 0);
    assert_eq!(signals.viewport.listener_count(), 0);
    assert_eq!(signals.visible.listener_count(), 0);

    let before = log.len();
    assert_eq!(backdrop.on_frame(stale, 33.0), TickOutcome::Ignored);
    assert_eq!(log.len(), before, "nothing drawn after teardown");
}

#[test]
fn cancelling_the_token_stops_at_the_next_tick() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let (scheduler, _log) = mount(&mut backdrop, &signals);
    fire(&mut backdrop, &scheduler, 0.0);

    backdrop.cancel_handle().unwrap().cancel();
    assert_eq!(fire(&mut backdrop, &scheduler, 16.0), TickOutcome::Stopped);
    assert_eq!(backdrop.frames_drawn(), 1);
    assert_eq!(backdrop.state(), LifecycleState::Mounted);
    assert_eq!(scheduler.pending_count(), 0);
    assert_eq!(signals.fx.listener_count(), 0);
}

#[test]
fn viewport_changes_apply_on_the_next_frame() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let (scheduler, _log) = mount(&mut backdrop, &signals);
    fire(&mut backdrop, &scheduler, 0.0);
    assert_eq!(backdrop.pattern_builds(), Some(1));

    assert!(!signals.viewport.set(small_viewport()));
    fire(&mut backdrop, &scheduler, 16.0);
    assert_eq!(backdrop.pattern_builds(), Some(1), "same size keeps the tiles");

    signals.viewport.set(Viewport::new(400.0, 300.0, 1.0));
    assert_eq!(backdrop.surface_size(), Some(SurfaceSize::new(320, 180)));
    fire(&mut backdrop, &scheduler, 32.0);
    assert_eq!(backdrop.surface_size(), Some(SurfaceSize::new(400, 300)));
    assert_eq!(backdrop.pattern_builds(), Some(2), "tiles rebuilt for the new size");
}

#[test]
fn explicit_resize_only_reports_real_changes() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let (_scheduler, _log) = mount(&mut backdrop, &signals);
    assert!(!backdrop.resize());
    signals.viewport.set(Viewport::new(160.0, 90.0, 1.0));
    assert!(backdrop.resize());
    assert!(!backdrop.resize());
    assert_eq!(backdrop.surface_size(), Some(SurfaceSize::new(160, 90)));
}

#[test]
fn hidden_frames_keep_the_loop_alive_without_drawing() {
    let mut backdrop = moonlight();
    let signals = HostSignals::new(small_viewport(), FxMode::Cinematic);
    let (scheduler, log) = mount(&mut backdrop, &signals);
    fire(&mut backdrop, &scheduler, 0.0);

    signals.visible.set(false);
    let before = log.len();
    assert_eq!(fire(&mut backdrop, &scheduler, 16.0), TickOutcome::Continued);
    assert_eq!(fire(&mut backdrop, &scheduler, 32.0), TickOutcome::Continued);
    assert_eq!(log.len(), before);
    assert_eq!(backdrop.frames_drawn(), 1);

    signals.visible.set(true);
    fire(&mut backdrop, &scheduler, 5_000.0);
    assert_eq!(backdrop.frames_drawn(), 2);
}

#[test]
fn remounting_reuses_the_shared_layout() {
    let cache = Rc::new(LayoutCache::new());
    let config = BackdropConfig {
        scene: SceneId::Moonlight,
        ..BackdropConfig::default()
    };
    let mut backdrop = Backdrop::new(config, Rc::clone(&cache)).unwrap();
    let signals = HostSignals::new(small_viewport(), FxMode::Clear);

    let (_s1, _l1) = mount(&mut backdrop, &signals);
    assert!(backdrop.mount(
        Some(Box::new(RecordingSurface::new(SurfaceSize::new(1, 1)))),
        &signals,
        Box::new(ManualScheduler::new()),
    )
    .is_err());
    backdrop.teardown();
    assert_eq!(cache.live_entries(), 0, "teardown releases the layout");

    let (s2, _l2) = mount(&mut backdrop, &signals);
    assert_eq!(backdrop.state(), LifecycleState::Running);
    assert_eq!(fire(&mut backdrop, &s2, 0.0), TickOutcome::Continued);
    assert_eq!(cache.generation_count(), 2);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = BackdropConfig {
        detail: 9.0,
        ..BackdropConfig::default()
    };
    let err = Backdrop::new(config, Rc::new(LayoutCache::new())).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"), "{err}");
}
