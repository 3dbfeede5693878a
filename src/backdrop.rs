//! Mounting a scene onto a host surface and keeping it animated.
//!
//! A [`Backdrop`] moves through `Unmounted → Running → Mounted`:
//!
//! - [`Backdrop::mount`] takes the drawing surface, sizes it from the host viewport, instantiates
//!   the scene (sharing its layout through the [`LayoutCache`]), primes the clock and requests the
//!   first frame.
//! - Every frame callback delivered through [`Backdrop::on_frame`] renders exactly one frame and
//!   requests the next.
//! - [`Backdrop::teardown`] cancels the pending request, drops the host subscriptions and releases
//!   the surface. It is idempotent and safe on a backdrop that was never mounted.
//!
//! Host viewport and visibility changes are recorded by their listeners and applied at the start
//! of the next frame, so a resize never lands in the middle of a frame.

use std::cell::Cell;
use std::rc::Rc;

use crate::assets::{AssetSlot, AssetStatus};
use crate::clock::FrameClock;
use crate::compositor::{FrameCtx, FrameReport, SceneRenderer};
use crate::config::BackdropConfig;
use crate::driver::{CancelToken, Driver, FrameRequest, FrameScheduler, TickOutcome};
use crate::foundation::core::{SurfaceSize, Viewport};
use crate::foundation::error::{BackdropError, BackdropResult};
use crate::intensity::{FxMode, IntensityAdapter};
use crate::layout::LayoutCache;
use crate::scenes::create_scene;
use crate::signal::{Signal, Subscription};
use crate::surface::{DrawSurface, FrameRGBA, SurfaceManager};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Never mounted.
    Unmounted,
    /// Mounted at some point but holding no surface (after teardown).
    Mounted,
    /// Surface attached and frames scheduled.
    Running,
}

/// Host-owned signals a mounted backdrop follows.
#[derive(Clone, Debug)]
pub struct HostSignals {
    pub viewport: Signal<Viewport>,
    pub visible: Signal<bool>,
    pub fx: Signal<FxMode>,
}

impl HostSignals {
    pub fn new(viewport: Viewport, fx: FxMode) -> Self {
        Self {
            viewport: Signal::new(viewport),
            visible: Signal::new(true),
            fx: Signal::new(fx),
        }
    }

    /// Signals seeded from the offline viewport and fx mode of `config`.
    pub fn from_config(config: &BackdropConfig) -> Self {
        Self::new(config.viewport(), config.fx)
    }
}

/// Everything that only exists while running.
struct Mount {
    driver: Driver,
    view: View,
    subscriptions: Vec<Subscription>,
}

/// The drawing half of a mount.
struct View {
    scene: Box<dyn SceneRenderer>,
    surface: Box<dyn DrawSurface>,
    manager: SurfaceManager,
    clock: FrameClock,
    intensity: IntensityAdapter,
    viewport: Signal<Viewport>,
    visible: Rc<Cell<bool>>,
    resize_pending: Rc<Cell<bool>>,
}

impl View {
    /// One frame: pending resize, clock, intensity sample, composite.
    fn render(&mut self, timestamp: f64, asset: &AssetSlot) -> Option<FrameReport> {
        if self.resize_pending.replace(false) {
            self.manager
                .resize(self.viewport.get(), self.surface.as_mut());
        }
        let time = self.clock.tick(timestamp);
        if !self.visible.get() {
            tracing::trace!(frame = time.frame, "hidden; frame not drawn");
            return None;
        }
        let frame = FrameCtx {
            time,
            size: self.manager.size(),
            intensity: self.intensity.sample(),
        };
        let report = self.scene.render_frame(
            self.surface.as_mut(),
            &frame,
            self.manager.patterns(),
            asset.get(),
        );
        Some(report)
    }
}

/// One animated background bound to one surface.
pub struct Backdrop {
    config: BackdropConfig,
    cache: Rc<LayoutCache>,
    asset: AssetSlot,
    state: LifecycleState,
    mount: Option<Mount>,
    last_report: Option<FrameReport>,
    frames_drawn: u64,
}

impl Backdrop {
    /// Validate `config` and prepare an unmounted backdrop. Layouts are shared through `cache`.
    pub fn new(config: BackdropConfig, cache: Rc<LayoutCache>) -> BackdropResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache,
            asset: AssetSlot::empty(),
            state: LifecycleState::Unmounted,
            mount: None,
            last_report: None,
            frames_drawn: 0,
        })
    }

    /// Use `asset` for image stages. The slot may still be loading.
    pub fn with_asset(mut self, asset: AssetSlot) -> Self {
        self.asset = asset;
        self
    }

    /// Start loading the configured asset path, if any, in the background.
    pub fn load_configured_asset(mut self) -> Self {
        if let Some(path) = &self.config.asset {
            self.asset = AssetSlot::load_path(path.clone());
        }
        self
    }

    /// Attach to `surface` and start the frame loop.
    ///
    /// A missing surface is the one failure a host sees: there is no degraded mode without
    /// something to draw on. Mounting while already running is rejected.
    #[tracing::instrument(skip_all, fields(scene = %self.config.scene, seed = self.config.seed()))]
    pub fn mount(
        &mut self,
        surface: Option<Box<dyn DrawSurface>>,
        signals: &HostSignals,
        scheduler: Box<dyn FrameScheduler>,
    ) -> BackdropResult<()> {
        if self.state == LifecycleState::Running {
            return Err(BackdropError::validation("backdrop is already running"));
        }
        let mut surface =
            surface.ok_or_else(|| BackdropError::surface("no drawing surface to mount on"))?;

        let scene = create_scene(
            self.config.scene,
            &self.cache,
            self.config.seed(),
            &self.config.layout_params(),
            self.config.background,
        )?;

        let mut manager = SurfaceManager::new(self.config.surface);
        manager.resize(signals.viewport.get(), surface.as_mut());

        let mut clock = FrameClock::new(self.config.clock_opts());
        clock.prime();

        let resize_pending = Rc::new(Cell::new(false));
        let visible = Rc::new(Cell::new(signals.visible.get()));
        let mut subscriptions = Vec::with_capacity(2);
        {
            let pending = Rc::clone(&resize_pending);
            subscriptions.push(signals.viewport.subscribe(move |vp| {
                tracing::debug!(w = vp.css_width, h = vp.css_height, dpr = vp.device_pixel_ratio, "viewport changed");
                pending.set(true);
            }));
        }
        {
            let pending = Rc::clone(&resize_pending);
            let flag = Rc::clone(&visible);
            subscriptions.push(signals.visible.subscribe(move |v| {
                tracing::debug!(visible = *v, "visibility changed");
                flag.set(*v);
                pending.set(true);
            }));
        }

        let mut driver = Driver::new(scheduler);
        driver.start();

        self.mount = Some(Mount {
            driver,
            view: View {
                scene,
                surface,
                manager,
                clock,
                intensity: IntensityAdapter::observe(&signals.fx),
                viewport: signals.viewport.clone(),
                visible,
                resize_pending,
            },
            subscriptions,
        });
        self.state = LifecycleState::Running;
        tracing::debug!(asset = ?self.asset.status(), "mounted");
        Ok(())
    }

    /// Deliver the host's callback for `request` at host time `timestamp`.
    ///
    /// Stale requests are ignored. If the loop was cancelled (through [`Backdrop::cancel_handle`]
    /// or during the frame) the backdrop tears itself down and nothing is rescheduled.
    pub fn on_frame(&mut self, request: FrameRequest, timestamp: f64) -> TickOutcome {
        let Some(mount) = self.mount.as_mut() else {
            return TickOutcome::Ignored;
        };
        let asset = &self.asset;
        let mut report = None;
        let view = &mut mount.view;
        let outcome = mount
            .driver
            .on_frame(request, || report = view.render(timestamp, asset));
        if let Some(report) = report {
            self.frames_drawn += 1;
            self.last_report = Some(report);
        }
        if outcome == TickOutcome::Stopped {
            self.teardown();
        }
        outcome
    }

    /// Token that stops the loop from anywhere, including from inside a frame.
    pub fn cancel_handle(&self) -> Option<CancelToken> {
        self.mount.as_ref().map(|m| m.driver.token())
    }

    /// Apply the current host viewport right away instead of on the next frame.
    ///
    /// Returns whether the surface dimensions changed.
    pub fn resize(&mut self) -> bool {
        let Some(mount) = self.mount.as_mut() else {
            return false;
        };
        let view = &mut mount.view;
        view.resize_pending.set(false);
        view.manager.resize(view.viewport.get(), view.surface.as_mut())
    }

    /// Stop the loop, unsubscribe from the host and release the surface.
    ///
    /// Calling it again, or on a backdrop that never mounted, does nothing.
    pub fn teardown(&mut self) {
        let Some(mut mount) = self.mount.take() else {
            return;
        };
        mount.driver.stop();
        for sub in &mut mount.subscriptions {
            sub.cancel();
        }
        tracing::debug!(ticks = mount.driver.ticks(), resizes = mount.view.manager.resize_count(), "torn down");
        self.state = LifecycleState::Mounted;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn config(&self) -> &BackdropConfig {
        &self.config
    }

    pub fn asset_status(&self) -> AssetStatus {
        self.asset.status()
    }

    /// Report of the most recent drawn frame.
    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Frames actually drawn since construction.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Current backing-store size; `None` unless running.
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.mount.as_ref().map(|m| m.view.manager.size())
    }

    /// Pattern tiles built since mount; `None` unless running.
    pub fn pattern_builds(&mut self) -> Option<u64> {
        self.mount
            .as_mut()
            .map(|m| m.view.manager.patterns().build_count())
    }

    /// Stage names of the mounted scene, in draw order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.mount
            .as_ref()
            .map(|m| m.view.scene.stage_names())
            .unwrap_or_default()
    }

    /// Read back the surface's pixels, for surfaces that can.
    pub fn snapshot(&mut self) -> Option<FrameRGBA> {
        self.mount.as_mut()?.view.surface.snapshot()
    }
}

impl Drop for Backdrop {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Backdrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backdrop")
            .field("scene", &self.config.scene)
            .field("seed", &self.config.seed())
            .field("state", &self.state)
            .field("frames_drawn", &self.frames_drawn)
            .field("driver", &self.mount.as_ref().map(|m| &m.driver))
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/backdrop.rs"]
mod tests;
