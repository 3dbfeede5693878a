//! Backdrop renders deterministic, procedurally generated animated backgrounds.
//!
//! A scene is generated once from a seed into an immutable layout, shared by every renderer of
//! that scene, and animated per instance through a fixed pipeline of draw stages:
//!
//! - Pick a scene and seed in a [`BackdropConfig`]
//! - Mount a [`Backdrop`] onto any [`DrawSurface`] with a [`FrameScheduler`]
//! - Deliver frame callbacks; each one draws exactly one frame
//!
//! Offline hosts (the `backdrop` CLI, tests) drive frames with a [`ManualScheduler`] and render to
//! a [`CpuSurface`] or a [`RecordingSurface`].
#![forbid(unsafe_code)]

pub mod actors;
pub mod assets;
pub mod backdrop;
pub mod clock;
pub mod compositor;
pub mod config;
pub mod driver;
pub mod foundation;
pub mod generate;
pub mod intensity;
pub mod layout;
pub mod oscillators;
pub mod scenes;
pub mod signal;
pub mod surface;

pub use crate::assets::{AssetSlot, AssetStatus, DecodedImage};
pub use crate::backdrop::{Backdrop, HostSignals, LifecycleState};
pub use crate::clock::{ClockOpts, FrameClock, FrameTime};
pub use crate::compositor::{FrameCtx, FrameReport, SceneRenderer, SkipReason, StageKind};
pub use crate::config::BackdropConfig;
pub use crate::driver::{CancelToken, Driver, FrameRequest, FrameScheduler, ManualScheduler, TickOutcome};
pub use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba, SurfaceSize, Vec2, Viewport};
pub use crate::foundation::error::{BackdropError, BackdropResult};
pub use crate::generate::rng::Lcg;
pub use crate::intensity::{FxMode, Intensity, IntensityAdapter};
pub use crate::layout::{LayoutCache, LayoutKey, LayoutParams};
pub use crate::scenes::{SceneId, create_scene};
pub use crate::signal::{Signal, Subscription};
pub use crate::surface::{
    Capability, CpuSurface, DrawOp, DrawSurface, FrameRGBA, RecordingSurface, SurfaceManager,
};
