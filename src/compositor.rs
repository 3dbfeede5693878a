//! Ordered draw-stage pipeline executed once per frame.

use std::any::Any;
use std::rc::Rc;

use serde::Serialize;

use crate::assets::DecodedImage;
use crate::clock::FrameTime;
use crate::foundation::core::{Rgba, SurfaceSize};
use crate::foundation::error::{BackdropError, BackdropResult};
use crate::intensity::Intensity;
use crate::layout::{LayoutCache, LayoutKey, LayoutParams};
use crate::scenes::SceneId;
use crate::surface::draw::{Capability, DrawSurface};
use crate::surface::manager::PatternCache;

/// Pipeline position of a stage. Stages must be declared in non-decreasing kind order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Sky,
    Atmosphere,
    Celestial,
    Silhouette,
    Structure,
    Actors,
    Particles,
    /// Foreground silhouettes in front of everything but post-processing.
    Foreground,
    Post,
}

/// Everything a stage may read about the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrameCtx {
    pub time: FrameTime,
    pub size: SurfaceSize,
    pub intensity: Intensity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingCapability(Capability),
    AssetPending,
    EmptySurface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Drawn,
    Skipped(SkipReason),
}

/// Arguments handed to a stage's draw function.
pub struct StageCtx<'a, L, S> {
    pub surface: &'a mut dyn DrawSurface,
    pub frame: &'a FrameCtx,
    pub layout: &'a L,
    pub state: &'a mut S,
    pub patterns: &'a mut PatternCache,
    pub asset: Option<&'a DecodedImage>,
}

impl<L, S> StageCtx<'_, L, S> {
    pub fn size(&self) -> SurfaceSize {
        self.frame.size
    }

    /// Elapsed seconds, for periodic motion.
    pub fn t(&self) -> f64 {
        self.frame.time.elapsed_secs
    }

    /// Clamped frame delta, for integrated motion.
    pub fn dt(&self) -> f64 {
        self.frame.time.delta_secs
    }

    pub fn glow(&self, alpha: f64) -> f32 {
        self.frame.intensity.glow_alpha(alpha as f32)
    }

    pub fn overlay(&self, alpha: f64) -> f32 {
        self.frame.intensity.overlay_alpha(alpha as f32)
    }
}

pub type StageFn<L, S> = fn(&mut StageCtx<'_, L, S>) -> StageOutcome;

/// One named draw step.
pub struct Stage<L, S> {
    pub name: &'static str,
    pub kind: StageKind,
    /// Capabilities without which the stage is skipped.
    pub requires: &'static [Capability],
    pub draw: StageFn<L, S>,
}

impl<L, S> Stage<L, S> {
    pub const fn new(name: &'static str, kind: StageKind, draw: StageFn<L, S>) -> Self {
        Self {
            name,
            kind,
            requires: &[],
            draw,
        }
    }

    pub const fn requiring(mut self, requires: &'static [Capability]) -> Self {
        self.requires = requires;
        self
    }
}

impl<L, S> std::fmt::Debug for Stage<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("requires", &self.requires)
            .finish()
    }
}

/// What happened during one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub drawn: Vec<&'static str>,
    pub skipped: Vec<(&'static str, SkipReason)>,
}

impl FrameReport {
    pub fn was_drawn(&self, stage: &str) -> bool {
        self.drawn.contains(&stage)
    }

    pub fn skip_reason(&self, stage: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, r)| *r)
    }
}

/// Runs stages in order against a surface.
pub struct Compositor<L, S> {
    stages: Vec<Stage<L, S>>,
    warned: Vec<bool>,
    background: Option<Rgba>,
}

impl<L, S> Compositor<L, S> {
    /// Validate and build a pipeline: at least one stage, unique names, kinds in order.
    pub fn new(stages: Vec<Stage<L, S>>) -> BackdropResult<Self> {
        if stages.is_empty() {
            return Err(BackdropError::validation("compositor needs at least one stage"));
        }
        for (i, pair) in stages.windows(2).enumerate() {
            if pair[1].kind < pair[0].kind {
                return Err(BackdropError::validation(format!(
                    "stage \"{}\" ({:?}) at position {} is out of order after \"{}\" ({:?})",
                    pair[1].name,
                    pair[1].kind,
                    i + 1,
                    pair[0].name,
                    pair[0].kind
                )));
            }
        }
        for (i, s) in stages.iter().enumerate() {
            if stages[..i].iter().any(|o| o.name == s.name) {
                return Err(BackdropError::validation(format!(
                    "duplicate stage name \"{}\"",
                    s.name
                )));
            }
        }
        let warned = vec![false; stages.len()];
        Ok(Self {
            stages,
            warned,
            background: None,
        })
    }

    /// Clear color applied before the first stage; transparent when `None`.
    pub fn with_background(mut self, background: Option<Rgba>) -> Self {
        self.background = background;
        self
    }

    pub fn stages(&self) -> &[Stage<L, S>] {
        &self.stages
    }

    /// Clear the surface and run every stage once, in order.
    ///
    /// Each stage runs between a save/restore pair starting from the identity transform, so no
    /// stage can leak drawing state into the next. Never fails: stages that cannot run this frame
    /// are listed in the report instead.
    pub fn render_frame(
        &mut self,
        surface: &mut dyn DrawSurface,
        frame: &FrameCtx,
        layout: &L,
        state: &mut S,
        patterns: &mut PatternCache,
        asset: Option<&DecodedImage>,
    ) -> FrameReport {
        let mut report = FrameReport {
            frame: frame.time.frame,
            ..FrameReport::default()
        };
        if frame.size.is_empty() {
            report.skipped = self
                .stages
                .iter()
                .map(|s| (s.name, SkipReason::EmptySurface))
                .collect();
            return report;
        }

        surface.clear(self.background);
        for (i, stage) in self.stages.iter().enumerate() {
            if let Some(missing) = stage.requires.iter().find(|c| !surface.supports(**c)) {
                if !self.warned[i] {
                    tracing::warn!(stage = stage.name, capability = ?missing, "surface lacks capability; stage skipped");
                    self.warned[i] = true;
                }
                report
                    .skipped
                    .push((stage.name, SkipReason::MissingCapability(*missing)));
                continue;
            }

            surface.save();
            surface.set_transform(kurbo::Affine::IDENTITY);
            let mut ctx = StageCtx {
                surface: &mut *surface,
                frame,
                layout,
                state: &mut *state,
                patterns: &mut *patterns,
                asset,
            };
            let outcome = (stage.draw)(&mut ctx);
            surface.restore();

            match outcome {
                StageOutcome::Drawn => report.drawn.push(stage.name),
                StageOutcome::Skipped(reason) => {
                    tracing::trace!(stage = stage.name, ?reason, "stage skipped");
                    report.skipped.push((stage.name, reason));
                }
            }
        }
        tracing::trace!(frame = report.frame, drawn = report.drawn.len(), skipped = report.skipped.len(), "frame composited");
        report
    }
}

impl<L, S> std::fmt::Debug for Compositor<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("stages", &self.stages)
            .field("background", &self.background)
            .finish()
    }
}

/// A themed scene: layout generator, per-instance state and stage list.
pub trait Scene: 'static {
    type Layout: Any + std::fmt::Debug;
    type State;

    const ID: SceneId;

    /// Pure function of `seed` and `params`.
    fn generate(seed: u64, params: &LayoutParams) -> Self::Layout;

    fn init_state(layout: &Self::Layout, seed: u64) -> Self::State;

    fn stages() -> Vec<Stage<Self::Layout, Self::State>>;
}

/// Object-safe view of a mounted scene.
pub trait SceneRenderer {
    fn scene_id(&self) -> SceneId;

    fn seed(&self) -> u64;

    fn render_frame(
        &mut self,
        surface: &mut dyn DrawSurface,
        frame: &FrameCtx,
        patterns: &mut PatternCache,
        asset: Option<&DecodedImage>,
    ) -> FrameReport;

    /// The shared layout, type-erased.
    fn layout_any(&self) -> Rc<dyn Any>;

    fn stage_names(&self) -> Vec<&'static str>;
}

/// A scene bound to its shared layout and its own animation state.
pub struct SceneInstance<Sc: Scene> {
    seed: u64,
    layout: Rc<Sc::Layout>,
    state: Sc::State,
    compositor: Compositor<Sc::Layout, Sc::State>,
}

impl<Sc: Scene> SceneInstance<Sc> {
    /// Fetch (or generate) the layout through `cache` and derive fresh animation state from it.
    pub fn new(
        cache: &LayoutCache,
        seed: u64,
        params: &LayoutParams,
        background: Option<Rgba>,
    ) -> BackdropResult<Self> {
        let compositor = Compositor::new(Sc::stages())?.with_background(background);
        let key = LayoutKey::new(Sc::ID, seed, params);
        let layout = cache.acquire(key, || Sc::generate(seed, params));
        let state = Sc::init_state(&layout, seed);
        Ok(Self {
            seed,
            layout,
            state,
            compositor,
        })
    }

    pub fn layout(&self) -> &Rc<Sc::Layout> {
        &self.layout
    }

    pub fn state(&self) -> &Sc::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut Sc::State {
        &mut self.state
    }
}

impl<Sc: Scene> SceneRenderer for SceneInstance<Sc> {
    fn scene_id(&self) -> SceneId {
        Sc::ID
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn render_frame(
        &mut self,
        surface: &mut dyn DrawSurface,
        frame: &FrameCtx,
        patterns: &mut PatternCache,
        asset: Option<&DecodedImage>,
    ) -> FrameReport {
        self.compositor.render_frame(
            surface,
            frame,
            &self.layout,
            &mut self.state,
            patterns,
            asset,
        )
    }

    fn layout_any(&self) -> Rc<dyn Any> {
        self.layout.clone()
    }

    fn stage_names(&self) -> Vec<&'static str> {
        self.compositor.stages().iter().map(|s| s.name).collect()
    }
}

#[cfg(test)]
#[path = "../tests/unit/compositor.rs"]
mod tests;
