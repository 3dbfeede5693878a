use crate::assets::DecodedImage;
use crate::foundation::core::{Affine, BezPath, Rect, Rgba, SurfaceSize};
use crate::surface::draw::{
    Capability, CompositeOp, DrawSurface, Paint, PatternId, PatternTile, StateStack, StrokeStyle,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Capability flags for a [`RecordingSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub clip: bool,
    pub patterns: bool,
    pub composite_ops: bool,
    pub images: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        clip: true,
        patterns: true,
        composite_ops: true,
        images: true,
    };

    /// Plain fills and strokes only.
    pub const BASIC: Self = Self {
        clip: false,
        patterns: false,
        composite_ops: false,
        images: false,
    };

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Clip => self.clip,
            Capability::Patterns => self.patterns,
            Capability::CompositeOps => self.composite_ops,
            Capability::Images => self.images,
        }
    }

    pub fn without(mut self, capability: Capability) -> Self {
        match capability {
            Capability::Clip => self.clip = false,
            Capability::Patterns => self.patterns = false,
            Capability::CompositeOps => self.composite_ops = false,
            Capability::Images => self.images = false,
        }
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// One recorded drawing call.
///
/// Fill, stroke and image ops carry the effective global alpha and composite op at the time of the
/// call, so a single op can be inspected without replaying the state changes before it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    SetSize {
        width: u32,
        height: u32,
    },
    Clear {
        color: Option<Rgba>,
    },
    Save,
    Restore,
    SetTransform {
        coeffs: [f64; 6],
    },
    Fill {
        path: String,
        paint: Paint,
        alpha: f32,
        composite: CompositeOp,
    },
    Stroke {
        path: String,
        width: f64,
        paint: Paint,
        alpha: f32,
        composite: CompositeOp,
    },
    Clip {
        path: String,
    },
    CreatePattern {
        id: PatternId,
        width: u32,
        height: u32,
    },
    DrawImage {
        width: u32,
        height: u32,
        dest: Rect,
        alpha: f32,
    },
}

impl DrawOp {
    /// Paint and effective alpha of fill/stroke ops.
    pub fn paint(&self) -> Option<(&Paint, f32)> {
        match self {
            Self::Fill { paint, alpha, .. } | Self::Stroke { paint, alpha, .. } => {
                Some((paint, *alpha))
            }
            _ => None,
        }
    }
}

/// Shared handle to the ops recorded by a [`RecordingSurface`].
///
/// The handle stays valid after the surface itself has been moved into a renderer.
#[derive(Clone, Debug, Default)]
pub struct OpLog {
    ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl OpLog {
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<DrawOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.ops.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.borrow().is_empty()
    }

    fn push(&self, op: DrawOp) {
        self.ops.borrow_mut().push(op);
    }
}

/// Drawing surface that records calls instead of rasterizing them.
#[derive(Debug)]
pub struct RecordingSurface {
    size: SurfaceSize,
    caps: Capabilities,
    state: StateStack,
    log: OpLog,
    patterns: u32,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self::with_capabilities(size, Capabilities::ALL)
    }

    pub fn with_capabilities(size: SurfaceSize, caps: Capabilities) -> Self {
        Self {
            size,
            caps,
            state: StateStack::default(),
            log: OpLog::default(),
            patterns: 0,
        }
    }

    pub fn log(&self) -> OpLog {
        self.log.clone()
    }

    /// Current save depth; zero between frames.
    pub fn save_depth(&self) -> usize {
        self.state.depth()
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        self.state.reset();
        self.patterns = 0;
        self.log.push(DrawOp::SetSize {
            width: size.width,
            height: size.height,
        });
    }

    fn supports(&self, capability: Capability) -> bool {
        self.caps.has(capability)
    }

    fn clear(&mut self, color: Option<Rgba>) {
        self.log.push(DrawOp::Clear { color });
    }

    fn save(&mut self) {
        self.state.save();
        self.log.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        if self.state.restore().is_some() {
            self.log.push(DrawOp::Restore);
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.current.transform = transform;
        self.log.push(DrawOp::SetTransform {
            coeffs: transform.as_coeffs(),
        });
    }

    fn transform(&self) -> Affine {
        self.state.current.transform
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.current.alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    }

    fn set_composite(&mut self, op: CompositeOp) {
        if self.caps.composite_ops {
            self.state.current.composite = op;
        }
    }

    fn fill_path(&mut self, path: &BezPath, paint: &Paint) {
        self.log.push(DrawOp::Fill {
            path: path.to_svg(),
            paint: paint.clone(),
            alpha: self.state.current.alpha,
            composite: self.state.current.composite,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle, paint: &Paint) {
        self.log.push(DrawOp::Stroke {
            path: path.to_svg(),
            width: style.width,
            paint: paint.clone(),
            alpha: self.state.current.alpha,
            composite: self.state.current.composite,
        });
    }

    fn clip(&mut self, path: &BezPath) {
        if !self.caps.clip {
            return;
        }
        self.state.current.clips += 1;
        self.log.push(DrawOp::Clip {
            path: path.to_svg(),
        });
    }

    fn create_pattern(&mut self, tile: &PatternTile) -> Option<PatternId> {
        if !self.caps.patterns {
            return None;
        }
        let id = PatternId(self.patterns);
        self.patterns += 1;
        self.log.push(DrawOp::CreatePattern {
            id,
            width: tile.width,
            height: tile.height,
        });
        Some(id)
    }

    fn draw_image(&mut self, image: &DecodedImage, dest: Rect) {
        if !self.caps.images {
            return;
        }
        self.log.push(DrawOp::DrawImage {
            width: image.width,
            height: image.height,
            dest,
            alpha: self.state.current.alpha,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/recording.rs"]
mod tests;
