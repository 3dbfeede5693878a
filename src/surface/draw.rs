use crate::assets::DecodedImage;
use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba, SurfaceSize};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Optional drawing features. Surfaces that lack one ignore the corresponding calls, and stages
/// that need one are skipped by the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Clip,
    Patterns,
    CompositeOps,
    Images,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Clip,
        Capability::Patterns,
        Capability::CompositeOps,
        Capability::Images,
    ];
}

/// How subsequent draws combine with what is already on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOp {
    #[default]
    SourceOver,
    /// Additive blending, used for glows.
    Lighter,
    /// Erase the destination where the source is opaque.
    DestinationOut,
}

/// Identifies a pattern tile registered with one particular surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub u32);

/// A repeating tile in straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternTile {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl PatternTile {
    /// Build a tile by evaluating `f(x, y)` for every texel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut rgba8 = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for y in 0..height {
            for x in 0..width {
                rgba8.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            rgba8,
        }
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0; 4];
        }
        let i = (((y % self.height) * self.width + (x % self.width)) as usize) * 4;
        match self.rgba8.get(i..i + 4) {
            Some(px) => [px[0], px[1], px[2], px[3]],
            None => [0; 4],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

pub type ColorStops = SmallVec<[ColorStop; 4]>;

/// Fill/stroke source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Paint {
    Solid(Rgba),
    Linear {
        start: Point,
        end: Point,
        stops: ColorStops,
    },
    /// Single-center radial gradient from `inner_radius` to `outer_radius`.
    Radial {
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        stops: ColorStops,
    },
    Pattern { id: PatternId },
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Self::Solid(color)
    }

    pub fn linear(start: Point, end: Point, stops: &[(f32, Rgba)]) -> Self {
        Self::Linear {
            start,
            end,
            stops: to_stops(stops),
        }
    }

    pub fn vertical(top: f64, bottom: f64, stops: &[(f32, Rgba)]) -> Self {
        Self::linear(Point::new(0.0, top), Point::new(0.0, bottom), stops)
    }

    pub fn radial(center: Point, inner_radius: f64, outer_radius: f64, stops: &[(f32, Rgba)]) -> Self {
        Self::Radial {
            center,
            inner_radius,
            outer_radius,
            stops: to_stops(stops),
        }
    }

    /// Sample a gradient's stops at `t` in `[0, 1]`. Stops are expected in ascending order.
    pub fn sample_stops(stops: &[ColorStop], t: f32) -> Rgba {
        let Some(first) = stops.first() else {
            return Rgba::TRANSPARENT;
        };
        if t <= first.offset {
            return first.color;
        }
        for pair in stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let k = if span <= f32::EPSILON {
                    1.0
                } else {
                    (t - a.offset) / span
                };
                return a.color.lerp(b.color, k);
            }
        }
        stops[stops.len() - 1].color
    }
}

fn to_stops(stops: &[(f32, Rgba)]) -> ColorStops {
    stops
        .iter()
        .map(|&(offset, color)| ColorStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
}

impl StrokeStyle {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            cap: LineCap::Butt,
        }
    }

    pub fn round(width: f64) -> Self {
        Self {
            width,
            cap: LineCap::Round,
        }
    }
}

/// The 2D drawing capability a host hands to the renderer.
///
/// Coordinates are device pixels. Implementations must never panic on degenerate input (empty
/// paths, zero-sized rects, calls for unsupported features); such calls simply draw nothing.
pub trait DrawSurface {
    fn size(&self) -> SurfaceSize;

    /// Resize the backing store. Content and registered patterns are discarded.
    fn set_size(&mut self, size: SurfaceSize);

    fn supports(&self, capability: Capability) -> bool;

    /// Reset every pixel to `color`, or to transparent when `None`.
    fn clear(&mut self, color: Option<Rgba>);

    /// Push transform, alpha, composite op and clip.
    fn save(&mut self);

    /// Pop the state pushed by the matching [`DrawSurface::save`]. Unbalanced calls are ignored.
    fn restore(&mut self);

    fn set_transform(&mut self, transform: Affine);

    fn transform(&self) -> Affine;

    /// Multiplies into every subsequent draw, in `[0, 1]`.
    fn set_global_alpha(&mut self, alpha: f32);

    fn set_composite(&mut self, op: CompositeOp);

    fn fill_path(&mut self, path: &BezPath, paint: &Paint);

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        use kurbo::Shape;
        self.fill_path(&rect.to_path(0.1), paint);
    }

    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle, paint: &Paint);

    /// Intersect the clip with `path` until the matching restore.
    fn clip(&mut self, path: &BezPath);

    /// Register a repeating tile. Returns `None` when patterns are unsupported.
    fn create_pattern(&mut self, tile: &PatternTile) -> Option<PatternId>;

    /// Draw `image` scaled into `dest`.
    fn draw_image(&mut self, image: &DecodedImage, dest: Rect);

    /// Read back the current pixels, for surfaces that hold any.
    fn snapshot(&mut self) -> Option<crate::surface::FrameRGBA> {
        None
    }
}

/// Save/restore bookkeeping shared by surface implementations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DrawState {
    pub(crate) transform: Affine,
    pub(crate) alpha: f32,
    pub(crate) composite: CompositeOp,
    /// Clip layers pushed since the matching save.
    pub(crate) clips: u32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            alpha: 1.0,
            composite: CompositeOp::SourceOver,
            clips: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StateStack {
    pub(crate) current: DrawState,
    saved: Vec<DrawState>,
}

impl StateStack {
    pub(crate) fn save(&mut self) {
        self.saved.push(self.current);
        self.current.clips = 0;
    }

    /// Returns the number of clip layers to pop, or `None` for an unbalanced restore.
    pub(crate) fn restore(&mut self) -> Option<u32> {
        let prev = self.saved.pop()?;
        let clips = self.current.clips;
        self.current = prev;
        Some(clips)
    }

    /// Unwind everything; returns the total number of clip layers still open.
    pub(crate) fn reset(&mut self) -> u32 {
        let mut clips = self.current.clips;
        while let Some(prev) = self.saved.pop() {
            clips += prev.clips;
        }
        self.current = DrawState::default();
        clips
    }

    pub(crate) fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Closed circle path.
pub fn circle(center: Point, radius: f64) -> BezPath {
    use kurbo::Shape;
    kurbo::Circle::new(center, radius.max(0.0)).to_path(0.1)
}

/// Closed axis-aligned ellipse path, rotated by `rotation` radians.
pub fn ellipse(center: Point, rx: f64, ry: f64, rotation: f64) -> BezPath {
    use kurbo::Shape;
    kurbo::Ellipse::new(center, (rx.max(0.0), ry.max(0.0)), rotation).to_path(0.1)
}

pub fn rect_path(rect: Rect) -> BezPath {
    use kurbo::Shape;
    rect.to_path(0.1)
}

/// Open polyline through `points`.
pub fn polyline(points: impl IntoIterator<Item = Point>) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.into_iter().enumerate() {
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path
}

#[cfg(test)]
#[path = "../../tests/unit/surface/draw.rs"]
mod tests;
