use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::assets::{DecodedImage, premultiply_rgba8_in_place};
use crate::foundation::core::{Affine, BezPath, Rect, Rgba, SurfaceSize};
use crate::foundation::error::{BackdropError, BackdropResult};
use crate::surface::FrameRGBA;
use crate::surface::draw::{
    Capability, ColorStop, CompositeOp, DrawSurface, LineCap, Paint, PatternId, PatternTile,
    StateStack, StrokeStyle,
};

const LINEAR_RAMP_WIDTH: u32 = 256;
const RADIAL_RAMP_SIZE: u32 = 128;

/// Options for [`CpuSurface`].
#[derive(Clone, Copy, Debug)]
pub struct CpuSurfaceOpts {
    /// Rasterized gradient ramps kept around between frames.
    pub gradient_cache_capacity: usize,
    /// Decoded images kept as ready-to-draw paints.
    pub image_cache_capacity: usize,
}

impl Default for CpuSurfaceOpts {
    fn default() -> Self {
        Self {
            gradient_cache_capacity: 64,
            image_cache_capacity: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    radial: bool,
    inner_milli: u16,
    stops: SmallVec<[(u16, [u8; 4]); 4]>,
}

/// Small LRU of rasterized paints.
struct PaintCache<K> {
    capacity: usize,
    entries: HashMap<K, vello_cpu::Image>,
    order: VecDeque<K>,
}

impl<K: Clone + Eq + std::hash::Hash> PaintCache<K> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &K) -> Option<vello_cpu::Image> {
        let hit = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(hit)
    }

    fn insert(&mut self, key: K, image: vello_cpu::Image) {
        if self.entries.insert(key.clone(), image).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

enum Resolved {
    Solid([u8; 4]),
    Image {
        image: vello_cpu::Image,
        paint_transform: Affine,
    },
}

/// CPU raster surface backed by `vello_cpu`.
///
/// Gradients are rasterized once into small ramp images and mapped with a paint transform;
/// pattern tiles are expanded to the surface size on first use and dropped on resize.
pub struct CpuSurface {
    size: SurfaceSize,
    ctx: vello_cpu::RenderContext,
    state: StateStack,
    tiles: Vec<PatternTile>,
    expanded_patterns: HashMap<u32, vello_cpu::Image>,
    gradients: PaintCache<GradientKey>,
    images: PaintCache<usize>,
    gradient_builds: u64,
}

impl CpuSurface {
    pub fn new(size: SurfaceSize) -> BackdropResult<Self> {
        Self::with_opts(size, CpuSurfaceOpts::default())
    }

    pub fn with_opts(size: SurfaceSize, opts: CpuSurfaceOpts) -> BackdropResult<Self> {
        let (w, h) = dims_u16(size)?;
        Ok(Self {
            size,
            ctx: vello_cpu::RenderContext::new(w, h),
            state: StateStack::default(),
            tiles: Vec::new(),
            expanded_patterns: HashMap::new(),
            gradients: PaintCache::new(opts.gradient_cache_capacity),
            images: PaintCache::new(opts.image_cache_capacity),
            gradient_builds: 0,
        })
    }

    /// Number of gradient ramps rasterized so far.
    pub fn gradient_builds(&self) -> u64 {
        self.gradient_builds
    }

    pub fn cached_gradients(&self) -> usize {
        self.gradients.len()
    }

    /// Render everything drawn since the last clear into a premultiplied RGBA8 frame.
    pub fn render(&mut self) -> FrameRGBA {
        let (w, h) = clamp_dims(self.size);
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        FrameRGBA {
            width: u32::from(w),
            height: u32::from(h),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    fn resolve_paint(&mut self, paint: &Paint, alpha: f32) -> BackdropResult<Option<Resolved>> {
        match paint {
            Paint::Solid(c) => Ok(Some(Resolved::Solid(c.scale_alpha(alpha).to_rgba8()))),
            Paint::Linear { start, end, stops } => {
                let v = *end - *start;
                let len = v.hypot();
                if len <= 1e-9 {
                    let c = stops.last().map_or(Rgba::TRANSPARENT, |s| s.color);
                    return Ok(Some(Resolved::Solid(c.scale_alpha(alpha).to_rgba8())));
                }
                let image = self.gradient_ramp(false, 0.0, stops, alpha)?;
                let paint_transform = Affine::translate(start.to_vec2())
                    * Affine::rotate(v.y.atan2(v.x))
                    * Affine::scale_non_uniform(len / f64::from(LINEAR_RAMP_WIDTH), 1.0);
                Ok(Some(Resolved::Image {
                    image,
                    paint_transform,
                }))
            }
            Paint::Radial {
                center,
                inner_radius,
                outer_radius,
                stops,
            } => {
                let r1 = outer_radius.max(0.0);
                if r1 <= 1e-9 {
                    return Ok(None);
                }
                let inner = (inner_radius / r1).clamp(0.0, 0.999);
                let image = self.gradient_ramp(true, inner, stops, alpha)?;
                let paint_transform = Affine::translate((center.x - r1, center.y - r1))
                    * Affine::scale(2.0 * r1 / f64::from(RADIAL_RAMP_SIZE));
                Ok(Some(Resolved::Image {
                    image,
                    paint_transform,
                }))
            }
            Paint::Pattern { id } => {
                let Some(image) = self.expanded_pattern(*id)? else {
                    return Ok(None);
                };
                Ok(Some(Resolved::Image {
                    image,
                    paint_transform: Affine::IDENTITY,
                }))
            }
        }
    }

    fn gradient_ramp(
        &mut self,
        radial: bool,
        inner: f64,
        stops: &[ColorStop],
        alpha: f32,
    ) -> BackdropResult<vello_cpu::Image> {
        // Global alpha is baked into the ramp so gradient fills never need an opacity layer.
        let key = GradientKey {
            radial,
            inner_milli: (inner * 1000.0).round() as u16,
            stops: stops
                .iter()
                .map(|s| {
                    (
                        (s.offset * 1000.0).round() as u16,
                        s.color.scale_alpha(alpha).to_rgba8(),
                    )
                })
                .collect(),
        };
        if let Some(img) = self.gradients.get(&key) {
            return Ok(img);
        }

        let scaled: SmallVec<[ColorStop; 4]> = stops
            .iter()
            .map(|s| ColorStop {
                offset: s.offset,
                color: s.color.scale_alpha(alpha),
            })
            .collect();
        let (w, h) = if radial {
            (RADIAL_RAMP_SIZE, RADIAL_RAMP_SIZE)
        } else {
            (LINEAR_RAMP_WIDTH, 1)
        };
        let mut bytes = vec![0u8; (w as usize) * (h as usize) * 4];
        let half = f64::from(RADIAL_RAMP_SIZE) / 2.0;
        for y in 0..h {
            for x in 0..w {
                let t = if radial {
                    let dx = f64::from(x) + 0.5 - half;
                    let dy = f64::from(y) + 0.5 - half;
                    let d = dx.hypot(dy) / half;
                    ((d - inner) / (1.0 - inner)).clamp(0.0, 1.0)
                } else {
                    (f64::from(x) + 0.5) / f64::from(w)
                };
                let idx = ((y * w + x) as usize) * 4;
                bytes[idx..idx + 4].copy_from_slice(&Paint::sample_stops(&scaled, t as f32).to_rgba8());
            }
        }
        premultiply_rgba8_in_place(&mut bytes);
        let img = premul_bytes_to_image(&bytes, w, h)?;
        self.gradient_builds += 1;
        self.gradients.insert(key, img.clone());
        Ok(img)
    }

    fn expanded_pattern(&mut self, id: PatternId) -> BackdropResult<Option<vello_cpu::Image>> {
        if let Some(img) = self.expanded_patterns.get(&id.0) {
            return Ok(Some(img.clone()));
        }
        let Some(tile) = self.tiles.get(id.0 as usize) else {
            return Ok(None);
        };
        let (w, h) = clamp_dims(self.size);
        let (w, h) = (u32::from(w), u32::from(h));
        let mut bytes = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h {
            for x in 0..w {
                bytes.extend_from_slice(&tile.texel(x, y));
            }
        }
        premultiply_rgba8_in_place(&mut bytes);
        let img = premul_bytes_to_image(&bytes, w, h)?;
        tracing::debug!(pattern = id.0, w, h, "expanded pattern tile");
        self.expanded_patterns.insert(id.0, img.clone());
        Ok(Some(img))
    }

    fn image_paint(&mut self, image: &DecodedImage) -> BackdropResult<vello_cpu::Image> {
        let key = Arc::as_ptr(&image.rgba8_premul) as usize;
        if let Some(img) = self.images.get(&key) {
            return Ok(img);
        }
        let img = premul_bytes_to_image(&image.rgba8_premul, image.width, image.height)?;
        self.images.insert(key, img.clone());
        Ok(img)
    }

    fn draw_with(&mut self, paint: &Paint, draw: impl FnOnce(&mut vello_cpu::RenderContext)) {
        let st = self.state.current;
        if st.alpha <= 0.0 {
            return;
        }
        let resolved = match self.resolve_paint(paint, st.alpha) {
            Ok(Some(r)) => r,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "paint could not be prepared; draw skipped");
                return;
            }
        };

        self.ctx.set_transform(affine_to_cpu(st.transform));
        self.ctx.set_blend_mode(blend_mode(st.composite));
        match resolved {
            Resolved::Solid([r, g, b, a]) => {
                self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                self.ctx
                    .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
                draw(&mut self.ctx);
            }
            Resolved::Image {
                image,
                paint_transform,
            } => {
                self.ctx.set_paint_transform(affine_to_cpu(paint_transform));
                self.ctx.set_paint(image);
                // Gradients already carry the alpha. Patterns go through an opacity layer, which
                // composites with the normal blend mode.
                let layered = matches!(paint, Paint::Pattern { .. }) && st.alpha < 1.0;
                if layered {
                    self.ctx.push_opacity_layer(st.alpha);
                }
                draw(&mut self.ctx);
                if layered {
                    self.ctx.pop_layer();
                }
            }
        }
    }
}

impl std::fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSurface")
            .field("size", &self.size)
            .field("patterns", &self.tiles.len())
            .field("cached_gradients", &self.gradients.len())
            .finish()
    }
}

impl DrawSurface for CpuSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        let (w, h) = clamp_dims(size);
        self.size = SurfaceSize::new(u32::from(w), u32::from(h));
        self.ctx = vello_cpu::RenderContext::new(w, h);
        self.state.reset();
        self.tiles.clear();
        self.expanded_patterns.clear();
    }

    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    fn clear(&mut self, color: Option<Rgba>) {
        self.ctx.reset();
        self.state.reset();
        if let Some(c) = color.filter(|c| c.a > 0.0) {
            let [r, g, b, a] = c.to_rgba8();
            self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            self.ctx
                .set_blend_mode(vello_cpu::peniko::BlendMode::default());
            self.ctx
                .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                self.size.w(),
                self.size.h(),
            ));
        }
    }

    fn save(&mut self) {
        self.state.save();
    }

    fn restore(&mut self) {
        if let Some(clips) = self.state.restore() {
            for _ in 0..clips {
                self.ctx.pop_layer();
            }
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.current.transform = transform;
    }

    fn transform(&self) -> Affine {
        self.state.current.transform
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.current.alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    }

    fn set_composite(&mut self, op: CompositeOp) {
        self.state.current.composite = op;
    }

    fn fill_path(&mut self, path: &BezPath, paint: &Paint) {
        if path.elements().is_empty() {
            return;
        }
        let p = bezpath_to_cpu(path);
        self.draw_with(paint, |ctx| ctx.fill_path(&p));
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let r = vello_cpu::kurbo::Rect::new(rect.x0, rect.y0, rect.x1, rect.y1);
        self.draw_with(paint, |ctx| ctx.fill_rect(&r));
    }

    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle, paint: &Paint) {
        if path.elements().is_empty() || style.width.is_nan() || style.width <= 0.0 {
            return;
        }
        let cap = match style.cap {
            LineCap::Butt => vello_cpu::kurbo::Cap::Butt,
            LineCap::Round => vello_cpu::kurbo::Cap::Round,
            LineCap::Square => vello_cpu::kurbo::Cap::Square,
        };
        let stroke = vello_cpu::kurbo::Stroke::new(style.width).with_caps(cap);
        let p = bezpath_to_cpu(path);
        self.draw_with(paint, move |ctx| {
            ctx.set_stroke(stroke);
            ctx.stroke_path(&p);
        });
    }

    fn clip(&mut self, path: &BezPath) {
        self.ctx
            .set_transform(affine_to_cpu(self.state.current.transform));
        self.ctx.push_clip_layer(&bezpath_to_cpu(path));
        self.state.current.clips += 1;
    }

    fn create_pattern(&mut self, tile: &PatternTile) -> Option<PatternId> {
        let expected = (tile.width as usize) * (tile.height as usize) * 4;
        if tile.width == 0 || tile.height == 0 || tile.rgba8.len() != expected {
            tracing::warn!(w = tile.width, h = tile.height, "rejected malformed pattern tile");
            return None;
        }
        let id = PatternId(u32::try_from(self.tiles.len()).ok()?);
        self.tiles.push(tile.clone());
        Some(id)
    }

    fn draw_image(&mut self, image: &DecodedImage, dest: Rect) {
        if dest.width() <= 0.0 || dest.height() <= 0.0 || image.width == 0 || image.height == 0 {
            return;
        }
        let st = self.state.current;
        if st.alpha <= 0.0 {
            return;
        }
        let paint = match self.image_paint(image) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "image could not be prepared; draw skipped");
                return;
            }
        };
        let paint_transform = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(
                dest.width() / f64::from(image.width),
                dest.height() / f64::from(image.height),
            );
        self.ctx.set_transform(affine_to_cpu(st.transform));
        self.ctx.set_blend_mode(blend_mode(st.composite));
        self.ctx.set_paint_transform(affine_to_cpu(paint_transform));
        self.ctx.set_paint(paint);
        if st.alpha < 1.0 {
            self.ctx.push_opacity_layer(st.alpha);
        }
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            dest.x0, dest.y0, dest.x1, dest.y1,
        ));
        if st.alpha < 1.0 {
            self.ctx.pop_layer();
        }
    }

    fn snapshot(&mut self) -> Option<FrameRGBA> {
        Some(self.render())
    }
}

fn blend_mode(op: CompositeOp) -> vello_cpu::peniko::BlendMode {
    use vello_cpu::peniko::{BlendMode, Compose, Mix};
    match op {
        CompositeOp::SourceOver => BlendMode::default(),
        CompositeOp::Lighter => BlendMode::new(Mix::Normal, Compose::Plus),
        CompositeOp::DestinationOut => BlendMode::new(Mix::Normal, Compose::DestOut),
    }
}

fn dims_u16(size: SurfaceSize) -> BackdropResult<(u16, u16)> {
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| BackdropError::surface("surface width exceeds u16"))?;
    let h: u16 = size
        .height
        .try_into()
        .map_err(|_| BackdropError::surface("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(BackdropError::surface("surface width/height must be > 0"));
    }
    Ok((w, h))
}

fn clamp_dims(size: SurfaceSize) -> (u16, u16) {
    let clamp = |v: u32| v.clamp(1, u32::from(u16::MAX)) as u16;
    (clamp(size.width), clamp(size.height))
}

fn premul_bytes_to_image(bytes: &[u8], width: u32, height: u32) -> BackdropResult<vello_cpu::Image> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BackdropError::surface("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BackdropError::surface("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(BackdropError::surface("pixmap byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/surface/cpu.rs"]
mod tests;
