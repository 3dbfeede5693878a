//! Drawing surfaces and the per-size resources that depend on them.

pub mod cpu;
pub mod draw;
pub mod manager;
pub mod recording;

pub use cpu::{CpuSurface, CpuSurfaceOpts};
pub use draw::{
    Capability, ColorStop, CompositeOp, DrawSurface, LineCap, Paint, PatternId, PatternTile,
    StrokeStyle,
};
pub use manager::{PatternCache, SurfaceManager, SurfaceOpts};
pub use recording::{Capabilities, DrawOp, OpLog, RecordingSurface};

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Convert to straight alpha in place.
    pub fn unpremultiply(&mut self) {
        if !self.premultiplied {
            return;
        }
        for px in self.data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        self.premultiplied = false;
    }

    /// FNV-1a digest of the pixel data, for cheap equality checks.
    pub fn digest(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for &b in &self.data {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0000_0100_0000_01B3);
        }
        h
    }
}
