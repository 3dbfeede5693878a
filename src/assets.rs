//! The optional external image a scene may draw (a sun disc, for instance).
//!
//! Loading is fire-and-forget: a decode job runs on the rayon pool and fills an [`AssetSlot`],
//! while the render loop only ever polls [`AssetSlot::get`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Context;

use crate::foundation::error::{BackdropError, BackdropResult};

/// Decoded raster image in premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    /// Wrap premultiplied pixels, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> BackdropResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if rgba8_premul.len() != expected {
            return Err(BackdropError::asset(format!(
                "image byte len {} does not match {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }
}

pub fn decode_image(bytes: &[u8]) -> BackdropResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(BackdropError::asset("image has zero width or height"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Where an asset slot currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    /// No asset was configured.
    Absent,
    Pending,
    Ready,
    Failed,
}

type SlotCell = Arc<OnceLock<Result<DecodedImage, String>>>;

/// Write-once cell holding the scene's external image.
///
/// Clones share the same cell, so a loader can keep one clone while the renderer polls another.
#[derive(Clone, Debug, Default)]
pub struct AssetSlot {
    cell: Option<SlotCell>,
}

impl AssetSlot {
    /// No asset at all; stages that need one stay skipped.
    pub fn empty() -> Self {
        Self { cell: None }
    }

    /// Slot that will be filled later with [`AssetSlot::fulfill`] or [`AssetSlot::fail`].
    pub fn pending() -> Self {
        Self {
            cell: Some(Arc::new(OnceLock::new())),
        }
    }

    pub fn ready(image: DecodedImage) -> Self {
        let slot = Self::pending();
        slot.fulfill(image);
        slot
    }

    /// Read and decode `path` on the rayon pool.
    pub fn load_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slot = Self::pending();
        let target = slot.clone();
        rayon::spawn(move || match read_and_decode(&path) {
            Ok(image) => {
                tracing::debug!(path = %path.display(), w = image.width, h = image.height, "asset ready");
                target.fulfill(image);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "asset failed to load");
                target.fail(e.to_string());
            }
        });
        slot
    }

    /// Decode in-memory bytes on the rayon pool.
    pub fn load_bytes(bytes: Vec<u8>) -> Self {
        let slot = Self::pending();
        let target = slot.clone();
        rayon::spawn(move || match decode_image(&bytes) {
            Ok(image) => {
                target.fulfill(image);
            }
            Err(e) => {
                tracing::warn!(error = %e, "asset failed to decode");
                target.fail(e.to_string());
            }
        });
        slot
    }

    /// Store the decoded image. Returns `false` if the slot was already settled or is empty.
    pub fn fulfill(&self, image: DecodedImage) -> bool {
        self.cell
            .as_ref()
            .is_some_and(|cell| cell.set(Ok(image)).is_ok())
    }

    /// Record a load failure. The slot then stays without an image.
    pub fn fail(&self, msg: impl Into<String>) -> bool {
        self.cell
            .as_ref()
            .is_some_and(|cell| cell.set(Err(msg.into())).is_ok())
    }

    /// The image, once it is available. Never blocks.
    pub fn get(&self) -> Option<&DecodedImage> {
        self.cell.as_ref()?.get()?.as_ref().ok()
    }

    pub fn status(&self) -> AssetStatus {
        match &self.cell {
            None => AssetStatus::Absent,
            Some(cell) => match cell.get() {
                None => AssetStatus::Pending,
                Some(Ok(_)) => AssetStatus::Ready,
                Some(Err(_)) => AssetStatus::Failed,
            },
        }
    }

    /// Failure message, if loading failed.
    pub fn error(&self) -> Option<&str> {
        match self.cell.as_ref()?.get()? {
            Err(msg) => Some(msg.as_str()),
            Ok(_) => None,
        }
    }
}

fn read_and_decode(path: &Path) -> BackdropResult<DecodedImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| BackdropError::asset(format!("failed to read '{}': {e}", path.display())))?;
    decode_image(&bytes)
}
