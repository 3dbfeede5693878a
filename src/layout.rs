//! Shared, reference-counted store of generated scene layouts.

use crate::scenes::SceneId;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Generation parameters besides the seed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Density multiplier for entity counts (particles, lights, stars).
    pub detail: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self { detail: 1.0 }
    }
}

impl LayoutParams {
    /// Scale a base entity count by `detail`, keeping at least one entity.
    pub fn count(&self, base: usize) -> usize {
        ((base as f64 * self.detail).round() as usize).max(1)
    }
}

/// Cache key: one layout per scene, seed and parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    pub scene: SceneId,
    pub seed: u64,
    detail_milli: u32,
}

impl LayoutKey {
    pub fn new(scene: SceneId, seed: u64, params: &LayoutParams) -> Self {
        Self {
            scene,
            seed,
            detail_milli: (params.detail * 1000.0).round().clamp(0.0, u32::MAX as f64) as u32,
        }
    }
}

/// Memoizes generated layouts for every renderer that shares this cache.
///
/// Entries are held weakly: the first `acquire` generates, later ones reuse the same `Rc`, and the
/// layout is dropped together with the last renderer holding it.
#[derive(Default)]
pub struct LayoutCache {
    entries: RefCell<HashMap<LayoutKey, Weak<dyn Any>>>,
    generations: Cell<u64>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached layout for `key`, generating it with `generate` on a miss.
    ///
    /// A live entry stored under `key` with a different type is treated as a miss and replaced.
    pub fn acquire<L: Any>(&self, key: LayoutKey, generate: impl FnOnce() -> L) -> Rc<L> {
        let hit = self
            .entries
            .borrow()
            .get(&key)
            .and_then(Weak::upgrade)
            .and_then(|rc| rc.downcast::<L>().ok());
        if let Some(layout) = hit {
            tracing::trace!(scene = ?key.scene, seed = key.seed, "layout cache hit");
            return layout;
        }

        // Generate without holding the borrow so generators may consult the cache themselves.
        let layout = Rc::new(generate());
        self.generations.set(self.generations.get() + 1);
        tracing::debug!(scene = ?key.scene, seed = key.seed, "generated scene layout");

        let erased: Rc<dyn Any> = layout.clone();
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, w| w.strong_count() > 0);
        entries.insert(key, Rc::downgrade(&erased));
        layout
    }

    /// Number of layouts currently kept alive by at least one holder.
    pub fn live_entries(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// `true` when a live layout exists for `key`.
    pub fn contains(&self, key: &LayoutKey) -> bool {
        self.entries
            .borrow()
            .get(key)
            .is_some_and(|w| w.strong_count() > 0)
    }

    /// Total number of times a generator ran through this cache.
    pub fn generation_count(&self) -> u64 {
        self.generations.get()
    }

    /// Drop bookkeeping for layouts nobody holds any more.
    pub fn evict_unused(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|_, w| w.strong_count() > 0);
        before - entries.len()
    }
}

impl std::fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutCache")
            .field("entries", &self.entries.borrow().len())
            .field("generations", &self.generations.get())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/layout.rs"]
mod tests;
