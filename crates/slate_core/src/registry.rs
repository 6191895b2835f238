//! The live-sprite registry consulted once per frame by whichever surface draws.
//!
//! Synchronisation discipline: the registry is a mutex-guarded, insertion-ordered
//! list of *weak* references. Sprites own their state and image; the registry
//! never keeps either alive. The drawing side never iterates the live list
//! directly. It calls [`SpriteRegistry::snapshot`] once per frame, which copies
//! every live sprite's drawable state while holding the lock and releases it
//! before any drawing happens. Construction and destruction on another thread
//! can therefore only interleave between snapshots, never during iteration.

use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use glam::Vec2;

use crate::collision::Aabb;
use crate::sprite::{Sprite, SpriteId, SpriteState};

/// Poisoning is ignored: the guarded data is plain values.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RegistryEntry {
    id: SpriteId,
    state: Weak<Mutex<SpriteState>>,
    image: Weak<RgbaImage>,
}

/// Everything a renderer needs to draw one sprite, copied out of the registry.
#[derive(Debug, Clone)]
pub struct SpriteSnapshot {
    pub id: SpriteId,
    pub asset_path: Arc<str>,
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub image: Arc<RgbaImage>,
}

impl SpriteSnapshot {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_top_left(
            self.position,
            Vec2::new(self.width as f32, self.height as f32),
        )
    }
}

/// Cloneable handle; all clones share the same live set.
#[derive(Clone, Default)]
pub struct SpriteRegistry {
    entries: Arc<Mutex<Vec<RegistryEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for SpriteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> SpriteId {
        SpriteId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Append `sprite` to the live set. Returns `false` if it was already present.
    pub fn register(&self, sprite: &Sprite) -> bool {
        let mut entries = lock(&self.entries);
        if entries.iter().any(|entry| entry.id == sprite.id()) {
            return false;
        }
        entries.push(RegistryEntry {
            id: sprite.id(),
            state: Arc::downgrade(sprite.state_handle()),
            image: Arc::downgrade(sprite.image()),
        });
        log::trace!("Registered sprite {:?} ({})", sprite.id(), sprite.asset_path());
        true
    }

    /// Remove `sprite` from the live set. Removing an absent sprite is a no-op.
    pub fn deregister(&self, sprite: &Sprite) -> bool {
        self.remove_id(sprite.id())
    }

    pub(crate) fn remove_id(&self, id: SpriteId) -> bool {
        let mut entries = lock(&self.entries);
        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                entries.remove(index);
                log::trace!("Deregistered sprite {:?}", id);
                true
            }
            None => false,
        }
    }

    /// Lock the entries after dropping those whose sprite no longer exists.
    /// A sprite only deregisters itself from the registry that created it, so
    /// entries added through `register` on another registry can outlive it.
    fn live_entries(&self) -> MutexGuard<'_, Vec<RegistryEntry>> {
        let mut entries = lock(&self.entries);
        entries.retain(|entry| entry.state.strong_count() > 0);
        entries
    }

    pub fn contains(&self, sprite: &Sprite) -> bool {
        self.live_entries()
            .iter()
            .any(|entry| entry.id == sprite.id())
    }

    pub fn len(&self) -> usize {
        self.live_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_entries().is_empty()
    }

    #[cfg(test)]
    fn ids(&self) -> Vec<SpriteId> {
        self.live_entries().iter().map(|entry| entry.id).collect()
    }

    /// Copy the drawable state of every live sprite, in registration order.
    pub fn snapshot(&self) -> Vec<SpriteSnapshot> {
        let mut entries = lock(&self.entries);
        let mut snapshots = Vec::with_capacity(entries.len());
        entries.retain(|entry| {
            let (Some(state), Some(image)) = (entry.state.upgrade(), entry.image.upgrade()) else {
                return false;
            };
            let guard = lock(&state);
            snapshots.push(SpriteSnapshot {
                id: entry.id,
                asset_path: guard.asset_path.clone(),
                position: guard.position,
                width: guard.width,
                height: guard.height,
                scale: guard.scale,
                image,
            });
            true
        });
        snapshots
    }
}
