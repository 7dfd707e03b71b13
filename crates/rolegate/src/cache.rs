//! The authorization cache.
//!
//! Holds at most one [`Catalogue`] snapshot. A miss loads the catalogue from
//! the store and installs it; any change to a catalogued entity clears it so
//! the next reader reloads.
//!
//! Invalidation and installation are ordered through a generation counter
//! kept under the same lock as the snapshot. Clearing bumps the generation.
//! A loader remembers the generation it started under and only installs its
//! result if nothing was invalidated in between, so a load that raced with a
//! write can never leave a stale snapshot behind.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rolegate_core::Catalogue;
use rolegate_store::{ChangeEvent, ChangeObserver, ChangeOp, EntityStore, StoreError};
use serde::Serialize;

use crate::config::CacheConfig;

/// Whether a snapshot is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Empty,
    Populated,
}

/// Counters describing cache behaviour since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads answered from the snapshot.
    pub hits: u64,
    /// Reads that found no snapshot.
    pub misses: u64,
    /// Catalogue loads from the store.
    pub loads: u64,
    /// Calls to [`AuthorizationCache::forget_cached_permissions`].
    pub invalidations: u64,
    /// Loads not installed because an invalidation overtook them.
    pub discarded_loads: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    invalidations: AtomicU64,
    discarded_loads: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    catalogue: Option<Arc<Catalogue>>,
}

/// One catalogue snapshot per authorization domain.
#[derive(Debug, Default)]
pub struct AuthorizationCache {
    config: CacheConfig,
    slot: RwLock<Slot>,
    counters: Counters,
}

impl AuthorizationCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // Readers never leave the slot half-written, so a poisoned lock still
    // guards consistent data.
    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached catalogue, loading it from `store` on a miss.
    pub async fn get_permissions<S>(&self, store: &S) -> Result<Arc<Catalogue>, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        self.get_or_load(|| store.load_catalogue()).await
    }

    /// The cached catalogue, producing it with `load` on a miss.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Arc<Catalogue>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Catalogue, E>>,
    {
        if !self.config.enabled {
            Counters::bump(&self.counters.misses);
            Counters::bump(&self.counters.loads);
            return Ok(Arc::new(load().await?));
        }

        let generation = {
            let slot = self.read_slot();
            if let Some(catalogue) = &slot.catalogue {
                Counters::bump(&self.counters.hits);
                tracing::trace!(generation = slot.generation, "catalogue cache hit");
                return Ok(Arc::clone(catalogue));
            }
            slot.generation
        };

        Counters::bump(&self.counters.misses);
        let catalogue = Arc::new(load().await?);
        Counters::bump(&self.counters.loads);

        let mut slot = self.write_slot();
        if slot.generation != generation {
            Counters::bump(&self.counters.discarded_loads);
            tracing::warn!(
                started = generation,
                current = slot.generation,
                "catalogue changed while loading, not caching the result"
            );
            return Ok(catalogue);
        }

        if let Some(existing) = &slot.catalogue {
            // Another reader installed this generation first.
            return Ok(Arc::clone(existing));
        }

        tracing::debug!(
            generation,
            roles = catalogue.role_count(),
            permissions = catalogue.permission_count(),
            "catalogue cached"
        );
        slot.catalogue = Some(Arc::clone(&catalogue));
        Ok(catalogue)
    }

    /// Drop the snapshot. Safe to call at any time, any number of times.
    pub fn forget_cached_permissions(&self) {
        let mut slot = self.write_slot();
        slot.generation += 1;
        let had_snapshot = slot.catalogue.take().is_some();
        drop(slot);

        Counters::bump(&self.counters.invalidations);
        tracing::debug!(had_snapshot, "catalogue cache invalidated");
    }

    pub fn state(&self) -> CacheState {
        if self.read_slot().catalogue.is_some() {
            CacheState::Populated
        } else {
            CacheState::Empty
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            discarded_loads: self.counters.discarded_loads.load(Ordering::Relaxed),
        }
    }

    /// Whether `event` makes the snapshot stale.
    ///
    /// Subject changes never do: subject facts are not part of the catalogue.
    pub fn invalidates(&self, event: &ChangeEvent) -> bool {
        if !event.kind.is_catalogued() {
            return false;
        }
        match event.op {
            ChangeOp::Created => self.config.invalidate_on_create,
            ChangeOp::Updated | ChangeOp::Deleted => true,
        }
    }
}

impl ChangeObserver for AuthorizationCache {
    fn on_change(&self, event: &ChangeEvent) {
        if self.invalidates(event) {
            self.forget_cached_permissions();
        }
    }
}
