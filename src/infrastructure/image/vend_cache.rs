//! In-memory vend cache of image variants with single-flight resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::DynamicImage;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::domain::entities::{
    CacheEntry, ImageSource, OwnerKey, Variant, VariantKey, VariantSize,
};
use crate::domain::errors::{VendError, VendResult};
use crate::domain::ports::{ImageOwner, ImageTransformer};

use super::variant_store::VariantStore;

type VendOutcome = VendResult<Arc<DynamicImage>>;

/// Result slot shared by the leader of a resolution and everyone waiting on it.
struct InFlight {
    result: Mutex<Option<VendOutcome>>,
    ready: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn set(&self, outcome: VendOutcome) {
        let mut slot = self.result.lock();
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> VendOutcome {
        let mut slot = self.result.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

/// Identifies the invalidation state a resolution started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    epoch: u64,
    owner: u64,
}

/// Bookkeeping for resolutions in flight.
///
/// An owner's generation counter only lives while that owner has a leader
/// running; nothing needs it once no resolution can observe a change.
#[derive(Default)]
struct PendingState {
    flights: HashMap<VariantKey, Arc<InFlight>>,
    leaders: HashMap<i64, usize>,
    owner_generations: HashMap<i64, u64>,
    epoch: u64,
}

impl PendingState {
    fn lead(&mut self, key: &VariantKey) {
        if let Some(id) = key.owner.id() {
            *self.leaders.entry(id).or_insert(0) += 1;
        }
    }

    fn release(&mut self, key: &VariantKey) {
        let Some(id) = key.owner.id() else {
            return;
        };
        if let Some(count) = self.leaders.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.leaders.remove(&id);
                self.owner_generations.remove(&id);
            }
        }
    }

    fn generation_of(&self, key: &VariantKey) -> Generation {
        let owner = key
            .owner
            .id()
            .and_then(|id| self.owner_generations.get(&id).copied())
            .unwrap_or(0);
        Generation {
            epoch: self.epoch,
            owner,
        }
    }
}

/// Releases waiters if the leader unwinds before publishing a result.
struct LeaderGuard<'a> {
    cache: &'a VendCache,
    key: &'a VariantKey,
    flight: &'a Arc<InFlight>,
    finished: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(key = %self.key, "Variant resolution aborted");
            self.cache.finish(
                self.key,
                self.flight,
                Err(VendError::not_available(&self.key.owner)),
                None,
            );
        }
    }
}

/// Vend cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct VendStats {
    /// Requests answered from memory.
    pub hits: u64,
    /// Requests that started a resolution.
    pub misses: u64,
    /// Requests that joined a resolution already in flight.
    pub joined: u64,
    /// Variants rendered by the transformer.
    pub renders: u64,
    /// Variants decoded from the backing store.
    pub store_hits: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached variants.
    pub size: usize,
}

impl std::fmt::Display for VendStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Vend cache: {} variants, {:.1}% hit rate ({} hits, {} misses, {} renders, {} from store)",
            self.size, self.hit_rate, self.hits, self.misses, self.renders, self.store_hits
        )
    }
}

/// Vends image variants of owners, keeping every resolved variant in memory
/// until it is invalidated.
///
/// Concurrent requests for the same uncached variant are coalesced: one caller
/// resolves it and the rest block until that result is available. No lock is
/// held while a variant is rendered or read from disk.
pub struct VendCache {
    transformer: Arc<dyn ImageTransformer>,
    store: Option<Arc<VariantStore>>,
    entries: RwLock<HashMap<VariantKey, CacheEntry>>,
    pending: Mutex<PendingState>,
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    renders: AtomicU64,
    store_hits: AtomicU64,
}

impl VendCache {
    /// Creates a memory-only cache.
    #[must_use]
    pub fn new(transformer: Arc<dyn ImageTransformer>) -> Self {
        Self {
            transformer,
            store: None,
            entries: RwLock::new(HashMap::new()),
            pending: Mutex::new(PendingState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            renders: AtomicU64::new(0),
            store_hits: AtomicU64::new(0),
        }
    }

    /// Creates a cache that reads through and writes through `store`.
    #[must_use]
    pub fn with_store(transformer: Arc<dyn ImageTransformer>, store: Arc<VariantStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(transformer)
        }
    }

    /// The backing store, if any.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<VariantStore>> {
        self.store.as_ref()
    }

    /// Returns the owner's original image.
    #[must_use]
    pub fn original(&self, owner: &dyn ImageOwner) -> Option<Arc<DynamicImage>> {
        self.image(owner, VariantSize::Original, Variant::Original)
    }

    /// Returns the owner's image scaled to fit within `size`.
    #[must_use]
    pub fn sized(&self, owner: &dyn ImageOwner, size: VariantSize) -> Option<Arc<DynamicImage>> {
        self.image(owner, size, Variant::Original)
    }

    /// Returns the requested variant, or `None` if it cannot be produced.
    #[must_use]
    pub fn image(
        &self,
        owner: &dyn ImageOwner,
        size: VariantSize,
        variant: Variant,
    ) -> Option<Arc<DynamicImage>> {
        match self.try_image(owner, size, variant) {
            Ok(image) => Some(image),
            Err(e) if e.is_not_available() => {
                debug!(owner = owner.identifier(), error = %e, "No image to vend");
                None
            }
            Err(e) => {
                warn!(owner = owner.identifier(), size = %size, variant = %variant, error = %e, "Failed to vend image");
                None
            }
        }
    }

    /// Returns the requested variant, resolving it on a miss.
    ///
    /// # Errors
    /// Returns `NotAvailable` if the owner has no image and `InvalidInput` if
    /// the original cannot be transformed. Failures are not cached.
    pub fn try_image(
        &self,
        owner: &dyn ImageOwner,
        size: VariantSize,
        variant: Variant,
    ) -> VendResult<Arc<DynamicImage>> {
        self.vend(owner, VariantKey::new(owner.identifier(), size, variant))
            .map(|(image, _)| image)
    }

    /// Like [`VendCache::try_image`] but also reports where the image came from.
    ///
    /// # Errors
    /// See [`VendCache::try_image`].
    pub fn vend(
        &self,
        owner: &dyn ImageOwner,
        key: VariantKey,
    ) -> VendResult<(Arc<DynamicImage>, ImageSource)> {
        if let Some(image) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Vend cache hit");
            return Ok((image, ImageSource::Memory));
        }

        let (flight, generation) = {
            let mut pending = self.pending.lock();
            if let Some(image) = self.lookup(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok((image, ImageSource::Memory));
            }
            if let Some(flight) = pending.flights.get(&key).cloned() {
                drop(pending);
                self.joined.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Joining in-flight resolution");
                return flight.wait().map(|image| (image, ImageSource::Memory));
            }
            let flight = Arc::new(InFlight::new());
            pending.flights.insert(key.clone(), Arc::clone(&flight));
            pending.lead(&key);
            (flight, pending.generation_of(&key))
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(key = %key, "Vend cache miss");

        let mut guard = LeaderGuard {
            cache: self,
            key: &key,
            flight: &flight,
            finished: false,
        };
        let resolved = self.resolve(owner, &key);
        guard.finished = true;

        let source = resolved.as_ref().map_or(ImageSource::Rendered, |(_, source)| *source);
        let outcome = resolved.map(|(image, _)| image);
        let current = self.finish(&key, &flight, outcome.clone(), Some(generation));
        if !current
            && outcome.is_ok()
            && source == ImageSource::Rendered
            && let Some(store) = &self.store
        {
            // Written back after the owner was invalidated.
            store.remove_variant(&key.owner.storage_key(), key.variant, key.size);
        }
        outcome.map(|image| (image, source))
    }

    fn lookup(&self, key: &VariantKey) -> Option<Arc<DynamicImage>> {
        let mut entries = self.entries.write();
        entries.get_mut(key).map(|entry| {
            entry.touch();
            Arc::clone(&entry.image)
        })
    }

    fn resolve(
        &self,
        owner: &dyn ImageOwner,
        key: &VariantKey,
    ) -> VendResult<(Arc<DynamicImage>, ImageSource)> {
        let storage_key = key.owner.storage_key();

        if let Some(store) = &self.store
            && let Some(stored) = store.image_variant(&storage_key, key.variant, key.size, 1.0)
        {
            self.store_hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Resolved variant from store");
            return Ok((Arc::new(stored.into_inner()), ImageSource::Store));
        }

        let original = owner
            .original_image()
            .ok_or_else(|| VendError::not_available(&key.owner))?;

        let image = if key.is_original() {
            original
        } else {
            self.renders.fetch_add(1, Ordering::Relaxed);
            Arc::new(
                self.transformer
                    .render_variant(&original, key.variant, key.size)?,
            )
        };

        if let Some(store) = &self.store
            && let Err(e) = store.persist_variant(&image, &storage_key, key.variant, key.size)
        {
            warn!(key = %key, error = %e, "Failed to persist vended variant");
        }

        debug!(key = %key, width = image.width(), height = image.height(), "Resolved variant");
        Ok((image, ImageSource::Rendered))
    }

    /// Publishes a resolution. The entry is only inserted if no invalidation
    /// touched the key since `generation` was taken. Called exactly once per
    /// leader. Returns whether the generation was still current.
    fn finish(
        &self,
        key: &VariantKey,
        flight: &Arc<InFlight>,
        outcome: VendOutcome,
        generation: Option<Generation>,
    ) -> bool {
        let current = {
            let mut pending = self.pending.lock();
            let current = generation.is_some_and(|g| g == pending.generation_of(key));
            if let Ok(image) = &outcome
                && current
            {
                self.entries
                    .write()
                    .insert(key.clone(), CacheEntry::new(key.clone(), Arc::clone(image)));
            }
            if pending
                .flights
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, flight))
            {
                pending.flights.remove(key);
            }
            pending.release(key);
            current
        };
        flight.set(outcome);
        current
    }

    /// Drops every cached variant of `owner`, in memory and in the backing
    /// store. Resolutions already running for it will not be cached.
    pub fn invalidate(&self, owner: &dyn ImageOwner) {
        self.invalidate_id(owner.identifier());
    }

    /// Drops every cached variant of the owner with `id`.
    pub fn invalidate_id(&self, id: i64) {
        let removed = {
            let mut pending = self.pending.lock();
            if pending.leaders.contains_key(&id) {
                *pending.owner_generations.entry(id).or_insert(0) += 1;
            }
            pending.flights.retain(|key, _| key.owner.id() != Some(id));

            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|key, _| key.owner.id() != Some(id));
            before - entries.len()
        };

        let stored = self
            .store
            .as_ref()
            .map_or(0, |store| store.remove_images(&OwnerKey::Id(id).storage_key()));
        debug!(owner = id, removed, stored, "Invalidated owner variants");
    }

    /// Drops every cached variant. The backing store is left untouched.
    pub fn invalidate_all(&self) {
        let removed = {
            let mut pending = self.pending.lock();
            pending.epoch += 1;
            pending.owner_generations.clear();
            pending.flights.clear();

            let mut entries = self.entries.write();
            let removed = entries.len();
            entries.clear();
            removed
        };
        debug!(removed, "Invalidated all variants");
    }

    /// Returns true if the variant is cached in memory.
    #[must_use]
    pub fn contains(&self, owner: &dyn ImageOwner, size: VariantSize, variant: Variant) -> bool {
        self.entries
            .read()
            .contains_key(&VariantKey::new(owner.identifier(), size, variant))
    }

    /// Number of cached variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> VendStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let joined = self.joined.load(Ordering::Relaxed);
        let total = hits + misses + joined;
        let hit_rate = if total > 0 {
            ((hits + joined) as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        VendStats {
            hits,
            misses,
            joined,
            renders: self.renders.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            hit_rate,
            size: self.len(),
        }
    }
}

impl std::fmt::Debug for VendCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendCache")
            .field("store", &self.store)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
