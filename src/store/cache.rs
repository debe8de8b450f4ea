/*!
 * In-process cache of user pronoun selections.
 *
 * Each user has a slot holding the cached sequence (if any), a generation
 * bumped on every cache change for that user, the number of queued writes not
 * yet durable, and the number of cache-miss loads in flight. A slot with none
 * of these is removed.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Slot {
    sets: Option<Vec<String>>,
    generation: u64,
    pending_writes: usize,
    loads: usize,
}

impl Slot {
    fn is_idle(&self) -> bool {
        self.sets.is_none() && self.pending_writes == 0 && self.loads == 0
    }
}

type Slots = HashMap<Uuid, Slot>;

fn prune(slots: &mut Slots, user: &Uuid) {
    if slots.get(user).is_some_and(Slot::is_idle) {
        slots.remove(user);
    }
}

/// Result of a cache lookup
pub enum Lookup<'a> {
    Hit(Vec<String>),
    Miss(LoadTicket<'a>),
}

/// An in-flight cache-miss load for one user
///
/// Pass it back to `PronounCache::fill` with the loaded value. Dropping it
/// unfilled just abandons the load.
pub struct LoadTicket<'a> {
    cache: &'a PronounCache,
    user: Uuid,
    generation: u64,
    writes_pending: bool,
    settled: bool,
}

impl LoadTicket<'_> {
    /// Whether writes for this user were queued but not yet durable at lookup time
    pub fn writes_pending(&self) -> bool {
        self.writes_pending
    }
}

impl Drop for LoadTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.finish_load(&self.user);
        }
    }
}

/// Pronoun cache keyed by user id
#[derive(Default)]
pub struct PronounCache {
    slots: RwLock<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PronounCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a user up, registering a load on a miss
    pub fn lookup(&self, user: &Uuid) -> Lookup<'_> {
        if let Some(sets) = self.peek(user) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {}", user);
            return Lookup::Hit(sets);
        }

        let mut slots = self.slots.write();
        let slot = slots.entry(*user).or_default();
        // Filled between the read and write lock
        if let Some(sets) = &slot.sets {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Lookup::Hit(sets.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss for {}", user);
        slot.loads += 1;
        Lookup::Miss(LoadTicket {
            cache: self,
            user: *user,
            generation: slot.generation,
            writes_pending: slot.pending_writes > 0,
            settled: false,
        })
    }

    /// Read without touching the hit/miss counters
    pub fn peek(&self, user: &Uuid) -> Option<Vec<String>> {
        self.slots.read().get(user).and_then(|slot| slot.sets.clone())
    }

    /// Overwrite a user's entry and record a queued write, then run `then`
    /// while still holding the write lock
    pub fn write_then<R>(&self, user: Uuid, sets: Vec<String>, then: impl FnOnce() -> R) -> R {
        let mut slots = self.slots.write();
        let slot = slots.entry(user).or_default();
        slot.sets = Some(sets);
        slot.generation += 1;
        slot.pending_writes += 1;
        then()
    }

    /// Record a queued write that leaves the entry as is, then run `then`
    /// while still holding the write lock
    pub fn record_write_then<R>(&self, user: Uuid, then: impl FnOnce() -> R) -> R {
        let mut slots = self.slots.write();
        slots.entry(user).or_default().pending_writes += 1;
        then()
    }

    /// Mark one queued write for `user` as done
    pub fn write_finished(&self, user: &Uuid) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(user) {
            slot.pending_writes = slot.pending_writes.saturating_sub(1);
        }
        prune(&mut slots, user);
    }

    /// Populate a user from a store read
    ///
    /// An entry that appeared meanwhile wins. If the user's entry changed
    /// since the lookup, `sets` is returned without being cached.
    pub fn fill(&self, mut ticket: LoadTicket<'_>, sets: Vec<String>) -> Vec<String> {
        ticket.settled = true;
        let mut slots = self.slots.write();
        let slot = slots.entry(ticket.user).or_default();
        slot.loads = slot.loads.saturating_sub(1);

        let result = match &slot.sets {
            Some(existing) => existing.clone(),
            None => {
                if slot.generation == ticket.generation {
                    slot.sets = Some(sets.clone());
                }
                sets
            }
        };
        prune(&mut slots, &ticket.user);
        result
    }

    fn finish_load(&self, user: &Uuid) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(user) {
            slot.loads = slot.loads.saturating_sub(1);
        }
        prune(&mut slots, user);
    }

    /// Drop a user's entry, returning whether one existed
    pub fn evict(&self, user: &Uuid) -> bool {
        let mut slots = self.slots.write();
        let removed = match slots.get_mut(user) {
            Some(slot) if slot.sets.is_some() => {
                slot.sets = None;
                slot.generation += 1;
                true
            }
            _ => false,
        };
        if removed {
            debug!("Evicted {} from pronoun cache", user);
        }
        prune(&mut slots, user);
        removed
    }

    /// Get cache statistics as (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Get the number of users with a cached entry
    pub fn len(&self) -> usize {
        self.slots.read().values().filter(|slot| slot.sets.is_some()).count()
    }

    /// Check if no user has a cached entry
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of users the cache is tracking in any way
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.read().len()
    }
}
