//! Bounded splat history with tiered fading and replay
//!
//! Per scene, an append-only FIFO log of splat records with a replay pointer.
//! Insertion beyond capacity evicts from the head; surviving records near the
//! head are bucketed into fade tiers. Head eviction flags the log for a full
//! replay, since the pointer alone cannot distinguish "nothing new" from
//! "appended and evicted in the same commit".

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::record::{AlphaTier, SplatRecord};
use crate::services::{DecalHandle, OwnerRegistry, RenderSink};

/// Fraction of the pool assigned the most-faded tier
pub const VERY_FADED_FRACTION: f32 = 0.05;
/// Fraction (after the most-faded slice) assigned the middle tier
pub const FADED_FRACTION: f32 = 0.10;

/// The persisted per-scene event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    /// Ordered, oldest first
    pub events: Vec<SplatRecord>,
    /// Demarcates rendered vs pending-replay entries; always <= events.len()
    pub pointer: usize,
}

/// State machine over a scene's [`HistoryLog`].
///
/// Mutation goes through `&mut self`, so commits, undo, delete, and wipe are
/// serialized by exclusivity; hosts sharing a manager across threads supply
/// their own lock.
#[derive(Debug)]
pub struct HistoryManager {
    log: HistoryLog,
    capacity: usize,
    staging: Vec<SplatRecord>,
    /// Set on head eviction; the next replay rebuilds from zero
    reset_pending: bool,
    /// Handles for currently drawn ownerless records
    drawn: HashMap<u64, DecalHandle>,
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self::from_log(HistoryLog::default(), capacity)
    }

    /// Resume from a persisted log
    pub fn from_log(log: HistoryLog, capacity: usize) -> Self {
        Self {
            log,
            capacity,
            staging: Vec::new(),
            reset_pending: false,
            drawn: HashMap::new(),
        }
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub fn is_empty(&self) -> bool {
        self.log.events.is_empty()
    }

    /// Ids of records owned by an entity, oldest first
    pub fn owned_record_ids(&self, owner_id: &str) -> Vec<u64> {
        self.log
            .events
            .iter()
            .filter(|r| r.owner_id.as_deref() == Some(owner_id))
            .map(|r| r.id)
            .collect()
    }

    /// Buffer a record for the next commit
    pub fn stage(&mut self, record: SplatRecord) {
        self.staging.push(record);
    }

    pub fn has_staged(&self) -> bool {
        !self.staging.is_empty()
    }

    /// Commit staged records: append, advance the pointer, evict past
    /// capacity, recompute fade tiers.
    ///
    /// Returns whether a batch landed in the log.
    pub fn commit(&mut self, sink: &mut dyn RenderSink, owners: &mut dyn OwnerRegistry) -> bool {
        if self.staging.is_empty() {
            return false;
        }
        let batch = std::mem::take(&mut self.staging);
        self.log.events.extend(batch);
        self.log.pointer = self.log.events.len();
        self.enforce_capacity(sink, owners);
        self.assign_fade_tiers(sink, owners);
        true
    }

    /// Evict from the head past capacity. Evicted owner records clear the
    /// whole owner collection so it rebuilds from whatever survives; the
    /// pending-reset flag forces a full re-render on the next replay pass.
    fn enforce_capacity(&mut self, sink: &mut dyn RenderSink, owners: &mut dyn OwnerRegistry) {
        if self.capacity == 0 || self.log.events.len() <= self.capacity {
            return;
        }
        let excess = self.log.events.len() - self.capacity;
        let evicted: Vec<SplatRecord> = self.log.events.drain(..excess).collect();
        self.log.pointer = self.log.events.len();
        self.reset_pending = true;

        let mut cleared: BTreeSet<&str> = BTreeSet::new();
        for record in &evicted {
            match &record.owner_id {
                Some(owner) => {
                    cleared.insert(owner);
                }
                None => {
                    if let Some(handle) = self.drawn.remove(&record.id) {
                        sink.destroy(handle);
                    }
                }
            }
        }
        for owner in cleared {
            owners.clear_owner(owner);
        }
        log::debug!("evicted {excess} records past pool capacity {}", self.capacity);
    }

    /// Bucket surviving records into fade tiers: the oldest 5% are very
    /// faded, the next 10% faded, the rest full opacity.
    ///
    /// Drawn ownerless records get their alpha patched in place; owners of
    /// changed owned records are redrawn so on-screen opacity tracks the tier.
    fn assign_fade_tiers(&mut self, sink: &mut dyn RenderSink, owners: &mut dyn OwnerRegistry) {
        let len = self.log.events.len();
        if len == 0 {
            return;
        }
        let very = (len as f32 * VERY_FADED_FRACTION).ceil() as usize;
        let faded_end = (very + (len as f32 * FADED_FRACTION).ceil() as usize).min(len);

        let mut stale_owners: BTreeSet<String> = BTreeSet::new();
        for (i, record) in self.log.events.iter_mut().enumerate() {
            let tier = if i < very {
                AlphaTier::VeryFaded
            } else if i < faded_end {
                AlphaTier::Faded
            } else {
                AlphaTier::Full
            };
            if record.alpha_tier != tier {
                record.alpha_tier = tier;
                match &record.owner_id {
                    Some(owner) => {
                        stale_owners.insert(owner.clone());
                    }
                    None => {
                        if let Some(handle) = self.drawn.get(&record.id) {
                            sink.set_alpha(*handle, tier);
                        }
                    }
                }
            }
        }
        for owner in stale_owners {
            owners.redraw_owner(&owner);
        }
    }

    /// True when head eviction invalidated incremental replay
    pub fn needs_full_replay(&self) -> bool {
        self.reset_pending
    }

    /// Replay events in `[start, stop)` against the rendered scene.
    ///
    /// Owner-tagged records are not drawn individually; their owners are
    /// collected and redrawn once at the end. A pending eviction reset, or
    /// `stop <= start`, means the history shrank behind the caller:
    /// everything drawn is destroyed and replay restarts from zero.
    pub fn replay(
        &mut self,
        start: usize,
        stop: usize,
        sink: &mut dyn RenderSink,
        owners: &mut dyn OwnerRegistry,
    ) {
        let start = if self.reset_pending || stop <= start {
            sink.destroy_all();
            self.drawn.clear();
            0
        } else {
            start
        };
        self.reset_pending = false;
        let stop = stop.min(self.log.events.len());

        let mut redraw: BTreeSet<String> = BTreeSet::new();
        for record in &self.log.events[start.min(stop)..stop] {
            match &record.owner_id {
                Some(owner) => {
                    redraw.insert(owner.clone());
                }
                None => {
                    let handle = sink.draw_record(record);
                    self.drawn.insert(record.id, handle);
                }
            }
        }
        for owner in redraw {
            owners.redraw_owner(&owner);
        }
    }

    /// Walk the pointer back `steps` (floored at zero) and truncate
    /// everything at or beyond it. Truncated owner records are removed from
    /// their owner's collection, which is then asked to persist.
    pub fn undo(
        &mut self,
        steps: usize,
        sink: &mut dyn RenderSink,
        owners: &mut dyn OwnerRegistry,
    ) {
        let new_pointer = self.log.pointer.saturating_sub(steps);
        let truncated: Vec<SplatRecord> = self.log.events.split_off(new_pointer.min(self.log.events.len()));
        self.log.pointer = new_pointer.min(self.log.events.len());

        let mut by_owner: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for record in &truncated {
            match &record.owner_id {
                Some(owner) => by_owner.entry(owner.clone()).or_default().push(record.id),
                None => {
                    if let Some(handle) = self.drawn.remove(&record.id) {
                        sink.destroy(handle);
                    }
                }
            }
        }
        for (owner, ids) in by_owner {
            owners.remove_records(&owner, &ids);
            owners.persist_owner(&owner);
        }
    }

    /// Remove records matching any of the given record ids or owner ids in
    /// one pass; the pointer resets to the new length.
    pub fn delete(
        &mut self,
        record_ids: &[u64],
        owner_ids: &[&str],
        sink: &mut dyn RenderSink,
        owners: &mut dyn OwnerRegistry,
    ) {
        let mut removed_by_owner: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        let drawn = &mut self.drawn;
        self.log.events.retain(|record| {
            let matches = record_ids.contains(&record.id)
                || record
                    .owner_id
                    .as_deref()
                    .is_some_and(|o| owner_ids.contains(&o));
            if matches {
                match &record.owner_id {
                    Some(owner) => removed_by_owner
                        .entry(owner.clone())
                        .or_default()
                        .push(record.id),
                    None => {
                        if let Some(handle) = drawn.remove(&record.id) {
                            sink.destroy(handle);
                        }
                    }
                }
            }
            !matches
        });
        self.log.pointer = self.log.events.len();

        for (owner, ids) in removed_by_owner {
            owners.remove_records(&owner, &ids);
            owners.redraw_owner(&owner);
        }
    }

    /// Update the stored rotation on every record owned by an entity.
    ///
    /// This is one of the two permitted record mutations (the other being
    /// the fade tier); returns how many records were touched.
    pub fn set_owner_rotation(&mut self, owner_id: &str, degrees: f32) -> usize {
        let mut touched = 0;
        for record in &mut self.log.events {
            if record.owner_id.as_deref() == Some(owner_id) {
                record.rotation = degrees;
                touched += 1;
            }
        }
        touched
    }

    /// Clear everything and destroy all drawn decal containers
    pub fn wipe(&mut self, sink: &mut dyn RenderSink) {
        self.log.events.clear();
        self.log.pointer = 0;
        self.staging.clear();
        self.reset_pending = false;
        self.drawn.clear();
        sink.destroy_all();
    }
}
