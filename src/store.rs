//! Item reconciliation store
//!
//! Owns the canonical `uid -> Item` map and applies transport payloads
//! deterministically: full or partial snapshots from REST, single-item
//! deltas from the WebSocket. Every apply returns an [`ItemDiff`] telling
//! the renderer exactly which items were added, updated or removed.
//!
//! The store does no I/O and never fails on data quality: malformed records
//! are skipped with a diagnostic. Applies must be fed in transport delivery
//! order; later partial deltas may overwrite fields set by earlier ones.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::{Item, ItemUpdate};

/// Result of one apply operation.
///
/// The three arrays never share a uid, and each entry reflects where the
/// item actually ended up: a uid resident after the apply is reported as
/// added or updated (by whether it was resident before the batch), a uid
/// absent afterwards as removed only if it was resident before. `added`
/// and `updated` follow the input record order; implicit removals follow
/// map iteration order. Callers must not mutate the returned items in
/// place - route changes back through [`ItemStore::apply_delta`] instead.
#[derive(Debug, Clone, Default)]
pub struct ItemDiff {
    pub added: Vec<Item>,
    pub updated: Vec<Item>,
    pub removed: Vec<Item>,
}

impl ItemDiff {
    /// True when the apply changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Canonical client-side item cache.
///
/// Construct one instance at the composition root and pass it by reference;
/// there is no ambient global. All operations are synchronous and run to
/// completion on the calling thread.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<String, Item>,
    revision: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a snapshot batch.
    ///
    /// When `partial` is false, every resident uid absent from the batch is
    /// implicitly removed; a partial batch only ever touches what it
    /// explicitly mentions. Tombstone records (the `b-a-o-can` sentinel
    /// type or an explicit delete flag) remove their target instead of
    /// upserting, and are never inserted themselves.
    ///
    /// `updated` echoes every existing uid the batch mentions, whether or
    /// not any field actually changed; `last_seen` is touched either way.
    pub fn apply_snapshot(&mut self, records: &[ItemUpdate], partial: bool) -> ItemDiff {
        let mut diff = ItemDiff::default();
        let mut seen = HashSet::with_capacity(records.len());
        let mut resident_before = HashMap::with_capacity(records.len());

        for update in records {
            self.apply_one(update, false, &mut diff, &mut seen, &mut resident_before);
        }

        if !partial {
            let stale: Vec<String> = self
                .items
                .keys()
                .filter(|uid| !seen.contains(uid.as_str()))
                .cloned()
                .collect();
            for uid in stale {
                if let Some(prev) = self.items.remove(&uid) {
                    diff.removed.push(prev);
                }
            }
        }

        self.finalize(&mut diff, &resident_before);
        debug!(
            added = diff.added.len(),
            updated = diff.updated.len(),
            removed = diff.removed.len(),
            partial,
            revision = self.revision,
            "applied snapshot"
        );
        diff
    }

    /// Apply a single push delta.
    ///
    /// Equivalent to a one-record partial snapshot, except that
    /// `is_delete == true` forces tombstone treatment regardless of the
    /// record's type field. Deleting an unknown uid is a no-op.
    pub fn apply_delta(&mut self, record: &ItemUpdate, is_delete: bool) -> ItemDiff {
        let mut diff = ItemDiff::default();
        let mut seen = HashSet::with_capacity(1);
        let mut resident_before = HashMap::with_capacity(1);

        self.apply_one(record, is_delete, &mut diff, &mut seen, &mut resident_before);
        self.finalize(&mut diff, &resident_before);
        diff
    }

    /// Insert a locally-created item ahead of the server echo, so the
    /// renderer shows it immediately after a create. The later echo merges
    /// into the same entry through the normal delta path.
    pub fn upsert_local(&mut self, item: &Item) -> ItemDiff {
        self.apply_delta(&ItemUpdate::from(item), false)
    }

    pub fn get(&self, uid: &str) -> Option<&Item> {
        self.items.get(uid)
    }

    /// Snapshot copy of every resident item, order unspecified.
    pub fn all(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Monotonic counter, bumped whenever an apply changed anything. Lets
    /// the renderer poll for "something changed" without deep comparison.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drop everything (logout/reset). Emits no diff; a caller reconciling
    /// a renderer must treat this as "remove all".
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.revision += 1;
        }
    }

    fn apply_one(
        &mut self,
        update: &ItemUpdate,
        force_delete: bool,
        diff: &mut ItemDiff,
        seen: &mut HashSet<String>,
        resident_before: &mut HashMap<String, bool>,
    ) {
        if update.uid.is_empty() {
            warn!("skipping record without uid");
            return;
        }
        if seen.insert(update.uid.clone()) {
            // First mention in this batch: record pre-batch residency so
            // finalize can classify the uid after all records have applied.
            resident_before.insert(update.uid.clone(), self.items.contains_key(&update.uid));
        }

        if force_delete || update.is_tombstone() {
            if let Some(prev) = self.items.remove(&update.uid) {
                diff.removed.push(prev);
            }
            return;
        }

        match self.items.get_mut(&update.uid) {
            Some(existing) => {
                existing.merge(update);
                diff.updated.push(existing.clone());
            }
            None => {
                if let Some(item) = Item::from_update(update) {
                    self.items.insert(item.uid.clone(), item.clone());
                    diff.added.push(item);
                }
            }
        }
    }

    // Refresh reported clones to final post-batch state and enforce uid
    // disjointness across the three arrays, even when one batch mentions
    // the same uid more than once. A uid resident after the batch is
    // reported as added (absent before) or updated (resident before); a
    // uid absent afterwards is removed only if it was resident before, so
    // a record added and tombstoned within one batch reports nothing.
    // Bumps the revision when anything moved.
    fn finalize(&mut self, diff: &mut ItemDiff, resident_before: &HashMap<String, bool>) {
        for entry in diff.added.iter_mut().chain(diff.updated.iter_mut()) {
            if let Some(current) = self.items.get(&entry.uid) {
                *entry = current.clone();
            }
        }

        // Uids pruned implicitly by a full snapshot never hit apply_one,
        // so absence from the map means they were resident before.
        let was_resident =
            |uid: &str| resident_before.get(uid).copied().unwrap_or(true);

        let mut reported = HashSet::new();
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for entry in diff.added.drain(..).chain(diff.updated.drain(..)) {
            if !self.items.contains_key(&entry.uid) || !reported.insert(entry.uid.clone()) {
                continue;
            }
            if was_resident(&entry.uid) {
                updated.push(entry);
            } else {
                added.push(entry);
            }
        }
        diff.added = added;
        diff.updated = updated;

        let mut removed_seen = HashSet::new();
        diff.removed.retain(|i| {
            !self.items.contains_key(&i.uid)
                && was_resident(&i.uid)
                && removed_seen.insert(i.uid.clone())
        });

        if !diff.is_empty() {
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(uid: &str) -> ItemUpdate {
        ItemUpdate::for_uid(uid)
    }

    fn positioned(uid: &str, lat: f64, lon: f64) -> ItemUpdate {
        let mut u = update(uid);
        u.lat = Some(lat);
        u.lon = Some(lon);
        u
    }

    #[test]
    fn test_full_snapshot_adds_items() {
        let mut store = ItemStore::new();
        let diff = store.apply_snapshot(&[positioned("u1", 10.0, 20.0)], false);

        assert_eq!(diff.added.len(), 1);
        assert!(diff.updated.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_full_snapshot_prunes_absent_uids() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a"), update("b")], false);

        let diff = store.apply_snapshot(&[update("a")], false);
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].uid, "b");
        assert!(store.get("b").is_none());
        assert!(store.get("a").is_some());
    }

    #[test]
    fn test_partial_snapshot_never_prunes() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a"), update("b")], false);

        let diff = store.apply_snapshot(&[update("a")], true);
        assert!(diff.removed.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_merge_preserves_unmentioned_fields() {
        let mut store = ItemStore::new();
        let mut first = positioned("a", 1.0, 5.0);
        first.callsign = Some("X".to_string());
        store.apply_snapshot(&[first], false);

        let mut second = update("a");
        second.lat = Some(2.0);
        let diff = store.apply_snapshot(&[second], true);

        assert_eq!(diff.updated.len(), 1);
        let item = store.get("a").unwrap();
        assert_eq!(item.callsign, "X");
        assert_eq!(item.lat, 2.0);
        assert_eq!(item.lon, 5.0);
    }

    #[test]
    fn test_tombstone_by_type_removes() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a")], false);

        let mut cancel = update("a");
        cancel.cot_type = Some("b-a-o-can".to_string());
        let diff = store.apply_delta(&cancel, false);

        assert_eq!(diff.removed.len(), 1);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_tombstone_never_inserted() {
        let mut store = ItemStore::new();
        let mut cancel = update("ghost");
        cancel.cot_type = Some("b-a-o-can".to_string());

        let diff = store.apply_snapshot(&[cancel], false);
        assert!(diff.is_empty());
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_forced_delete_ignores_type() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a")], false);

        let diff = store.apply_delta(&update("a"), true);
        assert_eq!(diff.removed.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_unknown_uid_is_noop() {
        let mut store = ItemStore::new();
        let diff = store.apply_delta(&update("nope"), true);
        assert!(diff.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_records_without_uid_are_skipped() {
        let mut store = ItemStore::new();
        let diff = store.apply_snapshot(&[ItemUpdate::default(), update("a")], false);

        assert_eq!(diff.added.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reapply_echoes_matched_uids_as_updated() {
        let mut store = ItemStore::new();
        let batch = [positioned("a", 1.0, 2.0), positioned("b", 3.0, 4.0)];
        store.apply_snapshot(&batch, false);

        let diff = store.apply_snapshot(&batch, false);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.updated.len(), 2);
    }

    #[test]
    fn test_duplicate_uid_in_batch_stays_disjoint() {
        let mut store = ItemStore::new();
        let mut second = update("a");
        second.lat = Some(9.0);
        let diff = store.apply_snapshot(&[update("a"), second], false);

        assert_eq!(diff.added.len(), 1);
        assert!(diff.updated.is_empty());
        assert_eq!(diff.added[0].lat, 9.0);
    }

    #[test]
    fn test_cancel_then_readd_in_one_batch_reports_updated() {
        let mut store = ItemStore::new();
        let mut first = update("a");
        first.cot_type = Some("b-a-o-tbl".to_string());
        store.apply_snapshot(&[first], false);

        let mut cancel = update("a");
        cancel.cot_type = Some("b-a-o-can".to_string());
        let mut readd = update("a");
        readd.lat = Some(5.0);
        let diff = store.apply_snapshot(&[cancel, readd], true);

        // The item survives the batch, so it must not be reported removed.
        assert!(diff.removed.is_empty());
        assert!(diff.added.is_empty());
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].lat, 5.0);
        assert!(store.get("a").is_some());
    }

    #[test]
    fn test_add_then_cancel_of_unknown_uid_reports_nothing() {
        let mut store = ItemStore::new();
        let mut cancel = update("x");
        cancel.cot_type = Some("b-a-o-can".to_string());

        let diff = store.apply_snapshot(&[update("x"), cancel], true);
        assert!(diff.is_empty());
        assert!(store.get("x").is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_upsert_local_reports_added_and_merges_echo() {
        let mut store = ItemStore::new();
        let mut item = Item::new_local(crate::model::Category::Point);
        item.callsign = "MARK-1".to_string();

        let diff = store.upsert_local(&item);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].uid, item.uid);

        // The server echo arrives as a delta and merges into the same entry.
        let mut echo = update(&item.uid);
        echo.lat = Some(7.0);
        let diff = store.apply_delta(&echo, false);
        assert_eq!(diff.updated.len(), 1);

        let resident = store.get(&item.uid).unwrap();
        assert_eq!(resident.callsign, "MARK-1");
        assert_eq!(resident.lat, 7.0);
        assert!(resident.local);
    }

    #[test]
    fn test_uid_uniqueness_across_applies() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a")], false);
        store.apply_delta(&update("a"), false);
        store.apply_snapshot(&[update("a"), update("b")], true);

        let mut uids: Vec<String> = store.all().into_iter().map(|i| i.uid).collect();
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), store.len());
    }

    #[test]
    fn test_revision_only_bumps_on_change() {
        let mut store = ItemStore::new();
        assert_eq!(store.revision(), 0);

        store.apply_snapshot(&[], false);
        assert_eq!(store.revision(), 0);

        store.apply_snapshot(&[update("a")], false);
        assert_eq!(store.revision(), 1);

        store.apply_delta(&update("missing"), true);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut store = ItemStore::new();
        store.apply_snapshot(&[update("a"), update("b")], false);
        let rev = store.revision();

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.revision(), rev + 1);

        // Clearing an empty store is not a change.
        store.clear();
        assert_eq!(store.revision(), rev + 1);
    }
}
