//! End-to-end reconciliation tests
//!
//! Drives the store the way the transport does: an initial full snapshot,
//! push deltas decoded from raw websocket JSON, and follow-up snapshots.

use tacstore::model::{Category, Item, ItemUpdate};
use tacstore::{apply_event, ItemStore, WsMessage};

fn update_json(json: &str) -> ItemUpdate {
    serde_json::from_str(json).expect("valid item json")
}

#[test]
fn test_snapshot_delta_delete_scenario() {
    let mut store = ItemStore::new();

    // Full snapshot with one unit.
    let diff = store.apply_snapshot(
        &[update_json(
            r#"{"uid":"u1","category":"unit","lat":10.0,"lon":20.0}"#,
        )],
        false,
    );
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.added[0].uid, "u1");
    assert_eq!(store.len(), 1);

    // Partial delta moves it; unmentioned fields survive.
    let diff = store.apply_delta(&update_json(r#"{"uid":"u1","lat":11.0}"#), false);
    assert_eq!(diff.updated.len(), 1);
    assert_eq!(diff.updated[0].lat, 11.0);
    assert_eq!(diff.updated[0].lon, 20.0);

    // Forced delete empties the store.
    let diff = store.apply_delta(&update_json(r#"{"uid":"u1"}"#), true);
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(store.len(), 0);
}

#[test]
fn test_websocket_frames_drive_the_store() {
    let mut store = ItemStore::new();

    let frames = [
        r#"{"type":"unit","unit":{"uid":"a","category":"unit","callsign":"ALPHA","lat":1.0}}"#,
        r#"{"type":"unit","unit":{"uid":"b","category":"point","lat":2.0}}"#,
        r#"{"type":"chat","chat_msg":{"message_id":"m1","from":"ALPHA","text":"hi"}}"#,
        r#"{"type":"unit","unit":{"uid":"a","lat":1.5}}"#,
        r#"{"type":"delete","uid":"b"}"#,
    ];

    for frame in frames {
        let msg: WsMessage = serde_json::from_str(frame).expect("valid frame");
        apply_event(&mut store, msg.into_event());
    }

    assert_eq!(store.len(), 1);
    let a = store.get("a").expect("a is resident");
    assert_eq!(a.callsign, "ALPHA");
    assert_eq!(a.lat, 1.5);
    assert!(store.get("b").is_none());
}

#[test]
fn test_full_snapshot_reconciles_against_push_state() {
    let mut store = ItemStore::new();

    // Push channel delivered three items.
    for uid in ["a", "b", "c"] {
        store.apply_delta(&ItemUpdate::for_uid(uid), false);
    }

    // A later full snapshot only knows about two of them.
    let diff = store.apply_snapshot(
        &[ItemUpdate::for_uid("a"), ItemUpdate::for_uid("c")],
        false,
    );
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(diff.removed[0].uid, "b");
    assert_eq!(diff.updated.len(), 2);
    assert!(diff.added.is_empty());
}

#[test]
fn test_cancel_sentinel_in_snapshot_removes_alarm() {
    let mut store = ItemStore::new();
    store.apply_snapshot(
        &[update_json(
            r#"{"uid":"alert-1","category":"alarm","type":"b-a-o-tbl"}"#,
        )],
        false,
    );

    // The cancel arrives inside a partial batch together with other items.
    let diff = store.apply_snapshot(
        &[
            update_json(r#"{"uid":"alert-1","type":"b-a-o-can"}"#),
            update_json(r#"{"uid":"u2","category":"unit"}"#),
        ],
        true,
    );
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(diff.added.len(), 1);
    assert!(store.get("alert-1").is_none());
    assert!(store.get("u2").is_some());
}

#[test]
fn test_diff_arrays_stay_disjoint_across_randomized_batches() {
    let mut store = ItemStore::new();
    let uids = ["a", "b", "c", "d"];

    let batches: Vec<(Vec<ItemUpdate>, bool)> = vec![
        (
            uids.iter().map(|u| ItemUpdate::for_uid(*u)).collect(),
            false,
        ),
        (
            vec![
                ItemUpdate::for_uid("a"),
                ItemUpdate::for_uid("a"),
                update_json(r#"{"uid":"b","_delete":true}"#),
            ],
            true,
        ),
        (
            vec![ItemUpdate::for_uid("c"), ItemUpdate::for_uid("e")],
            false,
        ),
    ];

    for (records, partial) in batches {
        let diff = store.apply_snapshot(&records, partial);

        let mut all_uids: Vec<&str> = diff
            .added
            .iter()
            .chain(diff.updated.iter())
            .chain(diff.removed.iter())
            .map(|i| i.uid.as_str())
            .collect();
        all_uids.sort_unstable();
        let before = all_uids.len();
        all_uids.dedup();
        assert_eq!(before, all_uids.len(), "diff arrays must not share uids");
    }
}

#[test]
fn test_roundtrip_item_serialization_feeds_back_as_update() {
    // A locally-created item posted to the server comes back as a patch.
    let mut item = Item::new_local(Category::Unit);
    item.callsign = "BRAVO".to_string();
    item.lat = 42.0;

    let json = serde_json::to_string(&item).expect("item serializes");
    let echoed: ItemUpdate = serde_json::from_str(&json).expect("echo parses");

    let mut store = ItemStore::new();
    let diff = store.apply_delta(&echoed, false);
    assert_eq!(diff.added.len(), 1);

    let resident = store.get(&item.uid).expect("resident");
    assert_eq!(resident.callsign, "BRAVO");
    assert_eq!(resident.lat, 42.0);
    assert!(resident.local);
}

#[test]
fn test_revision_visible_to_pollers() {
    let mut store = ItemStore::new();
    let r0 = store.revision();

    store.apply_snapshot(&[ItemUpdate::for_uid("a")], false);
    let r1 = store.revision();
    assert!(r1 > r0);

    // No-op applies leave the counter alone.
    store.apply_snapshot(&[], true);
    store.apply_delta(&ItemUpdate::for_uid("ghost"), true);
    assert_eq!(store.revision(), r1);
}
