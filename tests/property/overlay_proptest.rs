//! Property-based tests for the cache, the draft overlay and batch planning

use chrono::NaiveDate;
use proptest::prelude::*;
use rollcall::client::cache::AttendanceCache;
use rollcall::client::drafts::DraftOverlay;
use rollcall::client::sync::plan::resolve;
use rollcall::shared::{AttendanceStatus, AttendanceUpdate, CellKey, CellValue};

fn any_key() -> impl Strategy<Value = CellKey> {
    ("s[1-4]", 1u32..=5).prop_map(|(student, day)| {
        CellKey::new(student, NaiveDate::from_ymd_opt(2025, 6, day).unwrap())
    })
}

fn any_value() -> impl Strategy<Value = Option<CellValue>> {
    prop_oneof![
        Just(None),
        Just(Some(CellValue::new(AttendanceStatus::Present, ""))),
        Just(Some(CellValue::new(AttendanceStatus::Absent, ""))),
        Just(Some(CellValue::new(AttendanceStatus::ExcusedPresent, ""))),
        "[a-z]{1,8}".prop_map(|note| Some(CellValue::new(AttendanceStatus::JustifiedAbsent, note))),
    ]
}

fn as_update(key: &CellKey, value: &Option<CellValue>) -> AttendanceUpdate {
    let date = key.date.format("%Y-%m-%d").to_string();
    match value {
        Some(value) => AttendanceUpdate::new(key.student_id.clone(), date, Some(value.status), value.note.clone()),
        None => AttendanceUpdate::clear(key.student_id.clone(), date),
    }
}

proptest! {
    #[test]
    fn test_draft_shadows_cache_until_discarded(
        key in any_key(),
        cached in any_value(),
        drafted in any_value(),
    ) {
        let mut cache = AttendanceCache::new();
        cache.apply_local_mutation(key.clone(), cached.clone(), None);
        let mut drafts = DraftOverlay::new();

        drafts.set_draft(key.clone(), drafted.clone());
        prop_assert_eq!(drafts.effective_value(&key, &cache), drafted);
        prop_assert!(drafts.is_dirty(&key));

        drafts.clear();
        prop_assert_eq!(drafts.effective_value(&key, &cache), cached);
        prop_assert_eq!(drafts.pending_count(), 0);
    }

    #[test]
    fn test_restore_cells_undoes_mutations(
        seed in prop::collection::vec((any_key(), any_value()), 0..12),
        edits in prop::collection::vec((any_key(), any_value()), 1..8),
    ) {
        let mut cache = AttendanceCache::new();
        for (key, value) in seed {
            cache.apply_local_mutation(key, value, None);
        }
        let before = cache.snapshot();
        let captured = cache.capture(edits.iter().map(|(key, _)| key));

        for (key, value) in edits {
            cache.apply_local_mutation(key, value, Some("coach".to_string()));
        }
        cache.restore_cells(captured);

        let mut expected = AttendanceCache::new();
        expected.restore(before);
        prop_assert_eq!(cache.len(), expected.len());
        for record in expected.records() {
            prop_assert_eq!(cache.lookup(&record.key()), Some(record));
        }
    }

    #[test]
    fn test_resolve_keeps_last_update_per_cell(
        edits in prop::collection::vec((any_key(), any_value()), 1..20),
    ) {
        let updates: Vec<AttendanceUpdate> = edits.iter().map(|(key, value)| as_update(key, value)).collect();
        let resolved = resolve(&updates).unwrap();

        for (key, value) in &resolved {
            let last = edits.iter().rev().find(|(candidate, _)| candidate == key).map(|(_, value)| value);
            prop_assert_eq!(Some(value), last);
        }
        let mut keys: Vec<&CellKey> = resolved.iter().map(|(key, _)| key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
    }
}
