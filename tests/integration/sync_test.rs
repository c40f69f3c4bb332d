//! Sync engine scenarios against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rollcall::client::remote::{Filter, MemoryStore, RemoteCall, RemoteError, StoreOp, Table};
use rollcall::client::sync::{SyncError, SyncOutcome};
use rollcall::shared::{AppConfig, AttendanceStatus, AttendanceUpdate, CellKey, CellValue};
use serde_json::json;

use crate::common::{engine_for, engine_with, signed_in_store};

#[tokio::test]
async fn test_batch_end_to_end_and_rollback() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    let update = AttendanceUpdate::mark("S1", "2025-06-07T00:00:00", AttendanceStatus::Present);

    crate::assert_cell!(engine, "S1", "2025-06-07", None);
    store.fail_next(StoreOp::Upsert, RemoteError::transport("connection reset"));
    let error = engine.sync_batch(std::slice::from_ref(&update)).await.unwrap_err();
    crate::assert_contains!(error.user_message(), "ERRO AO SALVAR EM LOTE");
    crate::assert_cell!(engine, "S1", "2025-06-07", None);

    crate::assert_ok!(engine.sync_batch(&[update]).await);
    let key = CellKey::parse("S1", "2025-06-07").unwrap();
    assert_eq!(
        engine.lookup(&key).await.map(|record| record.value()),
        Some(CellValue::new(AttendanceStatus::Present, ""))
    );
}

#[tokio::test]
async fn test_sync_one_is_idempotent() {
    let store = signed_in_store();
    let engine = engine_for(&store);

    for _ in 0..2 {
        crate::assert_ok!(
            engine
                .sync_one(AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present))
                .await
        );
    }

    let rows = store.attendance_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AttendanceStatus::Present);
    crate::assert_cell!(engine, "s1", "2025-06-07", Some(AttendanceStatus::Present));
}

#[tokio::test]
async fn test_rollback_restores_exact_prior_value() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    crate::assert_ok!(engine.sync_one(AttendanceUpdate::justify("s1", "2025-06-07", "atestado")).await);
    let key = CellKey::parse("s1", "2025-06-07").unwrap();
    let before = engine.lookup(&key).await;

    store.fail_next(StoreOp::Upsert, RemoteError::rejected(500, "internal error"));
    crate::assert_err!(
        engine
            .sync_one(AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present))
            .await,
        SyncError::RemoteWriteFailure { .. }
    );

    assert_eq!(engine.lookup(&key).await, before);
}

#[tokio::test]
async fn test_batch_deletes_before_upsert_on_same_day() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    crate::assert_ok!(
        engine
            .sync_batch(&[
                AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Absent),
                AttendanceUpdate::mark("s2", "2025-06-07", AttendanceStatus::Absent),
            ])
            .await
    );
    store.clear_calls();

    crate::assert_ok!(
        engine
            .sync_batch(&[
                AttendanceUpdate::clear("s1", "2025-06-07"),
                AttendanceUpdate::mark("s2", "2025-06-07", AttendanceStatus::Present),
            ])
            .await
    );

    crate::assert_cell!(engine, "s1", "2025-06-07", None);
    crate::assert_cell!(engine, "s2", "2025-06-07", Some(AttendanceStatus::Present));

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        RemoteCall::Delete {
            table: Table::Attendance,
            filters: vec![
                Filter::eq("attendance_date", "2025-06-07"),
                Filter::is_in("student_id", ["s1"]),
            ],
        }
    );
    match &calls[1] {
        RemoteCall::Upsert { rows, on_conflict, .. } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(on_conflict, &vec!["student_id".to_string(), "attendance_date".to_string()]);
        }
        other => panic!("expected upsert, got {:?}", other),
    }

    let rows = store.attendance_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_id, "s2");
}

#[tokio::test]
async fn test_delete_failure_aborts_before_upsert() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    store.fail_next(StoreOp::Delete, RemoteError::transport("timeout"));

    crate::assert_err!(
        engine
            .sync_batch(&[
                AttendanceUpdate::clear("s1", "2025-06-07"),
                AttendanceUpdate::mark("s2", "2025-06-07", AttendanceStatus::Present),
            ])
            .await
    );

    assert!(store
        .calls()
        .iter()
        .all(|call| !matches!(call, RemoteCall::Upsert { .. })));
    crate::assert_cell!(engine, "s2", "2025-06-07", None);
}

#[tokio::test]
async fn test_unauthenticated_batch_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_for(&store);

    crate::assert_err!(
        engine
            .sync_batch(&[AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present)])
            .await,
        SyncError::Unauthenticated
    );
    crate::assert_cell!(engine, "s1", "2025-06-07", None);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_disjoint_cells_sync_concurrently() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    store.hold_writes();

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .sync_one(AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present))
                .await
        })
    };
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .sync_one(AttendanceUpdate::mark("s2", "2025-06-07", AttendanceStatus::Absent))
                .await
        })
    };

    let s1 = CellKey::parse("s1", "2025-06-07").unwrap();
    let s2 = CellKey::parse("s2", "2025-06-07").unwrap();
    while !(engine.is_cell_busy(&s1) && engine.is_cell_busy(&s2)) {
        tokio::task::yield_now().await;
    }
    // Both optimistic values are visible before either write resolves.
    crate::assert_cell!(engine, "s1", "2025-06-07", Some(AttendanceStatus::Present));
    crate::assert_cell!(engine, "s2", "2025-06-07", Some(AttendanceStatus::Absent));

    store.fail_next(StoreOp::Upsert, RemoteError::rejected(500, "boom"));
    store.release_writes();
    let results = (first.await.unwrap(), second.await.unwrap());

    // Exactly one write failed; only its own cell rolled back.
    assert!(results.0.is_ok() != results.1.is_ok());
    let survivors = store.attendance_rows();
    assert_eq!(survivors.len(), 1);
    let survivor = &survivors[0];
    crate::assert_cell!(engine, survivor.student_id.as_str(), "2025-06-07", Some(survivor.status));
    let failed = if survivor.student_id == "s1" { "s2" } else { "s1" };
    crate::assert_cell!(engine, failed, "2025-06-07", None);
}

#[tokio::test]
async fn test_batch_locks_out_single_cell_edits() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    store.hold_writes();

    let batch = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .sync_batch(&[AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present)])
                .await
        })
    };
    while !engine.is_batch_in_flight() {
        tokio::task::yield_now().await;
    }

    crate::assert_err!(
        engine
            .sync_one(AttendanceUpdate::mark("s9", "2025-06-10", AttendanceStatus::Present))
            .await,
        SyncError::Busy { key: None }
    );
    crate::assert_err!(
        engine
            .set_draft(AttendanceUpdate::mark("s9", "2025-06-10", AttendanceStatus::Present))
            .await,
        SyncError::Busy { .. }
    );

    store.release_writes();
    crate::assert_ok!(batch.await.unwrap());
    assert!(!engine.is_batch_in_flight());
}

#[tokio::test]
async fn test_merge_window_masks_stale_reload() {
    let store = signed_in_store();
    let engine = engine_with(&store, &AppConfig::builder().merge_window(Duration::from_secs(60)).build().unwrap());
    crate::assert_ok!(
        engine
            .sync_batch(&[AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present)])
            .await
    );

    // A lagging replica still serves the old row.
    store.seed(
        Table::Attendance,
        vec![json!({"student_id": "s1", "attendance_date": "2025-06-07", "status": "F", "note": ""})],
    );
    let reloaded = crate::assert_ok!(engine.load_all().await);
    assert!(reloaded
        .iter()
        .all(|record| record.status == AttendanceStatus::Present));
    crate::assert_cell!(engine, "s1", "2025-06-07", Some(AttendanceStatus::Present));
}

#[tokio::test]
async fn test_no_merge_window_trusts_store() {
    let store = signed_in_store();
    let engine = engine_with(&store, &AppConfig::builder().merge_window(Duration::ZERO).build().unwrap());
    crate::assert_ok!(
        engine
            .sync_one(AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present))
            .await
    );

    store.seed(
        Table::Attendance,
        vec![json!({"student_id": "s2", "attendance_date": "2025-06-07", "status": "F"})],
    );
    crate::assert_ok!(engine.load_all().await);
    crate::assert_cell!(engine, "s1", "2025-06-07", Some(AttendanceStatus::Present));
    crate::assert_cell!(engine, "s2", "2025-06-07", Some(AttendanceStatus::Absent));
}

#[tokio::test]
async fn test_load_all_respects_row_limit() {
    let store = signed_in_store();
    store.seed(
        Table::Attendance,
        (1..=9).map(|day| {
            json!({"student_id": "s1", "attendance_date": format!("2025-06-0{}", day), "status": "P"})
        }),
    );
    let engine = engine_with(&store, &AppConfig::builder().attendance_row_limit(3).build().unwrap());

    let records = crate::assert_ok!(engine.load_all().await);
    assert_eq!(records.len(), 3);
    // Newest rows are kept.
    crate::assert_cell!(engine, "s1", "2025-06-09", Some(AttendanceStatus::Present));
    crate::assert_cell!(engine, "s1", "2025-06-01", None);
}

#[tokio::test]
async fn test_commit_drafts_reports_counts() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    crate::assert_ok!(engine.set_draft(AttendanceUpdate::mark("s1", "2025-06-07", AttendanceStatus::Present)).await);
    crate::assert_ok!(engine.set_draft(AttendanceUpdate::clear("s2", "2025-06-07")).await);

    let outcome = crate::assert_ok!(engine.commit_drafts().await);
    let summary = outcome.summary().expect("committed");
    assert_eq!((summary.upserted, summary.deleted), (1, 1));
    assert_eq!(engine.pending_count().await, 0);

    assert_eq!(crate::assert_ok!(engine.commit_drafts().await), SyncOutcome::Skipped);
}
