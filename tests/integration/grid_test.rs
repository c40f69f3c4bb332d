//! Grid sessions driven through the application context

use std::sync::Arc;

use chrono::NaiveDate;
use rollcall::client::grid::{AttendanceGrid, EditMode, Schedule, ToggleOutcome};
use rollcall::client::remote::{RemoteError, StoreOp};
use rollcall::client::{AppContext, Config};
use rollcall::shared::{AttendanceStatus, StudentId};

use crate::common::{engine_for, roster, seeded_store, signed_in_store};

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[tokio::test]
async fn test_context_grid_after_refresh() {
    let store = seeded_store();
    let context = AppContext::new(Config::new(), store);
    crate::assert_ok!(context.refresh().await);

    let grid = crate::assert_ok!(context.grid(Schedule::Projeto, 2025, 6).await);
    let names: Vec<&str> = grid.visible_students().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bento", "Davi"]);

    // June 2025: Saturday the 7th is a sheet day, Alice registered on the 6th
    let saturday = day(2025, 6, 7);
    assert!(grid.attendance_days().iter().any(|d| d.date == saturday && d.label == "SÁB"));
    assert_eq!(crate::assert_ok!(grid.mark_all(saturday, AttendanceStatus::Present).await), 3);
    assert_eq!(grid.day_presence_count(saturday).await, 3);

    let alerts = context.absence_alerts().await;
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn test_mark_all_excludes_late_registrations() {
    let store = signed_in_store();
    let grid = crate::assert_ok!(AttendanceGrid::new(engine_for(&store), roster(), Schedule::Projeto, 2025, 6));

    let before_alice = day(2025, 6, 3);
    assert_eq!(crate::assert_ok!(grid.mark_all(before_alice, AttendanceStatus::Absent).await), 2);
    assert!(grid.cell(&StudentId::new("s2"), before_alice).await.is_none());
    assert_eq!(grid.student_absences(&StudentId::new("s1")).await, 1);
}

#[tokio::test]
async fn test_failed_toggle_keeps_previous_status() {
    let store = signed_in_store();
    let mut grid = crate::assert_ok!(AttendanceGrid::new(engine_for(&store), roster(), Schedule::Arena, 2025, 6));
    let davi = StudentId::new("s1");
    let saturday = day(2025, 6, 14);

    assert_eq!(
        crate::assert_ok!(grid.toggle(&davi, saturday).await),
        ToggleOutcome::Applied(Some(AttendanceStatus::Absent))
    );

    store.fail_next(StoreOp::Upsert, RemoteError::transport("offline"));
    crate::assert_err!(grid.toggle(&davi, saturday).await);
    assert_eq!(
        grid.cell(&davi, saturday).await.map(|value| value.status),
        Some(AttendanceStatus::Absent)
    );
}

#[tokio::test]
async fn test_justification_prompt_in_draft_mode() {
    let store = signed_in_store();
    let mut grid = crate::assert_ok!(AttendanceGrid::new(engine_for(&store), roster(), Schedule::Arena, 2025, 6))
        .with_mode(EditMode::Draft);
    let davi = StudentId::new("s1");
    let saturday = day(2025, 6, 21);

    for _ in 0..3 {
        crate::assert_ok!(grid.toggle(&davi, saturday).await);
    }
    let prompt = match crate::assert_ok!(grid.toggle(&davi, saturday).await) {
        ToggleOutcome::NeedsJustification(prompt) => prompt,
        other => panic!("expected prompt, got {:?}", other),
    };
    assert_eq!(prompt.student_name, "Davi");
    assert_eq!(prompt.note, "");

    crate::assert_ok!(grid.commit_justification("viagem escolar").await);
    assert_eq!(grid.pending_count().await, 1);
    assert!(store.attendance_rows().is_empty());

    let outcome = crate::assert_ok!(grid.save().await);
    assert!(outcome.summary().is_some());
    let rows = store.attendance_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AttendanceStatus::JustifiedAbsent);
    assert_eq!(rows[0].note.as_deref(), Some("viagem escolar"));
    assert_eq!(grid.pending_count().await, 0);
}

#[tokio::test]
async fn test_class_filter_change_discards_drafts() {
    let store = signed_in_store();
    let engine = engine_for(&store);
    let mut grid = crate::assert_ok!(AttendanceGrid::new(Arc::clone(&engine), roster(), Schedule::Arena, 2025, 6))
        .with_mode(EditMode::Draft);

    crate::assert_ok!(grid.mark_all(day(2025, 6, 7), AttendanceStatus::Present).await);
    assert_eq!(engine.pending_count().await, 3);

    grid.select_class(Some("c1".to_string())).await;
    assert_eq!(engine.pending_count().await, 0);
    assert_eq!(grid.visible_students().len(), 2);
    assert!(store.calls().is_empty());
}
