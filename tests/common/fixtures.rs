//! Store, engine and roster fixtures

use std::sync::Arc;

use rollcall::client::remote::{Identity, MemoryStore, Table};
use rollcall::client::state::Roster;
use rollcall::client::sync::SyncEngine;
use rollcall::shared::{AppConfig, ClassRow, Student, StudentRow};
use serde_json::{json, Value};

pub const COACH_ID: &str = "coach-1";

/// Empty store with an authenticated session
pub fn signed_in_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new().with_session(Identity::new(COACH_ID, Some("coach@example.com".into()))))
}

pub fn engine_for(store: &Arc<MemoryStore>) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(store.clone(), &AppConfig::default()))
}

pub fn engine_with(store: &Arc<MemoryStore>, config: &AppConfig) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(store.clone(), config))
}

pub fn class_rows() -> Vec<Value> {
    vec![
        json!({"id": "c1", "name": "Sub-11", "category": "Projeto", "day": "TER/SEX", "capacity": 30}),
        json!({"id": "c2", "name": "Sub-15", "category": "Projeto"}),
    ]
}

pub fn student_rows() -> Vec<Value> {
    vec![
        json!({"id": "s1", "name": "Davi", "class_id": "c1", "registration_date": "2025-01-15", "status": "ativo"}),
        json!({"id": "s2", "name": "Alice", "class_id": "c1", "registration_date": "2025-06-06", "status": "ativo"}),
        json!({"id": "s3", "name": "Bento", "class_id": "c2", "registration_date": "2025-02-01T00:00:00+00:00"}),
        json!({"id": "s4", "name": "Clara", "class_id": "c1", "registration_date": "2025-01-15", "status": "inativo", "deactivation_date": "2025-05-30"}),
    ]
}

/// Store seeded with two classes and four students
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = signed_in_store();
    store.seed(Table::Classes, class_rows());
    store.seed(Table::Students, student_rows());
    store
}

/// The same roster, built without a store
pub fn roster() -> Roster {
    let classes = class_rows()
        .into_iter()
        .map(|row| serde_json::from_value::<ClassRow>(row).expect("class row").into())
        .collect();
    let students = student_rows()
        .into_iter()
        .map(|row| {
            let row: StudentRow = serde_json::from_value(row).expect("student row");
            Student::try_from(row).expect("student")
        })
        .collect();
    Roster::new(classes, students)
}
