//! # Application Context
//!
//! Top-level owner of the session: configuration, the remote store handle,
//! the shared [`SyncEngine`] and the last loaded [`Roster`]. Consumers get the
//! engine by handle instead of reaching for process-wide state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::client::config::Config;
use crate::client::grid::{AttendanceGrid, Schedule};
use crate::client::remote::{Direction, Filter, Query, RemoteError, RemoteStore, RestStore, Table};
use crate::client::reports::{self, AbsenceAlert, DashboardStats};
use crate::client::sync::{SyncEngine, SyncError};
use crate::shared::date::format_day;
use crate::shared::{Class, ClassRow, ConfigError, Student, StudentRow};

/// Classes and students as last read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub classes: Vec<Class>,
    pub students: Vec<Student>,
}

impl Roster {
    /// Build a roster, counting active students per class.
    pub fn new(mut classes: Vec<Class>, students: Vec<Student>) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for student in students.iter().filter(|s| s.is_active()) {
            if let Some(class_id) = student.class_id.as_deref() {
                *counts.entry(class_id).or_default() += 1;
            }
        }
        for class in &mut classes {
            class.student_count = counts.get(class.id.as_str()).copied().unwrap_or(0);
        }
        Self { classes, students }
    }

    pub async fn load(store: &dyn RemoteStore) -> Result<Self, RemoteError> {
        let (classes, students) = futures_util::try_join!(load_classes(store), load_students(store))?;
        Ok(Self::new(classes, students))
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|student| student.id.as_str() == id)
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|class| class.id == id)
    }

    pub fn active_students(&self) -> impl Iterator<Item = &Student> {
        self.students.iter().filter(|student| student.is_active())
    }
}

async fn load_classes(store: &dyn RemoteStore) -> Result<Vec<Class>, RemoteError> {
    let query = Query::new().order_by("name", Direction::Ascending);
    let rows = store.select(Table::Classes, &query).await?;
    Ok(decode_rows::<ClassRow>(rows, "class").into_iter().map(Class::from).collect())
}

async fn load_students(store: &dyn RemoteStore) -> Result<Vec<Student>, RemoteError> {
    let query = Query::new().order_by("name", Direction::Ascending);
    let rows = store.select(Table::Students, &query).await?;
    Ok(decode_rows::<StudentRow>(rows, "student")
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            Student::try_from(row)
                .map_err(|e| tracing::warn!("[ROSTER] skipping student {}: {}", id, e))
                .ok()
        })
        .collect())
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, kind: &str) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("[ROSTER] skipping malformed {} row: {}", kind, e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to load roster: {0}")]
    Roster(#[from] RemoteError),

    #[error(transparent)]
    Attendance(#[from] SyncError),
}

/// Counts of a successful refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub classes: usize,
    pub students: usize,
    pub records: usize,
}

pub struct AppContext {
    config: Config,
    store: Arc<dyn RemoteStore>,
    engine: Arc<SyncEngine>,
    roster: RwLock<Roster>,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<dyn RemoteStore>) -> Self {
        let engine = Arc::new(SyncEngine::new(store.clone(), config.app()));
        Self {
            config,
            store,
            engine,
            roster: RwLock::new(Roster::default()),
        }
    }

    /// Context backed by the hosted store's HTTP API.
    pub fn connect(config: Config) -> Result<Self, ConfigError> {
        let store: Arc<dyn RemoteStore> = Arc::new(RestStore::new(&config)?);
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn engine(&self) -> Arc<SyncEngine> {
        self.engine.clone()
    }

    pub async fn roster(&self) -> Roster {
        self.roster.read().await.clone()
    }

    /// Reload classes, students and attendance together.
    pub async fn refresh(&self) -> Result<RefreshSummary, RefreshError> {
        let roster = async { Roster::load(self.store.as_ref()).await.map_err(RefreshError::from) };
        let attendance = async { self.engine.load_all().await.map_err(RefreshError::from) };
        let (roster, records) = futures_util::try_join!(roster, attendance)?;

        let summary = RefreshSummary {
            classes: roster.classes.len(),
            students: roster.students.len(),
            records: records.len(),
        };
        *self.roster.write().await = roster;
        tracing::info!(
            "[STATE] refreshed {} classes, {} students, {} attendance records",
            summary.classes,
            summary.students,
            summary.records
        );
        Ok(summary)
    }

    /// Swap the session token on the live store. Signing out also forgets
    /// the cached identity, so writes fail with `Unauthenticated`.
    pub async fn set_access_token(&self, token: Option<String>) {
        let signed_out = token.is_none();
        self.store.set_access_token(token).await;
        if signed_out {
            self.engine.set_cached_identity(None).await;
        }
    }

    /// Block a student from the sheet as of `date`.
    pub async fn deactivate_student(&self, student_id: &str, date: NaiveDate) -> Result<(), RemoteError> {
        let patch = json!({ "status": "inativo", "deactivation_date": format_day(date) });
        self.update_student(student_id, patch).await?;
        tracing::info!("[STATE] deactivated student {} as of {}", student_id, date);
        Ok(())
    }

    /// Bring a student back with a new registration date. Absences before
    /// that date no longer count.
    pub async fn reactivate_student(&self, student_id: &str, registration_date: NaiveDate) -> Result<(), RemoteError> {
        let patch = json!({
            "status": "ativo",
            "registration_date": format_day(registration_date),
            "deactivation_date": null,
        });
        self.update_student(student_id, patch).await?;
        tracing::info!("[STATE] reactivated student {} from {}", student_id, registration_date);
        Ok(())
    }

    async fn update_student(&self, student_id: &str, patch: Value) -> Result<(), RemoteError> {
        self.store
            .update(Table::Students, patch, &[Filter::eq("id", student_id)])
            .await?;
        let roster = Roster::load(self.store.as_ref()).await?;
        *self.roster.write().await = roster;
        Ok(())
    }

    /// Grid session over the current roster.
    pub async fn grid(&self, schedule: Schedule, year: i32, month: u32) -> Result<AttendanceGrid, SyncError> {
        AttendanceGrid::new(self.engine(), self.roster().await, schedule, year, month)
    }

    pub async fn absence_alerts(&self) -> Vec<AbsenceAlert> {
        let roster = self.roster.read().await;
        self.engine
            .read(|cache, _| reports::absence_alerts(&roster, cache))
            .await
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        let roster = self.roster.read().await;
        let threshold = self.config.app().critical_absences;
        self.engine
            .read(|cache, _| reports::dashboard_stats(&roster, cache, threshold))
            .await
    }
}
