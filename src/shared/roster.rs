//! Roster types: classes and students as read from the store.
//!
//! The core never writes these tables; it only needs them to decide which
//! cells exist (active students, registration dates) and to aggregate reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::shared::attendance::StudentId;
use crate::shared::date::parse_day;
use crate::shared::error::SharedError;

/// Capacity assumed when the store has none.
pub const DEFAULT_CLASS_CAPACITY: u32 = 25;

/// Enrollment state of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Ativo,
    Inativo,
}

/// Row shape of the `classes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// Row shape of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub registration_date: String,
    #[serde(default)]
    pub deactivation_date: Option<String>,
    #[serde(default)]
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub category: String,
    pub start_time: String,
    pub end_time: String,
    pub day: String,
    pub capacity: u32,
    /// Active students enrolled; filled in by the roster loader.
    pub student_count: usize,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category.unwrap_or_default(),
            start_time: row.start_time.unwrap_or_default(),
            end_time: row.end_time.unwrap_or_default(),
            day: row.day.unwrap_or_default(),
            capacity: row.capacity.unwrap_or(DEFAULT_CLASS_CAPACITY),
            student_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub class_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// First day the student can be marked.
    pub registration_date: NaiveDate,
    pub deactivation_date: Option<NaiveDate>,
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Ativo
    }

    /// Cells dated before registration are locked.
    pub fn is_registered_on(&self, day: NaiveDate) -> bool {
        day >= self.registration_date
    }
}

fn optional_day(value: Option<String>) -> Result<Option<NaiveDate>, SharedError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_day(&raw).map(Some),
        _ => Ok(None),
    }
}

impl TryFrom<StudentRow> for Student {
    type Error = SharedError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StudentId::new(row.id),
            name: row.name,
            class_id: row.class_id.filter(|id| !id.is_empty()),
            birth_date: optional_day(row.birth_date)?,
            registration_date: parse_day(&row.registration_date)?,
            deactivation_date: optional_day(row.deactivation_date)?,
            status: row.status.unwrap_or_default(),
        })
    }
}
