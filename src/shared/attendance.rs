//! Attendance domain types
//!
//! One [`AttendanceRecord`] exists per `(student, day)` pair. The pair is the
//! natural key ([`CellKey`]) enforced by the store's conflict target and
//! mirrored by the in-memory cache. Absence of a record means "unmarked".

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::shared::date::{format_day, parse_day};
use crate::shared::error::SharedError;

/// Attendance status codes as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// `P`
    #[serde(rename = "P")]
    Present,
    /// `F` (falta)
    #[serde(rename = "F")]
    Absent,
    /// `A`: present but flagged
    #[serde(rename = "A")]
    ExcusedPresent,
    /// `J`: absent with a written justification
    #[serde(rename = "J")]
    JustifiedAbsent,
}

/// Order in which repeated toggles walk through the states of a cell.
const STATUS_CYCLE: [Option<AttendanceStatus>; 5] = [
    None,
    Some(AttendanceStatus::Absent),
    Some(AttendanceStatus::Present),
    Some(AttendanceStatus::ExcusedPresent),
    Some(AttendanceStatus::JustifiedAbsent),
];

impl AttendanceStatus {
    /// Single-letter wire code
    pub fn code(self) -> &'static str {
        match self {
            Self::Present => "P",
            Self::Absent => "F",
            Self::ExcusedPresent => "A",
            Self::JustifiedAbsent => "J",
        }
    }

    /// Counts towards the day's presence total (`P` or `A`)
    pub fn counts_as_presence(self) -> bool {
        matches!(self, Self::Present | Self::ExcusedPresent)
    }

    /// Counts towards a student's absences (`F` or `J`)
    pub fn counts_as_absence(self) -> bool {
        matches!(self, Self::Absent | Self::JustifiedAbsent)
    }

    /// Only justified absences carry a note
    pub fn requires_note(self) -> bool {
        matches!(self, Self::JustifiedAbsent)
    }

    /// Next state of a cell on toggle.
    ///
    /// With `include_justified` off the cycle skips `J` and wraps straight
    /// from `A` back to unmarked.
    pub fn next_in_cycle(current: Option<Self>, include_justified: bool) -> Option<Self> {
        let position = STATUS_CYCLE
            .iter()
            .position(|candidate| *candidate == current)
            .unwrap_or(0);
        let next = STATUS_CYCLE[(position + 1) % STATUS_CYCLE.len()];
        match next {
            Some(Self::JustifiedAbsent) if !include_justified => None,
            other => other,
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = SharedError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim() {
            "P" => Ok(Self::Present),
            "F" => Ok(Self::Absent),
            "A" => Ok(Self::ExcusedPresent),
            "J" => Ok(Self::JustifiedAbsent),
            other => Err(SharedError::validation(
                "status",
                format!("unknown status code '{}'", other),
            )),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Opaque student identifier owned by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StudentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StudentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `(student, day)` address of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub student_id: StudentId,
    pub date: NaiveDate,
}

impl CellKey {
    pub fn new(student_id: impl Into<StudentId>, date: NaiveDate) -> Self {
        Self {
            student_id: student_id.into(),
            date,
        }
    }

    /// Build a key from a raw date, normalizing it first.
    pub fn parse(student_id: impl Into<StudentId>, date: &str) -> Result<Self, SharedError> {
        Ok(Self::new(student_id, parse_day(date)?))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.student_id, format_day(self.date))
    }
}

/// Status and note of a marked cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellValue {
    pub status: AttendanceStatus,
    pub note: String,
}

impl CellValue {
    /// The note is kept only for justified absences.
    pub fn new(status: AttendanceStatus, note: impl Into<String>) -> Self {
        let note = if status.requires_note() {
            note.into()
        } else {
            String::new()
        };
        Self { status, note }
    }
}

/// A cached attendance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: String,
    /// Session that last wrote the record; audit only.
    pub author_id: Option<String>,
}

impl AttendanceRecord {
    pub fn new(key: CellKey, value: CellValue, author_id: Option<String>) -> Self {
        Self {
            student_id: key.student_id,
            date: key.date,
            status: value.status,
            note: value.note,
            author_id,
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.student_id.clone(), self.date)
    }

    pub fn value(&self) -> CellValue {
        CellValue {
            status: self.status,
            note: self.note.clone(),
        }
    }

    /// Convert a store row, normalizing its date.
    pub fn from_row(row: AttendanceRow) -> Result<Self, SharedError> {
        let date = parse_day(&row.attendance_date)?;
        Ok(Self {
            student_id: StudentId::new(row.student_id),
            date,
            status: row.status,
            note: row.note.unwrap_or_default(),
            author_id: row.user_id,
        })
    }

    pub fn to_row(&self) -> AttendanceRow {
        AttendanceRow {
            student_id: self.student_id.as_str().to_string(),
            attendance_date: format_day(self.date),
            status: self.status,
            note: Some(self.note.clone()),
            user_id: self.author_id.clone(),
        }
    }
}

/// Row shape of the `attendance` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRow {
    pub student_id: String,
    pub attendance_date: String,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// One requested change to a cell. `status: None` clears the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    pub student_id: StudentId,
    /// Raw date as supplied by the caller; normalized on validation.
    pub date: String,
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub note: String,
}

impl AttendanceUpdate {
    pub fn new(
        student_id: impl Into<StudentId>,
        date: impl Into<String>,
        status: Option<AttendanceStatus>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            date: date.into(),
            status,
            note: note.into(),
        }
    }

    pub fn mark(
        student_id: impl Into<StudentId>,
        date: impl Into<String>,
        status: AttendanceStatus,
    ) -> Self {
        Self::new(student_id, date, Some(status), "")
    }

    pub fn justify(
        student_id: impl Into<StudentId>,
        date: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self::new(student_id, date, Some(AttendanceStatus::JustifiedAbsent), note)
    }

    pub fn clear(student_id: impl Into<StudentId>, date: impl Into<String>) -> Self {
        Self::new(student_id, date, None, "")
    }

    pub fn key(&self) -> Result<CellKey, SharedError> {
        CellKey::parse(self.student_id.clone(), &self.date)
    }

    /// Resolve the cell key and target value, rejecting malformed dates and
    /// justified absences without a note.
    pub fn validate(&self) -> Result<(CellKey, Option<CellValue>), SharedError> {
        let key = self.key()?;
        let value = match self.status {
            Some(status) if status.requires_note() && self.note.trim().is_empty() => {
                return Err(SharedError::validation(
                    "note",
                    format!("justified absence for {} needs a note", key),
                ));
            }
            Some(status) => Some(CellValue::new(status, self.note.clone())),
            None => None,
        };
        Ok((key, value))
    }
}
