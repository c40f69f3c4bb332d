//! # Attendance Grid
//!
//! Editing session over a student×day grid for one month. Wraps the
//! [`SyncEngine`] with the rules of the attendance sheet:
//!
//! - which days appear (the schedule's weekdays within the month)
//! - which students appear (active, optional class filter, sorted by name)
//! - locked cells (days before a student's registration)
//! - the toggle cycle `unmarked → F → P → A → J → unmarked`, where entering
//!   `J` opens a justification prompt instead of writing
//! - marking a whole day at once
//!
//! Writes go straight through the engine in [`EditMode::Immediate`], or into
//! the draft overlay in [`EditMode::Draft`] until [`AttendanceGrid::save`].

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::client::state::Roster;
use crate::client::sync::{SyncEngine, SyncError, SyncOutcome};
use crate::shared::date::{days_of_month, format_day};
use crate::shared::{AttendanceStatus, AttendanceUpdate, CellKey, CellValue, SharedError, Student, StudentId};

const WEEK_DAYS_SHORT: [&str; 7] = ["DOM", "SEG", "TER", "QUA", "QUI", "SEX", "SÁB"];

/// Which weekdays a sheet covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Saturdays
    Arena,
    /// Tuesdays, Fridays and Saturdays
    Projeto,
}

impl Schedule {
    /// Pick the schedule from a sheet title.
    pub fn from_title(title: &str) -> Self {
        if title.to_lowercase().contains("projeto") {
            Self::Projeto
        } else {
            Self::Arena
        }
    }

    pub fn weekdays(self) -> &'static [Weekday] {
        match self {
            Self::Arena => &[Weekday::Sat],
            Self::Projeto => &[Weekday::Tue, Weekday::Fri, Weekday::Sat],
        }
    }

    pub fn includes(self, day: NaiveDate) -> bool {
        self.weekdays().contains(&day.weekday())
    }
}

/// One column of the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    /// Short Portuguese weekday, e.g. `SÁB`
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Immediate,
    Draft,
}

/// A pending request for a justification note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JustificationPrompt {
    pub key: CellKey,
    pub student_name: String,
    /// Pre-filled with the cell's current note
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The cell moved to this status (`None` = unmarked)
    Applied(Option<AttendanceStatus>),
    /// The day is before the student's registration
    Locked,
    /// Nothing written until the prompt is committed or cancelled
    NeedsJustification(JustificationPrompt),
}

pub struct AttendanceGrid {
    engine: Arc<SyncEngine>,
    roster: Roster,
    schedule: Schedule,
    year: i32,
    month: u32,
    class_filter: Option<String>,
    mode: EditMode,
    justification_enabled: bool,
    prompt: Option<JustificationPrompt>,
}

fn check_month(year: i32, month: u32) -> Result<(), SharedError> {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(_) => Ok(()),
        None => Err(SharedError::validation(
            "month",
            format!("no such month {}-{:02}", year, month),
        )),
    }
}

impl AttendanceGrid {
    pub fn new(
        engine: Arc<SyncEngine>,
        roster: Roster,
        schedule: Schedule,
        year: i32,
        month: u32,
    ) -> Result<Self, SyncError> {
        check_month(year, month)?;
        Ok(Self {
            engine,
            roster,
            schedule,
            year,
            month,
            class_filter: None,
            mode: EditMode::default(),
            justification_enabled: true,
            prompt: None,
        })
    }

    pub fn with_mode(mut self, mode: EditMode) -> Self {
        self.mode = mode;
        self
    }

    /// With justification off the toggle cycle skips `J`.
    pub fn with_justification(mut self, enabled: bool) -> Self {
        self.justification_enabled = enabled;
        self
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn class_filter(&self) -> Option<&str> {
        self.class_filter.as_deref()
    }

    pub fn set_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }

    // ===== Context changes =====

    /// Switch month; pending drafts belong to the old view and are dropped.
    pub async fn select_month(&mut self, year: i32, month: u32) -> Result<(), SyncError> {
        check_month(year, month)?;
        if (year, month) != (self.year, self.month) {
            self.year = year;
            self.month = month;
            self.reset_context().await;
        }
        Ok(())
    }

    pub async fn select_class(&mut self, class_id: Option<String>) {
        if class_id != self.class_filter {
            self.class_filter = class_id;
            self.reset_context().await;
        }
    }

    async fn reset_context(&mut self) {
        self.prompt = None;
        self.engine.clear_drafts().await;
    }

    // ===== Layout =====

    pub fn attendance_days(&self) -> Vec<AttendanceDay> {
        days_of_month(self.year, self.month)
            .into_iter()
            .filter(|day| self.schedule.includes(*day))
            .map(|date| AttendanceDay {
                date,
                label: WEEK_DAYS_SHORT[date.weekday().num_days_from_sunday() as usize],
            })
            .collect()
    }

    pub fn visible_students(&self) -> Vec<&Student> {
        let mut students: Vec<&Student> = self
            .roster
            .active_students()
            .filter(|student| match &self.class_filter {
                Some(class_id) => student.class_id.as_deref() == Some(class_id.as_str()),
                None => true,
            })
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        students
    }

    fn student(&self, id: &StudentId) -> Result<&Student, SyncError> {
        self.roster.student(id.as_str()).ok_or_else(|| {
            SyncError::InvalidUpdate(SharedError::validation(
                "student_id",
                format!("unknown student {}", id),
            ))
        })
    }

    pub fn is_locked(&self, student: &Student, date: NaiveDate) -> bool {
        !student.is_registered_on(date)
    }

    // ===== Reads =====

    pub async fn cell(&self, student_id: &StudentId, date: NaiveDate) -> Option<CellValue> {
        self.engine
            .effective_value(&CellKey::new(student_id.clone(), date))
            .await
    }

    pub async fn is_dirty(&self, student_id: &StudentId, date: NaiveDate) -> bool {
        self.engine
            .is_dirty(&CellKey::new(student_id.clone(), date))
            .await
    }

    pub async fn pending_count(&self) -> usize {
        self.engine.pending_count().await
    }

    /// Visible students counted present (`P` or `A`) on `date`.
    pub async fn day_presence_count(&self, date: NaiveDate) -> usize {
        let keys: Vec<CellKey> = self
            .visible_students()
            .into_iter()
            .map(|student| CellKey::new(student.id.clone(), date))
            .collect();
        self.engine
            .read(|cache, drafts| {
                keys.iter()
                    .filter_map(|key| drafts.effective_value(key, cache))
                    .filter(|value| value.status.counts_as_presence())
                    .count()
            })
            .await
    }

    /// Names of visible students present on `date`.
    pub async fn present_on(&self, date: NaiveDate) -> Vec<String> {
        let students = self.visible_students();
        self.engine
            .read(|cache, drafts| {
                students
                    .iter()
                    .filter(|student| {
                        drafts
                            .effective_value(&CellKey::new(student.id.clone(), date), cache)
                            .is_some_and(|value| value.status.counts_as_presence())
                    })
                    .map(|student| student.name.clone())
                    .collect()
            })
            .await
    }

    /// Absences (`F` or `J`) of a student over this month's sheet days.
    pub async fn student_absences(&self, student_id: &StudentId) -> usize {
        let keys: Vec<CellKey> = self
            .attendance_days()
            .into_iter()
            .map(|day| CellKey::new(student_id.clone(), day.date))
            .collect();
        self.engine
            .read(|cache, drafts| {
                keys.iter()
                    .filter_map(|key| drafts.effective_value(key, cache))
                    .filter(|value| value.status.counts_as_absence())
                    .count()
            })
            .await
    }

    // ===== Writes =====

    async fn write(&self, update: AttendanceUpdate) -> Result<(), SyncError> {
        match self.mode {
            EditMode::Immediate => self.engine.sync_one(update).await.map(|_| ()),
            EditMode::Draft => self.engine.set_draft(update).await,
        }
    }

    /// Advance a cell to the next status of the cycle.
    pub async fn toggle(&mut self, student_id: &StudentId, date: NaiveDate) -> Result<ToggleOutcome, SyncError> {
        let student = self.student(student_id)?;
        if self.is_locked(student, date) {
            return Ok(ToggleOutcome::Locked);
        }
        let student_name = student.name.clone();

        let key = CellKey::new(student_id.clone(), date);
        self.engine.ensure_idle(&key)?;

        let current = self.engine.effective_value(&key).await;
        let note = current.as_ref().map(|value| value.note.clone()).unwrap_or_default();
        let next = AttendanceStatus::next_in_cycle(
            current.as_ref().map(|value| value.status),
            self.justification_enabled,
        );

        if next == Some(AttendanceStatus::JustifiedAbsent) {
            let prompt = JustificationPrompt { key, student_name, note };
            tracing::debug!("[GRID] justification requested for {}", prompt.key);
            self.prompt = Some(prompt.clone());
            return Ok(ToggleOutcome::NeedsJustification(prompt));
        }

        let update = AttendanceUpdate::new(student_id.clone(), format_day(date), next, note);
        self.write(update).await?;
        Ok(ToggleOutcome::Applied(next))
    }

    pub fn pending_justification(&self) -> Option<&JustificationPrompt> {
        self.prompt.as_ref()
    }

    /// Write `J` with `note` for the prompted cell. The prompt stays open if
    /// the note is blank or the write fails.
    pub async fn commit_justification(&mut self, note: &str) -> Result<(), SyncError> {
        let prompt = self.prompt.take().ok_or_else(|| {
            SyncError::InvalidUpdate(SharedError::validation("note", "no justification pending"))
        })?;

        let update = AttendanceUpdate::justify(
            prompt.key.student_id.clone(),
            format_day(prompt.key.date),
            note,
        );
        if let Err(e) = self.write(update).await {
            self.prompt = Some(prompt);
            return Err(e);
        }
        Ok(())
    }

    /// Close the prompt; the cell keeps its previous value.
    pub fn cancel_justification(&mut self) -> bool {
        self.prompt.take().is_some()
    }

    /// Set `status` for every visible student registered on `date`.
    /// Returns the number of cells written.
    pub async fn mark_all(&self, date: NaiveDate, status: AttendanceStatus) -> Result<usize, SyncError> {
        let updates: Vec<AttendanceUpdate> = self
            .visible_students()
            .into_iter()
            .filter(|student| student.is_registered_on(date))
            .map(|student| AttendanceUpdate::mark(student.id.clone(), format_day(date), status))
            .collect();
        if updates.is_empty() {
            return Ok(0);
        }

        match self.mode {
            EditMode::Immediate => {
                self.engine.sync_batch(&updates).await?;
            }
            EditMode::Draft => {
                for update in &updates {
                    self.engine.set_draft(update.clone()).await?;
                }
            }
        }
        Ok(updates.len())
    }

    /// Commit every draft as one batch.
    pub async fn save(&self) -> Result<SyncOutcome, SyncError> {
        self.engine.commit_drafts().await
    }

    pub async fn discard(&mut self) {
        self.reset_context().await;
    }
}
