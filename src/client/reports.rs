//! Absence reports computed from the roster and the attendance cache.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::client::cache::AttendanceCache;
use crate::client::state::Roster;
use crate::shared::{Student, StudentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceAlert {
    pub student_id: StudentId,
    pub name: String,
    pub class_id: Option<String>,
    /// Start of the counting cycle
    pub registration_date: NaiveDate,
    pub absences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub active_students: usize,
    pub critical_students: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAttendance {
    pub class_id: String,
    pub name: String,
    pub active_students: usize,
    pub presences: usize,
    pub absences: usize,
}

/// Absences (`F`/`J`) of a student since registration.
pub fn absences_since_registration(student: &Student, cache: &AttendanceCache) -> usize {
    cache
        .records_for_student(&student.id)
        .filter(|record| record.status.counts_as_absence() && student.is_registered_on(record.date))
        .count()
}

/// Active students with at least one absence, most absences first.
pub fn absence_alerts(roster: &Roster, cache: &AttendanceCache) -> Vec<AbsenceAlert> {
    let mut alerts: Vec<AbsenceAlert> = roster
        .active_students()
        .filter_map(|student| {
            let absences = absences_since_registration(student, cache);
            (absences > 0).then(|| AbsenceAlert {
                student_id: student.id.clone(),
                name: student.name.clone(),
                class_id: student.class_id.clone(),
                registration_date: student.registration_date,
                absences,
            })
        })
        .collect();
    alerts.sort_by(|a, b| b.absences.cmp(&a.absences).then_with(|| a.name.cmp(&b.name)));
    alerts
}

pub fn dashboard_stats(roster: &Roster, cache: &AttendanceCache, critical_absences: usize) -> DashboardStats {
    roster
        .active_students()
        .fold(DashboardStats::default(), |mut stats, student| {
            stats.active_students += 1;
            if absences_since_registration(student, cache) >= critical_absences {
                stats.critical_students += 1;
            }
            stats
        })
}

/// Presence and absence totals per class within `from..=to`.
pub fn class_attendance(roster: &Roster, cache: &AttendanceCache, from: NaiveDate, to: NaiveDate) -> Vec<ClassAttendance> {
    let class_of: HashMap<&StudentId, &str> = roster
        .students
        .iter()
        .filter_map(|student| student.class_id.as_deref().map(|class_id| (&student.id, class_id)))
        .collect();

    let mut totals: HashMap<&str, (usize, usize)> = HashMap::new();
    for record in cache.records().filter(|record| record.date >= from && record.date <= to) {
        let Some(class_id) = class_of.get(&record.student_id) else {
            continue;
        };
        let entry = totals.entry(*class_id).or_default();
        if record.status.counts_as_presence() {
            entry.0 += 1;
        } else if record.status.counts_as_absence() {
            entry.1 += 1;
        }
    }

    roster
        .classes
        .iter()
        .map(|class| {
            let (presences, absences) = totals.get(class.id.as_str()).copied().unwrap_or_default();
            ClassAttendance {
                class_id: class.id.clone(),
                name: class.name.clone(),
                active_students: class.student_count,
                presences,
                absences,
            }
        })
        .collect()
}
