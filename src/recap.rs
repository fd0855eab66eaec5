use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::Serialize;

use crate::error::RecapError;
use crate::models::{AttendanceEvent, AttendanceStatus, MonthSelector, Student, StudentId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub out_of_range: usize,
    pub unknown_status: usize,
    pub duplicates: usize,
}

/// Status lookup keyed by `(student, day of month)`.
#[derive(Debug, Default)]
pub struct AttendanceIndex {
    slots: HashMap<(StudentId, u32), AttendanceStatus>,
    stats: IndexStats,
}

impl AttendanceIndex {
    /// Later events overwrite earlier ones for the same slot. An unknown
    /// status code clears the slot back to "no record".
    pub fn build(events: &[AttendanceEvent], period: &MonthSelector) -> Self {
        let mut slots = HashMap::new();
        let mut stats = IndexStats::default();
        let mut seen = HashSet::new();

        for event in events {
            let Some(day) = period.day_of(event.date) else {
                warn!(
                    "ignoring attendance for {} on {}: outside {}-{:02}",
                    event.student_id,
                    event.date,
                    period.year(),
                    period.month()
                );
                stats.out_of_range += 1;
                continue;
            };

            let key = (event.student_id, day);
            if !seen.insert(key) {
                warn!(
                    "duplicate attendance for {} on {}, keeping the later entry",
                    event.student_id, event.date
                );
                stats.duplicates += 1;
            }

            match AttendanceStatus::from_code(&event.status) {
                Some(status) => {
                    slots.insert(key, status);
                    stats.indexed += 1;
                }
                None => {
                    warn!(
                        "unrecognized attendance status {:?} for {} on {}",
                        event.status, event.student_id, event.date
                    );
                    slots.remove(&key);
                    stats.unknown_status += 1;
                }
            }
        }

        debug!(
            "indexed {} attendance rows into {} slots",
            stats.indexed,
            slots.len()
        );
        Self { slots, stats }
    }

    pub fn get(&self, student_id: StudentId, day: u32) -> Option<AttendanceStatus> {
        self.slots.get(&(student_id, day)).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub absent: u32,
}

impl StatusTotals {
    pub fn from_days(days: &[Option<AttendanceStatus>]) -> Self {
        let mut totals = Self::default();
        for status in days.iter().flatten() {
            match status {
                AttendanceStatus::Present => totals.present += 1,
                AttendanceStatus::Sick => totals.sick += 1,
                AttendanceStatus::Excused => totals.excused += 1,
                AttendanceStatus::Absent => totals.absent += 1,
            }
        }
        totals
    }

    pub fn get(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Sick => self.sick,
            AttendanceStatus::Excused => self.excused,
            AttendanceStatus::Absent => self.absent,
        }
    }

    /// Totals in `AttendanceStatus::ALL` order.
    pub fn in_order(&self) -> [u32; 4] {
        AttendanceStatus::ALL.map(|status| self.get(status))
    }

    pub fn recorded(&self) -> u32 {
        self.present + self.sick + self.excused + self.absent
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentRecap {
    pub student: Student,
    /// Slot `d` holds the status for day `d + 1`.
    pub days: Vec<Option<AttendanceStatus>>,
    pub totals: StatusTotals,
}

impl StudentRecap {
    pub fn unrecorded(&self) -> usize {
        self.days.iter().filter(|slot| slot.is_none()).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyRecap {
    pub period: MonthSelector,
    pub days_in_month: u32,
    pub students: Vec<StudentRecap>,
}

pub fn aggregate(
    roster: &[Student],
    index: &AttendanceIndex,
    period: &MonthSelector,
) -> MonthlyRecap {
    let days_in_month = period.days_in_month();

    let students = roster
        .iter()
        .map(|student| {
            let days: Vec<Option<AttendanceStatus>> = (1..=days_in_month)
                .map(|day| index.get(student.id, day))
                .collect();
            let totals = StatusTotals::from_days(&days);
            StudentRecap {
                student: student.clone(),
                days,
                totals,
            }
        })
        .collect();

    MonthlyRecap {
        period: *period,
        days_in_month,
        students,
    }
}

pub fn build_recap(
    roster: &[Student],
    events: &[AttendanceEvent],
    month: u32,
    year: i32,
) -> Result<MonthlyRecap, RecapError> {
    let period = MonthSelector::new(month, year)?;
    let index = AttendanceIndex::build(events, &period);

    let stats = index.stats();
    if stats.out_of_range + stats.unknown_status + stats.duplicates > 0 {
        warn!(
            "recap {}-{:02}: skipped {} out-of-month rows, {} unknown codes, {} duplicates",
            period.year(),
            period.month(),
            stats.out_of_range,
            stats.unknown_status,
            stats.duplicates
        );
    }
    if index.is_empty() {
        debug!(
            "no attendance recorded for {}-{:02}",
            period.year(),
            period.month()
        );
    }

    Ok(aggregate(roster, &index, &period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn student(id: u128, name: &str) -> Student {
        Student::new(Uuid::from_u128(id), name, Gender::Unknown)
    }

    fn event(id: u128, date: &str, status: &str) -> AttendanceEvent {
        AttendanceEvent {
            student_id: Uuid::from_u128(id),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date"),
            status: status.to_string(),
        }
    }

    #[test]
    fn leap_february_scenario() {
        let roster = vec![student(1, "Ana"), student(2, "Budi")];
        let events = vec![
            event(1, "2024-02-01", "H"),
            event(1, "2024-02-02", "A"),
            event(2, "2024-02-01", "S"),
        ];

        let recap = build_recap(&roster, &events, 2, 2024).unwrap();
        assert_eq!(recap.days_in_month, 29);

        let ana = &recap.students[0];
        assert_eq!(ana.student.full_name, "Ana");
        assert_eq!(ana.days.len(), 29);
        assert_eq!(
            ana.totals,
            StatusTotals {
                present: 1,
                sick: 0,
                excused: 0,
                absent: 1
            }
        );
        assert_eq!(ana.unrecorded(), 27);
        assert_eq!(ana.days[0], Some(AttendanceStatus::Present));
        assert_eq!(ana.days[1], Some(AttendanceStatus::Absent));

        let budi = &recap.students[1];
        assert_eq!(budi.days.len(), 29);
        assert_eq!(budi.totals.in_order(), [0, 1, 0, 0]);
        assert_eq!(budi.unrecorded(), 28);
    }

    #[test]
    fn empty_attendance_yields_zero_totals() {
        let roster = vec![student(1, "Ana"), student(2, "Budi"), student(3, "Citra")];
        let recap = build_recap(&roster, &[], 4, 2025).unwrap();

        assert_eq!(recap.students.len(), 3);
        for row in &recap.students {
            assert_eq!(row.days.len(), 30);
            assert!(row.days.iter().all(Option::is_none));
            assert_eq!(row.totals, StatusTotals::default());
        }
    }

    #[test]
    fn empty_roster_is_not_an_error() {
        let events = vec![event(1, "2025-01-03", "H")];
        let recap = build_recap(&[], &events, 1, 2025).unwrap();
        assert!(recap.students.is_empty());
        assert_eq!(recap.days_in_month, 31);
    }

    #[test]
    fn roster_order_is_preserved() {
        let roster = vec![student(3, "Zaki"), student(1, "Ana"), student(2, "Budi")];
        let recap = build_recap(&roster, &[], 1, 2025).unwrap();
        let names: Vec<&str> = recap
            .students
            .iter()
            .map(|row| row.student.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Zaki", "Ana", "Budi"]);
    }

    #[test]
    fn later_event_wins_for_same_day() {
        let roster = vec![student(1, "Ana")];
        let events = vec![event(1, "2025-03-05", "A"), event(1, "2025-03-05", "I")];

        let period = MonthSelector::new(3, 2025).unwrap();
        let index = AttendanceIndex::build(&events, &period);
        assert_eq!(index.stats().duplicates, 1);
        assert_eq!(index.len(), 1);

        let recap = aggregate(&roster, &index, &period);
        assert_eq!(recap.students[0].days[4], Some(AttendanceStatus::Excused));
        assert_eq!(recap.students[0].totals.in_order(), [0, 0, 1, 0]);
    }

    #[test]
    fn out_of_month_events_are_ignored() {
        let roster = vec![student(1, "Ana")];
        let events = vec![
            event(1, "2025-02-28", "H"),
            event(1, "2025-03-01", "S"),
            event(1, "2024-03-02", "A"),
        ];

        let period = MonthSelector::new(3, 2025).unwrap();
        let index = AttendanceIndex::build(&events, &period);
        assert_eq!(index.stats().out_of_range, 2);

        let recap = aggregate(&roster, &index, &period);
        assert_eq!(recap.students[0].totals.in_order(), [0, 1, 0, 0]);
        assert_eq!(recap.students[0].days[1], None);
    }

    #[test]
    fn unknown_status_counts_as_no_record() {
        let roster = vec![student(1, "Ana")];
        let events = vec![
            event(1, "2025-05-02", "X"),
            event(1, "2025-05-03", "H"),
            event(1, "2025-05-03", "present"),
        ];

        let recap = build_recap(&roster, &events, 5, 2025).unwrap();
        let ana = &recap.students[0];
        assert_eq!(ana.days[1], None);
        assert_eq!(ana.days[2], None);
        assert_eq!(ana.totals.recorded(), 0);
    }

    #[test]
    fn events_for_unknown_students_do_not_leak_into_roster() {
        let roster = vec![student(1, "Ana")];
        let events = vec![event(9, "2025-06-10", "A")];
        let recap = build_recap(&roster, &events, 6, 2025).unwrap();
        assert_eq!(recap.students.len(), 1);
        assert_eq!(recap.students[0].totals.recorded(), 0);
    }

    #[test]
    fn totals_match_recorded_days() {
        let roster = vec![student(1, "Ana")];
        let codes = ["H", "S", "I", "A", "H", "H"];
        let events: Vec<AttendanceEvent> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| event(1, &format!("2025-01-{:02}", i * 3 + 1), code))
            .collect();

        let recap = build_recap(&roster, &events, 1, 2025).unwrap();
        let ana = &recap.students[0];
        assert_eq!(ana.totals.in_order(), [3, 1, 1, 1]);
        assert_eq!(
            ana.totals.recorded() as usize,
            ana.days.len() - ana.unrecorded()
        );
        assert!(ana.totals.recorded() <= recap.days_in_month);
    }

    #[test]
    fn invalid_month_is_rejected_before_aggregation() {
        let roster = vec![student(1, "Ana")];
        assert!(matches!(
            build_recap(&roster, &[], 13, 2025),
            Err(RecapError::InvalidMonth(13))
        ));
        assert!(matches!(
            build_recap(&roster, &[], 1, 0),
            Err(RecapError::InvalidYear(0))
        ));
    }
}
