use std::fmt::Write;

use crate::export::NO_RECORD;
use crate::models::AttendanceStatus;
use crate::recap::MonthlyRecap;

pub fn render_recap(recap: &MonthlyRecap, class_name: &str) -> String {
    let mut output = String::new();
    let period = &recap.period;

    let _ = writeln!(output, "# Attendance Recap: {}", class_name);
    let _ = writeln!(
        output,
        "{} {} ({} days, {} to {})",
        period.month_name(),
        period.year(),
        recap.days_in_month,
        period.first_day(),
        period.last_day()
    );
    let _ = writeln!(output);

    let legend: Vec<String> = AttendanceStatus::ALL
        .iter()
        .map(|status| format!("{} {}", status.code(), status.label()))
        .collect();
    let _ = writeln!(output, "Legend: {}", legend.join(", "));
    let _ = writeln!(output);

    if recap.students.is_empty() {
        let _ = writeln!(output, "No students in this class.");
        return output;
    }

    let mut header = String::from("| No | Student Name |");
    let mut divider = String::from("|---:|---|");
    for day in 1..=recap.days_in_month {
        let _ = write!(header, " {} |", day);
        divider.push_str(":-:|");
    }
    for status in AttendanceStatus::ALL {
        let _ = write!(header, " {} |", status.code());
        divider.push_str("--:|");
    }
    let _ = writeln!(output, "{}", header);
    let _ = writeln!(output, "{}", divider);

    for (position, row) in recap.students.iter().enumerate() {
        let _ = write!(output, "| {} | {} |", position + 1, row.student.full_name);
        for slot in &row.days {
            let _ = write!(output, " {} |", slot.map_or(NO_RECORD, AttendanceStatus::code));
        }
        for total in row.totals.in_order() {
            let _ = write!(output, " {} |", total);
        }
        let _ = writeln!(output);
    }

    let class_totals = recap
        .students
        .iter()
        .fold([0u32; 4], |mut acc, row| {
            for (slot, value) in acc.iter_mut().zip(row.totals.in_order()) {
                *slot += value;
            }
            acc
        });
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Totals");
    for (status, total) in AttendanceStatus::ALL.iter().zip(class_totals) {
        let _ = writeln!(output, "- {}: {}", status.label(), total);
    }
    let unrecorded: usize = recap.students.iter().map(|row| row.unrecorded()).sum();
    let _ = writeln!(output, "- No record: {}", unrecorded);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceEvent, Gender, Student};
    use crate::recap::build_recap;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn renders_rows_and_class_totals() {
        let ana = Student::new(Uuid::from_u128(1), "Ana", Gender::Female);
        let events = vec![
            AttendanceEvent {
                student_id: ana.id,
                date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                status: "H".to_string(),
            },
            AttendanceEvent {
                student_id: ana.id,
                date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
                status: "S".to_string(),
            },
        ];
        let recap = build_recap(&[ana], &events, 4, 2025).unwrap();
        let output = render_recap(&recap, "5A");

        assert!(output.starts_with("# Attendance Recap: 5A\n"));
        assert!(output.contains("April 2025 (30 days, 2025-04-01 to 2025-04-30)"));
        assert!(output.contains("| 1 | Ana | H | S | - |"));
        assert!(output.contains(" 1 | 1 | 0 | 0 |\n"));
        assert!(output.contains("- Present: 1"));
        assert!(output.contains("- Sick: 1"));
        assert!(output.contains("- No record: 28"));
    }

    #[test]
    fn empty_roster_renders_placeholder() {
        let recap = build_recap(&[], &[], 2, 2024).unwrap();
        let output = render_recap(&recap, "6B");
        assert!(output.contains("No students in this class."));
        assert!(!output.contains("| No |"));
    }
}
