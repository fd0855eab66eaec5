use std::collections::HashMap;

use anyhow::{anyhow, bail, Context};
use uuid::Uuid;

use crate::models::{AttendanceEvent, AttendanceStatus, Gender, Student, StudentId};

/// One student's line on a single day's attendance form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAttendance {
    pub student_id: StudentId,
    pub name: String,
    pub gender: Gender,
    pub status: Option<AttendanceStatus>,
}

pub fn daily_sheet(roster: &[Student], events: &[AttendanceEvent]) -> Vec<DailyAttendance> {
    let recorded: HashMap<StudentId, Option<AttendanceStatus>> = events
        .iter()
        .map(|event| (event.student_id, AttendanceStatus::from_code(&event.status)))
        .collect();

    roster
        .iter()
        .map(|student| DailyAttendance {
            student_id: student.id,
            name: student.full_name.clone(),
            gender: student.gender,
            status: recorded.get(&student.id).copied().flatten(),
        })
        .collect()
}

/// Applies explicit marks, then fills every still-empty line with `default`.
pub fn apply_marks(
    sheet: &mut [DailyAttendance],
    marks: &[(StudentId, AttendanceStatus)],
    default: Option<AttendanceStatus>,
) -> anyhow::Result<()> {
    for (student_id, status) in marks {
        let line = sheet
            .iter_mut()
            .find(|line| line.student_id == *student_id)
            .ok_or_else(|| anyhow!("student {student_id} is not in this class"))?;
        line.status = Some(*status);
    }

    if let Some(default) = default {
        for line in sheet.iter_mut().filter(|line| line.status.is_none()) {
            line.status = Some(default);
        }
    }

    Ok(())
}

pub fn parse_status(value: &str) -> anyhow::Result<AttendanceStatus> {
    let code = value.trim().to_ascii_uppercase();
    AttendanceStatus::from_code(&code)
        .ok_or_else(|| anyhow!("unknown status {value:?}, expected one of H, S, I, A"))
}

/// Parses `<student-uuid>=<status>` as given on the command line.
pub fn parse_mark(value: &str) -> anyhow::Result<(StudentId, AttendanceStatus)> {
    let Some((id, status)) = value.split_once('=') else {
        bail!("expected <student-id>=<status>, got {value:?}");
    };
    let student_id = Uuid::parse_str(id.trim()).context("invalid student id")?;
    Ok((student_id, parse_status(status)?))
}
