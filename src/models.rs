use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::RecapError;

pub type StudentId = Uuid;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Stored codes are `L` (laki-laki) and `P` (perempuan); `M`/`F` are accepted on input.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
            Some("L") | Some("M") => Gender::Male,
            Some("P") | Some("F") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn code(self) -> Option<&'static str> {
        match self {
            Gender::Male => Some("L"),
            Gender::Female => Some("P"),
            Gender::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Sick,
    Excused,
    Absent,
}

impl AttendanceStatus {
    /// Fixed column order for totals and exports.
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Sick,
        AttendanceStatus::Excused,
        AttendanceStatus::Absent,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(AttendanceStatus::Present),
            "S" => Some(AttendanceStatus::Sick),
            "I" => Some(AttendanceStatus::Excused),
            "A" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "H",
            AttendanceStatus::Sick => "S",
            AttendanceStatus::Excused => "I",
            AttendanceStatus::Absent => "A",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Sick => "Sick",
            AttendanceStatus::Excused => "Excused",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A calendar month in the proleptic Gregorian calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthSelector {
    month: u32,
    year: i32,
    #[serde(skip)]
    first_day: NaiveDate,
    #[serde(skip)]
    last_day: NaiveDate,
}

impl MonthSelector {
    pub fn new(month: u32, year: i32) -> Result<Self, RecapError> {
        if !(1..=12).contains(&month) {
            return Err(RecapError::InvalidMonth(month));
        }
        if year < 1 {
            return Err(RecapError::InvalidYear(year));
        }

        let first_day =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(RecapError::InvalidYear(year))?;
        let last_day = NaiveDate::from_ymd_opt(year, month, days_in(month, year))
            .ok_or(RecapError::InvalidYear(year))?;

        Ok(Self {
            month,
            year,
            first_day,
            last_day,
        })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    pub fn days_in_month(&self) -> u32 {
        days_in(self.month, self.year)
    }

    /// 1-based day of month, or `None` when the date lies in another month.
    pub fn day_of(&self, date: NaiveDate) -> Option<u32> {
        (date.year() == self.year && date.month() == self.month).then(|| date.day())
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn title(&self) -> String {
        format!(
            "ATTENDANCE RECAP {} {}",
            self.month_name().to_uppercase(),
            self.year
        )
    }
}

fn days_in(month: u32, year: i32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    pub gender: Gender,
}

impl Student {
    pub fn new(id: StudentId, full_name: impl Into<String>, gender: Gender) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            gender,
        }
    }
}

/// One row from the attendance table. `status` is the raw stored code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEvent {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub full_name: String,
    pub nisn: Option<String>,
    pub gender: Gender,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct ClassRoom {
    pub id: Uuid,
    pub name: String,
    pub level: String,
    pub phase: String,
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub lesson_period: String,
    pub subject: String,
    pub material: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub date: NaiveDate,
    pub lesson_period: String,
    pub subject: String,
    pub material: String,
    pub notes: Option<String>,
}

/// School years run July through June.
pub fn academic_year_for(date: NaiveDate) -> String {
    let start = if date.month() >= 7 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}/{}", start, start + 1)
}
