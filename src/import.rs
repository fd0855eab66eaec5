use std::io::Read;

use serde::Deserialize;

use crate::error::ImportError;
use crate::models::{Gender, NewStudent};

pub const TEMPLATE_HEADER: &str = "full_name,nisn,gender,parent_name,parent_phone";

#[derive(Debug, Deserialize)]
struct CsvRow {
    full_name: Option<String>,
    nisn: Option<String>,
    gender: Option<String>,
    parent_name: Option<String>,
    parent_phone: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn parse_students<R: Read>(input: R) -> Result<Vec<NewStudent>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    let headers = reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut students = Vec::new();

    while reader.read_record(&mut record)? {
        let row: CsvRow = record.deserialize(Some(&headers))?;
        if row.full_name.is_none()
            && row.nisn.is_none()
            && row.gender.is_none()
            && row.parent_name.is_none()
            && row.parent_phone.is_none()
        {
            continue;
        }

        let line = record.position().map_or(0, |position| position.line());
        let full_name = non_empty(row.full_name).ok_or(ImportError::MissingFullName { line })?;
        students.push(NewStudent {
            full_name,
            nisn: non_empty(row.nisn),
            gender: Gender::from_code(row.gender.as_deref()),
            parent_name: non_empty(row.parent_name),
            parent_phone: non_empty(row.parent_phone),
        });
    }

    if students.is_empty() {
        return Err(ImportError::Empty);
    }

    Ok(students)
}

pub fn template_csv() -> String {
    format!(
        "{TEMPLATE_HEADER}\n\
         Budi Santoso,123456,L,Pak Santoso,08123456789\n\
         Siti Aminah,654321,P,Bu Aminah,08987654321\n"
    )
}
