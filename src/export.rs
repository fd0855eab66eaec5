use std::fmt;
use std::io::Write;
use std::path::Path;

use log::info;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExportError;
use crate::models::{AttendanceStatus, MonthSelector};
use crate::recap::MonthlyRecap;

pub const NO_RECORD: &str = "-";
pub const SHEET_NAME: &str = "Attendance Recap";

const LEADING_COLUMNS: usize = 2;
const TOTAL_COLUMNS: usize = AttendanceStatus::ALL.len();

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(u32),
    Blank,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(value) => f.write_str(value),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Blank => Ok(()),
        }
    }
}

/// Row-major recap sheet: title, blank, header, then one row per student.
#[derive(Debug, Clone)]
pub struct RecapTable {
    pub days_in_month: u32,
    pub rows: Vec<Vec<Cell>>,
}

impl RecapTable {
    pub const HEADER_ROW: usize = 2;

    pub fn column_count(&self) -> usize {
        table_width(self.days_in_month)
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        &self.rows[Self::HEADER_ROW + 1..]
    }
}

fn table_width(days_in_month: u32) -> usize {
    LEADING_COLUMNS + days_in_month as usize + TOTAL_COLUMNS
}

fn padded(mut row: Vec<Cell>, width: usize) -> Vec<Cell> {
    row.resize(width, Cell::Blank);
    row
}

pub fn build_table(recap: &MonthlyRecap, title: &str) -> RecapTable {
    let width = table_width(recap.days_in_month);
    let mut rows = Vec::with_capacity(recap.students.len() + 3);

    rows.push(padded(vec![Cell::Text(title.to_string())], width));
    rows.push(padded(Vec::new(), width));

    let mut header = vec![
        Cell::Text("No".to_string()),
        Cell::Text("Student Name".to_string()),
    ];
    header.extend((1..=recap.days_in_month).map(Cell::Number));
    header.extend(
        AttendanceStatus::ALL
            .iter()
            .map(|status| Cell::Text(status.label().to_string())),
    );
    rows.push(header);

    for (position, row) in recap.students.iter().enumerate() {
        let mut cells = Vec::with_capacity(width);
        cells.push(Cell::Number(position as u32 + 1));
        cells.push(Cell::Text(row.student.full_name.clone()));
        cells.extend(row.days.iter().map(|slot| {
            Cell::Text(slot.map_or(NO_RECORD, AttendanceStatus::code).to_string())
        }));
        cells.extend(row.totals.in_order().into_iter().map(Cell::Number));
        rows.push(cells);
    }

    RecapTable {
        days_in_month: recap.days_in_month,
        rows,
    }
}

pub fn default_filename(period: &MonthSelector) -> String {
    format!(
        "attendance_recap_{}_{}.xlsx",
        period.month(),
        period.year()
    )
}

pub fn write_csv<W: Write>(table: &RecapTable, writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_xlsx(table: &RecapTable, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let day_columns = table.days_in_month as u16;
    worksheet.set_column_width(0, 5)?;
    worksheet.set_column_width(1, 35)?;
    for col in 0..day_columns {
        worksheet.set_column_width(LEADING_COLUMNS as u16 + col, 3)?;
    }
    for col in 0..TOTAL_COLUMNS as u16 {
        worksheet.set_column_width(LEADING_COLUMNS as u16 + day_columns + col, 5)?;
    }

    let bold = Format::new().set_bold();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = row_idx as u32;
        let emphasised = row_idx == 0 || row_idx == RecapTable::HEADER_ROW;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as u16;
            match cell {
                Cell::Blank => {}
                Cell::Text(value) if emphasised => {
                    worksheet.write_string_with_format(row_num, col, value, &bold)?;
                }
                Cell::Text(value) => {
                    worksheet.write_string(row_num, col, value)?;
                }
                Cell::Number(value) if emphasised => {
                    worksheet.write_number_with_format(row_num, col, *value, &bold)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row_num, col, *value)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes the table with the sink matching the file extension.
pub fn export_to_path(table: &RecapTable, path: &Path) -> Result<(), ExportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => write_xlsx(table, path)?,
        "csv" => write_csv(table, std::fs::File::create(path)?)?,
        other => return Err(ExportError::UnsupportedFormat(other.to_string())),
    }

    info!(
        "exported {} student rows ({} columns) to {}",
        table.data_rows().len(),
        table.column_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceEvent, Gender, Student};
    use crate::recap::build_recap;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn sample_recap() -> MonthlyRecap {
        let ana = Student::new(Uuid::from_u128(1), "Ana", Gender::Female);
        let budi = Student::new(Uuid::from_u128(2), "Budi", Gender::Male);
        let events = vec![
            AttendanceEvent {
                student_id: ana.id,
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                status: "H".to_string(),
            },
            AttendanceEvent {
                student_id: ana.id,
                date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
                status: "A".to_string(),
            },
            AttendanceEvent {
                student_id: budi.id,
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                status: "S".to_string(),
            },
        ];
        build_recap(&[ana, budi], &events, 2, 2024).unwrap()
    }

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn table_shape_matches_roster_and_month() {
        let recap = sample_recap();
        let table = build_table(&recap, &recap.period.title());

        assert_eq!(table.rows.len(), 2 + 1 + 2);
        assert_eq!(table.column_count(), 2 + 29 + 4);
        for row in &table.rows {
            assert_eq!(row.len(), 2 + 29 + 4);
        }
    }

    #[test]
    fn header_lists_days_then_totals() {
        let recap = sample_recap();
        let table = build_table(&recap, "title");
        let header = &table.rows[RecapTable::HEADER_ROW];

        assert_eq!(header[0], text("No"));
        assert_eq!(header[1], text("Student Name"));
        assert_eq!(header[2], Cell::Number(1));
        assert_eq!(header[30], Cell::Number(29));
        assert_eq!(
            &header[31..],
            &[text("Present"), text("Sick"), text("Excused"), text("Absent")]
        );
    }

    #[test]
    fn data_rows_carry_codes_placeholders_and_totals() {
        let recap = sample_recap();
        let table = build_table(&recap, "title");
        assert_eq!(table.rows[0][0], text("title"));
        assert!(table.rows[1].iter().all(|cell| *cell == Cell::Blank));

        let ana = &table.data_rows()[0];
        assert_eq!(ana[0], Cell::Number(1));
        assert_eq!(ana[1], text("Ana"));
        assert_eq!(ana[2], text("H"));
        assert_eq!(ana[3], text("A"));
        assert_eq!(ana[4], text(NO_RECORD));
        assert_eq!(
            &ana[31..],
            &[Cell::Number(1), Cell::Number(0), Cell::Number(0), Cell::Number(1)]
        );

        let budi = &table.data_rows()[1];
        assert_eq!(budi[0], Cell::Number(2));
        assert_eq!(budi[2], text("S"));
        assert_eq!(
            &budi[31..],
            &[Cell::Number(0), Cell::Number(1), Cell::Number(0), Cell::Number(0)]
        );
    }

    #[test]
    fn empty_roster_still_has_header() {
        let recap = build_recap(&[], &[], 4, 2025).unwrap();
        let table = build_table(&recap, "empty");
        assert_eq!(table.rows.len(), 3);
        assert!(table.data_rows().is_empty());
        assert_eq!(table.rows[2].len(), 2 + 30 + 4);
    }

    #[test]
    fn csv_sink_writes_every_row() {
        let recap = sample_recap();
        let table = build_table(&recap, "ATTENDANCE RECAP FEBRUARY 2024");

        let mut buffer = Vec::new();
        write_csv(&table, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ATTENDANCE RECAP FEBRUARY 2024,"));
        assert!(lines[2].starts_with("No,Student Name,1,2,3"));
        assert!(lines[2].ends_with("Present,Sick,Excused,Absent"));
        assert!(lines[3].starts_with("1,Ana,H,A,-"));
        assert!(lines[3].ends_with(",1,0,0,1"));
    }

    #[test]
    fn export_picks_sink_from_extension() {
        let recap = sample_recap();
        let table = build_table(&recap, "title");
        let dir = tempfile::tempdir().unwrap();

        let xlsx = dir.path().join("recap.xlsx");
        export_to_path(&table, &xlsx).unwrap();
        assert!(std::fs::metadata(&xlsx).unwrap().len() > 0);

        let csv_path = dir.path().join("recap.CSV");
        export_to_path(&table, &csv_path).unwrap();
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.lines().count(), 5);

        let err = export_to_path(&table, &dir.path().join("recap.pdf")).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(ext) if ext == "pdf"));
    }

    #[test]
    fn default_filename_uses_month_and_year() {
        let period = MonthSelector::new(2, 2024).unwrap();
        assert_eq!(default_filename(&period), "attendance_recap_2_2024.xlsx");
    }
}
