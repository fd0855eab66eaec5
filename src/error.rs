use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("invalid month {0}: expected a value between 1 and 12")]
    InvalidMonth(u32),

    #[error("invalid year {0}")]
    InvalidYear(i32),

    #[error("failed to fetch {source_name}: {message}")]
    UpstreamFetch {
        source_name: &'static str,
        message: String,
    },
}

impl RecapError {
    pub fn upstream(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        RecapError::UpstreamFetch {
            source_name,
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {line} has no full_name")]
    MissingFullName { line: u64 },

    #[error("file is empty or has no readable rows")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("unsupported export format {0:?}, expected .xlsx or .csv")]
    UnsupportedFormat(String),
}
