use thiserror::Error;

/// Everything that can go wrong between receiving a workbook and producing
/// a report from it.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed reading file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed reading workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("sheet not found: {0}")]
    MissingSheet(String),
    #[error("column '{column}' not found in sheet {sheet}")]
    MissingColumn { sheet: String, column: String },
    #[error("invalid value in sheet {sheet}, row {row}, column '{column}': {reason}")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: String,
        reason: String,
    },
    #[error("failed rendering chart: {0}")]
    Chart(String),
    #[error("failed rendering pdf: {0}")]
    Pdf(String),
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
