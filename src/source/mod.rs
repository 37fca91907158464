//! Record sources - where the raw rows of a run come from.
//!
//! - `csv` - uploaded CSV files
//! - `sheets` - Google Sheets API v4 value ranges

pub mod csv;
pub mod sheets;

pub use self::csv::CsvSource;
pub use self::sheets::{SheetSource, SheetsClient, SheetsConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::RawRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source is not configured: {0}")]
    NotConfigured(String),
    #[error("invalid data source: {0}")]
    InvalidInput(String),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("data source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("data source returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Produces the ordered raw records of a run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Column labels of the source, in order.
    async fn headers(&self) -> Result<Vec<String>, SourceError>;

    /// Every data row, in order. Rows with no non-blank cell are skipped.
    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError>;
}
