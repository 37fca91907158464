use async_trait::async_trait;
use csv::ReaderBuilder;

use super::{RecordSource, SourceError};
use crate::record::{RawRecord, RawValue};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// An uploaded CSV file held in memory. The first row is the header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    name: String,
    content: Vec<u8>,
}

impl CsvSource {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    fn body(&self) -> &[u8] {
        self.content
            .strip_prefix(UTF8_BOM)
            .unwrap_or(self.content.as_slice())
    }

    fn parse(&self) -> Result<(Vec<String>, Vec<RawRecord>), SourceError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(self.body());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let record = RawRecord::from_row(&headers, row.iter().map(RawValue::text));
            if record.columns().all(|(_, value)| value.is_blank()) {
                continue;
            }
            records.push(record);
        }

        Ok((headers, records))
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV file '{}'", self.name)
    }

    async fn headers(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.parse()?.0)
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.parse()?.1)
    }
}
