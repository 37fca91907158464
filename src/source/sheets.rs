//! Google Sheets API v4 reader.

use async_trait::async_trait;
use log::info;
use reqwest::Url;
use serde::Deserialize;

use super::{RecordSource, SourceError};
use crate::record::{RawRecord, RawValue};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_RANGE: &str = "A1:Z";

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub base_url: String,
    pub range: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            range: DEFAULT_RANGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, config: SheetsConfig) -> Self {
        Self { http, config }
    }

    pub fn sheet(&self, sheet_id: impl Into<String>) -> SheetSource {
        SheetSource {
            client: self.clone(),
            sheet_id: sheet_id.into(),
        }
    }

    fn values_url(&self, sheet_id: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| SourceError::InvalidInput(format!("bad Sheets API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidInput("Sheets API base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", sheet_id, "values", self.config.range.as_str()]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING")
            .append_pair("majorDimension", "ROWS");
        if let Some(key) = &self.config.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    /// Every row of the configured range, header row first.
    pub async fn values(&self, sheet_id: &str) -> Result<Vec<Vec<serde_json::Value>>, SourceError> {
        if sheet_id.trim().is_empty() {
            return Err(SourceError::InvalidInput("sheet id is empty".into()));
        }
        if self.config.api_key.is_none() && self.config.access_token.is_none() {
            return Err(SourceError::NotConfigured(
                "set GOOGLE_SHEETS_API_KEY or GOOGLE_SHEETS_ACCESS_TOKEN".into(),
            ));
        }

        let mut request = self.http.get(self.values_url(sheet_id.trim())?);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let range: ValueRange = response.json().await?;
        Ok(range.values)
    }
}

/// One spreadsheet read through a `SheetsClient`.
#[derive(Debug, Clone)]
pub struct SheetSource {
    client: SheetsClient,
    sheet_id: String,
}

fn header_row(rows: &[Vec<serde_json::Value>]) -> Vec<String> {
    rows.first()
        .map(|row| {
            row.iter()
                .map(|cell| RawValue::from(cell.clone()).to_string().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl RecordSource for SheetSource {
    fn describe(&self) -> String {
        format!("Google Sheet '{}'", self.sheet_id)
    }

    async fn headers(&self) -> Result<Vec<String>, SourceError> {
        let rows = self.client.values(&self.sheet_id).await?;
        Ok(header_row(&rows))
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let rows = self.client.values(&self.sheet_id).await?;
        let headers = header_row(&rows);

        let records: Vec<RawRecord> = rows
            .into_iter()
            .skip(1)
            .map(|row| RawRecord::from_row(&headers, row.into_iter().map(RawValue::from)))
            .filter(|record| record.columns().any(|(_, value)| !value.is_blank()))
            .collect();

        info!("fetched {} record(s) from {}", records.len(), self.describe());
        Ok(records)
    }
}
