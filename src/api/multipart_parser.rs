use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use futures_util::StreamExt;
use log::debug;
use sanitize_filename::sanitize;

use crate::catalog::Language;
use crate::record::ColumnMapping;
use crate::ErrorResponse;

/// An uploaded file kept in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Fields of a report or headers request. Every field is optional here;
/// presence rules are checked by `validation`.
#[derive(Debug, Default)]
pub struct ReportForm {
    pub file: Option<UploadedFile>,
    pub sheet_id: Option<String>,
    pub email: Option<String>,
    pub mapping: Option<ColumnMapping>,
    pub language: Option<Language>,
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("Invalid field value: {0}")]
    InvalidValue(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Invalid mapping JSON: {0}")]
    MappingError(String),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    pub async fn parse_report_form(
        mut multipart: Multipart,
    ) -> Result<ReportForm, MultipartParseError> {
        let mut form = ReportForm::default();

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field
                .content_disposition()
                .ok_or_else(|| {
                    MultipartParseError::FieldError("Content disposition not found".to_string())
                })?
                .clone();
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?;

            match name {
                "file" => {
                    let file_name = content_disposition
                        .get_filename()
                        .map(sanitize)
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| "upload.csv".to_string());
                    let data = read_bytes(&mut field).await?;
                    debug!("received upload '{}' ({} bytes)", file_name, data.len());
                    if !data.is_empty() {
                        form.file = Some(UploadedFile { file_name, data });
                    }
                }
                "sheet_id" => form.sheet_id = read_text(&mut field).await?,
                "email" => form.email = read_text(&mut field).await?,
                "mapping" => {
                    if let Some(json) = read_text(&mut field).await? {
                        let mapping: ColumnMapping = serde_json::from_str(&json)
                            .map_err(|e| MultipartParseError::MappingError(e.to_string()))?;
                        form.mapping = Some(mapping);
                    }
                }
                "language" => {
                    if let Some(code) = read_text(&mut field).await? {
                        let language = code
                            .parse::<Language>()
                            .map_err(|e| MultipartParseError::InvalidValue(e.to_string()))?;
                        form.language = Some(language);
                    }
                }
                _ => {
                    // Drain unknown fields so the stream can advance.
                    read_bytes(&mut field).await?;
                }
            }
        }

        Ok(form)
    }
}

async fn read_bytes(field: &mut Field) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        buffer.extend_from_slice(&data_chunk);
    }
    Ok(buffer)
}

/// Trimmed text value of a field; blank values read as `None`.
async fn read_text(field: &mut Field) -> Result<Option<String>, MultipartParseError> {
    let bytes = read_bytes(field).await?;
    let value =
        String::from_utf8(bytes).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
