use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::multipart_parser::{MultipartParser, ReportForm};
use super::validation::{validate_report_form, validate_source, ValidationErrors};
use super::AppState;
use crate::catalog::{field_catalog, FieldDescriptor, Language};
use crate::dispatch::{RunReport, RunStatus};
use crate::record::{suggest_mapping, ColumnMapping};
use crate::source::{CsvSource, RecordSource, SourceError};
use crate::ErrorResponse;

/// Multipart body of a report run. Documentation only.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRunRequest {
    /// CSV upload; mutually exclusive with `sheet_id`.
    #[allow(unused)]
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
    #[allow(unused)]
    pub sheet_id: Option<String>,
    #[allow(unused)]
    pub email: String,
    /// JSON object, canonical field key to column label.
    #[allow(unused)]
    pub mapping: Option<String>,
    #[allow(unused)]
    pub language: Option<Language>,
}

/// Multipart body of a headers request. Documentation only.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SourceHeadersRequest {
    #[allow(unused)]
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
    #[allow(unused)]
    pub sheet_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SourceHeadersResponse {
    pub headers: Vec<String>,
    /// Canonical field key to the column that matches it by normalized label.
    #[schema(value_type = Object)]
    pub suggested_mapping: ColumnMapping,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FieldsQuery {
    /// `en` (default) or `uk`.
    pub language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn validation_response(errors: &ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("ValidationError", &errors.to_message()))
}

fn source_for(form: ReportForm, state: &AppState) -> Option<Box<dyn RecordSource>> {
    match (form.file, form.sheet_id) {
        (Some(file), None) => Some(Box::new(CsvSource::new(file.file_name, file.data))),
        (None, Some(sheet_id)) => Some(Box::new(state.sheets.sheet(sheet_id))),
        _ => None,
    }
}

fn source_error_response(e: &SourceError) -> HttpResponse {
    match e {
        SourceError::InvalidInput(_) | SourceError::Csv(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()))
        }
        _ => HttpResponse::BadGateway().json(ErrorResponse::new("UpstreamError", &e.to_string())),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    post,
    path = "/reports",
    request_body(content = inline(ReportRunRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Run finished with reports or nothing to process", body = RunReport),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Run failed", body = RunReport)
    )
)]
pub async fn run_report(payload: Multipart, state: web::Data<AppState>) -> impl Responder {
    info!("Executing run_report handler");
    let form = match MultipartParser::parse_report_form(payload).await {
        Ok(form) => form,
        Err(e) => {
            warn!("rejected report request: {}", e);
            return HttpResponse::from(e);
        }
    };

    if let Err(errors) = validate_report_form(&form) {
        warn!("report request failed validation: {}", errors.to_message());
        return validation_response(&errors);
    }

    let dispatcher = match form.language {
        Some(language) => state.dispatcher.with_language(language),
        None => state.dispatcher.clone(),
    };
    let email = form.email.clone();
    let mapping = form.mapping.clone();
    let Some(source) = source_for(form, &state) else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("a CSV file or a sheet id is required"));
    };

    let outcome = dispatcher
        .run(source.as_ref(), mapping.as_ref(), email.as_deref())
        .await;

    match outcome.status {
        RunStatus::Failed => {
            error!("report run failed: {}", outcome.message);
            HttpResponse::InternalServerError().json(outcome.report())
        }
        _ => HttpResponse::Ok().json(outcome.report()),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    post,
    path = "/sources/headers",
    request_body(content = inline(SourceHeadersRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Source headers and a suggested mapping", body = SourceHeadersResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Source could not be read", body = ErrorResponse)
    )
)]
pub async fn source_headers(payload: Multipart, state: web::Data<AppState>) -> impl Responder {
    let form = match MultipartParser::parse_report_form(payload).await {
        Ok(form) => form,
        Err(e) => return HttpResponse::from(e),
    };

    let mut errors = ValidationErrors::new();
    validate_source(&form, &mut errors);
    if !errors.is_empty() {
        return validation_response(&errors);
    }

    let Some(source) = source_for(form, &state) else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("a CSV file or a sheet id is required"));
    };

    match source.headers().await {
        Ok(headers) => {
            let suggested_mapping = suggest_mapping(&headers);
            HttpResponse::Ok().json(SourceHeadersResponse {
                headers,
                suggested_mapping,
            })
        }
        Err(e) => {
            error!("failed to read headers from {}: {}", source.describe(), e);
            source_error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    get,
    path = "/fields",
    params(FieldsQuery),
    responses(
        (status = 200, description = "Canonical fields with display labels", body = [FieldDescriptor]),
        (status = 400, description = "Unknown language", body = ErrorResponse)
    )
)]
pub async fn list_fields(query: web::Query<FieldsQuery>) -> impl Responder {
    let language = match query.language.as_deref() {
        None => Language::default(),
        Some(code) => match code.parse::<Language>() {
            Ok(language) => language,
            Err(e) => return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string())),
        },
    };
    HttpResponse::Ok().json(field_catalog(language))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
