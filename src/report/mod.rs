//! Report context assembly and PDF rendering.
//!
//! - `common` - escaping and file naming helpers
//! - `engine` - Typst template renderer

pub mod common;
pub mod engine;

pub use common::artifact_file_name;
pub use engine::TypstReportRenderer;

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::catalog::{CanonicalField, Language};
use crate::record::CanonicalRecord;

/// Errors that can occur while rendering one report.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load report template: {0}")]
    TemplateIo(#[source] std::io::Error),
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write Typst source: {0}")]
    WriteSource(#[source] std::io::Error),
    #[error("Typst CLI execution failed: {0}")]
    CompilerIo(#[source] std::io::Error),
    #[error("Typst CLI exited with status {code}: {stderr}")]
    CompilerExit { code: i32, stderr: String },
    #[error("failed to write PDF to {path}: {source}")]
    WritePdf {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("render task failed: {0}")]
    Task(String),
}

/// Flat, read-only structure handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportContext {
    pub title: String,
    pub client: String,
    pub task: String,
    pub status: String,
    pub summary: String,
    pub comments: String,
    pub date: String,
    pub amount: String,
    #[serde(skip)]
    pub language: Language,
}

/// Combine a canonical record and its summary into a report context.
///
/// Missing or blank values take display defaults: the unknown-client label,
/// `-` for task, status and date, empty comments, `0` for amount.
pub fn assemble_context(
    record: &CanonicalRecord,
    summary: impl Into<String>,
    language: Language,
) -> ReportContext {
    let text = |field: CanonicalField, default: &str| {
        record
            .get(field)
            .display()
            .unwrap_or_else(|| default.to_string())
    };

    ReportContext {
        title: language.report_title().to_string(),
        client: text(CanonicalField::ClientName, language.unknown_client()),
        task: text(CanonicalField::Task, "-"),
        status: text(CanonicalField::Status, "-"),
        summary: summary.into(),
        comments: text(CanonicalField::Comments, ""),
        date: text(CanonicalField::Date, "-"),
        amount: text(CanonicalField::Amount, "0"),
        language,
    }
}

/// Renders one context into a PDF file at `output`.
///
/// Implementations block the calling thread.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, context: &ReportContext, output: &Path) -> Result<(), RenderError>;
}
