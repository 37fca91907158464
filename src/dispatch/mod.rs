//! Dispatcher - runs one end-to-end report job.
//!
//! Fetch, then per record normalize, summarize, assemble and render, then
//! archive the PDFs and mail the archive. Every collaborator error is turned
//! into a `RunOutcome`; nothing propagates to the caller.

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::archive::{create_archive, ArchiveError};
use crate::catalog::{CanonicalField, Language};
use crate::config::OutputConfig;
use crate::mail::{Attachment, MailTransport, OutgoingMail};
use crate::record::{normalize_record, ColumnMapping};
use crate::report::{artifact_file_name, assemble_context, RenderError, ReportContext, ReportRenderer};
use crate::source::{RecordSource, SourceError};
use crate::summary::SummaryEnricher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    NothingToProcess,
    Failed,
}

/// Full result of a run, including what ended up on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub message: String,
    pub artifacts: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl RunOutcome {
    fn nothing_to_process() -> Self {
        Self {
            status: RunStatus::NothingToProcess,
            message: "No data to process".to_string(),
            artifacts: Vec::new(),
            archive: None,
            skipped: 0,
            warnings: Vec::new(),
        }
    }

    fn failed(message: impl Into<String>, artifacts: Vec<PathBuf>, skipped: usize) -> Self {
        Self {
            status: RunStatus::Failed,
            message: message.into(),
            artifacts,
            archive: None,
            skipped,
            warnings: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            status: self.status,
            success: self.is_success(),
            message: self.message.clone(),
        }
    }
}

/// The public view of a run returned over HTTP.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunReport {
    pub status: RunStatus,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Error)]
enum DispatchError {
    #[error("failed to fetch records from {source_name}: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },
    #[error("failed to create output directory {path}: {error}")]
    OutputDir {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("no reports were rendered ({skipped} record(s) skipped)")]
    NoArtifacts { skipped: usize },
    #[error("failed to archive reports: {error}")]
    Archive {
        #[source]
        error: ArchiveError,
        artifacts: Vec<PathBuf>,
        skipped: usize,
    },
}

impl DispatchError {
    /// Failed outcome keeping whatever the run left on disk.
    fn into_outcome(self) -> RunOutcome {
        let message = self.to_string();
        match self {
            Self::Archive {
                artifacts, skipped, ..
            } => RunOutcome::failed(message, artifacts, skipped),
            Self::NoArtifacts { skipped } => RunOutcome::failed(message, Vec::new(), skipped),
            Self::Source { .. } | Self::OutputDir { .. } => {
                RunOutcome::failed(message, Vec::new(), 0)
            }
        }
    }
}

/// Runs report jobs with injected collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    output: OutputConfig,
    enricher: SummaryEnricher,
    renderer: Arc<dyn ReportRenderer>,
    mailer: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(
        output: OutputConfig,
        enricher: SummaryEnricher,
        renderer: Arc<dyn ReportRenderer>,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        let enricher = enricher.with_language(output.language);
        Self {
            output,
            enricher,
            renderer,
            mailer,
        }
    }

    /// A dispatcher sharing the same collaborators but producing reports in
    /// `language`.
    pub fn with_language(&self, language: Language) -> Self {
        let mut output = self.output.clone();
        output.language = language;
        Self {
            enricher: self.enricher.with_language(language),
            output,
            renderer: Arc::clone(&self.renderer),
            mailer: Arc::clone(&self.mailer),
        }
    }

    /// Run for today's local date.
    pub async fn run(
        &self,
        source: &dyn RecordSource,
        mapping: Option<&ColumnMapping>,
        recipient: Option<&str>,
    ) -> RunOutcome {
        self.run_for_date(source, mapping, recipient, Local::now().date_naive())
            .await
    }

    pub async fn run_for_date(
        &self,
        source: &dyn RecordSource,
        mapping: Option<&ColumnMapping>,
        recipient: Option<&str>,
        date: NaiveDate,
    ) -> RunOutcome {
        info!("starting report run for {} from {}", date, source.describe());
        match self.try_run(source, mapping, recipient, date).await {
            Ok(outcome) => {
                info!("report run finished: {}", outcome.message);
                outcome
            }
            Err(e) => {
                error!("report run failed: {}", e);
                e.into_outcome()
            }
        }
    }

    async fn try_run(
        &self,
        source: &dyn RecordSource,
        mapping: Option<&ColumnMapping>,
        recipient: Option<&str>,
        date: NaiveDate,
    ) -> Result<RunOutcome, DispatchError> {
        let date_label = date.format("%Y-%m-%d").to_string();
        let run_dir = self.output.output_dir.join(&date_label);

        let records = source.fetch().await.map_err(|error| DispatchError::Source {
            source_name: source.describe(),
            error,
        })?;
        if records.is_empty() {
            info!("no data to process");
            return Ok(RunOutcome::nothing_to_process());
        }
        info!("fetched {} record(s)", records.len());

        tokio::fs::create_dir_all(&run_dir)
            .await
            .map_err(|error| DispatchError::OutputDir {
                path: run_dir.clone(),
                error,
            })?;

        let language = self.output.language;
        let mut artifacts = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for (index, raw) in records.iter().enumerate() {
            let ordinal = index + 1;
            info!("processing record {}/{}", ordinal, records.len());

            let record = normalize_record(raw, &CanonicalField::ALL, mapping);
            let summary = self.enricher.summarize(&record).await;
            let context = assemble_context(&record, summary, language);
            let path = run_dir.join(artifact_file_name(ordinal, &context.client));

            match self.render(context, &path).await {
                Ok(()) => {
                    info!("rendered {}", path.display());
                    artifacts.push(path);
                }
                Err(e) => {
                    error!("skipping record {}: render failed: {}", ordinal, e);
                    skipped += 1;
                }
            }
        }

        if artifacts.is_empty() {
            return Err(DispatchError::NoArtifacts { skipped });
        }

        let archive_path = run_dir.join(self.output.archive_file_name(&date_label));
        let archive = match self.archive(&artifacts, &archive_path).await {
            Ok(archive) => archive,
            Err(error) => {
                return Err(DispatchError::Archive {
                    error,
                    artifacts,
                    skipped,
                })
            }
        };

        let mut warnings = Vec::new();
        let recipient = recipient
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or(self.output.default_recipient.as_deref());
        match recipient {
            Some(to) => {
                if let Err(e) = self.send_archive(to, &archive, &date_label).await {
                    let message = format!("failed to send reports to {}: {}", to, e);
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
            None => {
                let message = "no recipient configured, archive not mailed".to_string();
                warn!("{}", message);
                warnings.push(message);
            }
        }

        let mut message = format!("Generated {} report(s)", artifacts.len());
        if skipped > 0 {
            message.push_str(&format!(", skipped {}", skipped));
        }

        Ok(RunOutcome {
            status: RunStatus::Success,
            message,
            artifacts,
            archive: Some(archive),
            skipped,
            warnings,
        })
    }

    /// Renders on the blocking pool and waits for it.
    async fn render(&self, context: ReportContext, path: &Path) -> Result<(), RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let output = path.to_path_buf();
        tokio::task::spawn_blocking(move || renderer.render(&context, &output))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }

    /// Zips on the blocking pool and waits for it.
    async fn archive(&self, artifacts: &[PathBuf], destination: &Path) -> Result<PathBuf, ArchiveError> {
        let artifacts = artifacts.to_vec();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || create_archive(&artifacts, &destination))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))?
    }

    async fn send_archive(
        &self,
        to: &str,
        archive: &Path,
        date_label: &str,
    ) -> Result<(), crate::mail::MailError> {
        let language = self.output.language;
        let mail = OutgoingMail {
            to: to.to_string(),
            subject: language.mail_subject(date_label),
            body: language.mail_body().to_string(),
            attachment: Some(Attachment::from_path(archive)?),
        };
        self.mailer.send(&mail).await?;
        info!("reports sent to {}", to);
        Ok(())
    }
}
