#![allow(dead_code)]

use async_trait::async_trait;
use auto_report_server::catalog::Language;
use auto_report_server::config::OutputConfig;
use auto_report_server::mail::{MailError, MailTransport, OutgoingMail};
use auto_report_server::record::{RawRecord, RawValue};
use auto_report_server::report::{RenderError, ReportContext, ReportRenderer};
use auto_report_server::source::{RecordSource, SourceError};
use auto_report_server::summary::{SummaryEnricher, SummaryError, TextGenerator};
use auto_report_server::Dispatcher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Writes a tiny fake PDF and records every context it was given.
/// Fails for contexts whose client equals `fail_for`.
pub struct FakeRenderer {
    pub fail_for: Option<String>,
    pub rendered: std::sync::Mutex<Vec<ReportContext>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            fail_for: None,
            rendered: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(client: &str) -> Self {
        Self {
            fail_for: Some(client.to_string()),
            ..Self::new()
        }
    }

    pub fn contexts(&self) -> Vec<ReportContext> {
        self.rendered.lock().unwrap().clone()
    }
}

impl ReportRenderer for FakeRenderer {
    fn render(&self, context: &ReportContext, output: &Path) -> Result<(), RenderError> {
        if self.fail_for.as_deref() == Some(context.client.as_str()) {
            return Err(RenderError::CompilerExit {
                code: 1,
                stderr: "template error".to_string(),
            });
        }
        std::fs::write(output, format!("%PDF-1.7\n{}\n", context.client)).map_err(|source| {
            RenderError::WritePdf {
                path: output.display().to_string(),
                source,
            }
        })?;
        self.rendered.lock().unwrap().push(context.clone());
        Ok(())
    }
}

/// Returns a fixed reply and counts calls.
pub struct CountingGenerator {
    pub reply: Option<String>,
    pub calls: AtomicUsize,
}

impl CountingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(SummaryError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        }
    }
}

/// Keeps every message it was asked to send.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Api {
                status: 401,
                message: "invalid credentials".to_string(),
            });
        }
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

/// In-memory record source.
pub struct StaticSource {
    pub records: Result<Vec<RawRecord>, String>,
}

impl StaticSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: Ok(records),
        }
    }

    pub fn unavailable(message: &str) -> Self {
        Self {
            records: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    fn describe(&self) -> String {
        "static test source".to_string()
    }

    async fn headers(&self) -> Result<Vec<String>, SourceError> {
        let records = self.fetch().await?;
        Ok(records
            .first()
            .map(|record| record.columns().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default())
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        match &self.records {
            Ok(records) => Ok(records.clone()),
            Err(message) => Err(SourceError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

pub fn record(cells: &[(&str, &str)]) -> RawRecord {
    cells
        .iter()
        .map(|(column, value)| (*column, RawValue::text(*value)))
        .collect()
}

/// Collaborators of a test dispatcher, kept for assertions.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub renderer: Arc<FakeRenderer>,
    pub generator: Arc<CountingGenerator>,
    pub mailer: Arc<RecordingMailer>,
    pub output_dir: PathBuf,
}

pub fn harness(
    output_dir: &Path,
    default_recipient: Option<&str>,
    renderer: FakeRenderer,
    generator: CountingGenerator,
    mailer: RecordingMailer,
) -> Harness {
    let renderer = Arc::new(renderer);
    let generator = Arc::new(generator);
    let mailer = Arc::new(mailer);

    let output = OutputConfig {
        output_dir: output_dir.to_path_buf(),
        default_recipient: default_recipient.map(str::to_string),
        ..OutputConfig::default()
    };
    let dispatcher = Dispatcher::new(
        output,
        SummaryEnricher::new(generator.clone(), Language::En),
        renderer.clone(),
        mailer.clone(),
    );

    Harness {
        dispatcher,
        renderer,
        generator,
        mailer,
        output_dir: output_dir.to_path_buf(),
    }
}

pub fn default_harness(output_dir: &Path) -> Harness {
    harness(
        output_dir,
        Some("ops@example.com"),
        FakeRenderer::new(),
        CountingGenerator::replying("Work is on track."),
        RecordingMailer::new(),
    )
}
