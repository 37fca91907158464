//! Summary enrichment - short natural-language summaries of canonical records.
//!
//! - `gemini` - `TextGenerator` backed by the Gemini `generateContent` API

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

use async_trait::async_trait;
use log::{debug, error, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{CanonicalField, Language};
use crate::record::CanonicalRecord;

/// Errors returned by a text-generation service.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary service is not configured: {0}")]
    NotConfigured(String),
    #[error("summary request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("summary service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("summary service returned no text")]
    EmptyResponse,
}

/// A service turning a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Produces the summary paragraph for one record, never failing.
#[derive(Clone)]
pub struct SummaryEnricher {
    generator: Arc<dyn TextGenerator>,
    language: Language,
}

impl SummaryEnricher {
    pub fn new(generator: Arc<dyn TextGenerator>, language: Language) -> Self {
        Self {
            generator,
            language,
        }
    }

    /// Same generator, different output language.
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            language,
        }
    }

    /// Summarize `record`.
    ///
    /// Returns the fixed insufficient-data text without calling the service
    /// when no summarizable field carries a value, and the fixed failure text
    /// when the service errors.
    pub async fn summarize(&self, record: &CanonicalRecord) -> String {
        let facts = summary_facts(record, self.language);
        if facts.is_empty() {
            warn!("no summarizable fields, skipping summary request");
            return self.language.insufficient_data().to_string();
        }

        let prompt = build_prompt(&facts, self.language);
        debug!(
            "requesting summary with prompt: '{}...'",
            prompt.chars().take(100).collect::<String>()
        );

        match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                error!("summary generation failed: {}", SummaryError::EmptyResponse);
                self.language.summary_failed().to_string()
            }
            Err(e) => {
                error!("summary generation failed: {}", e);
                self.language.summary_failed().to_string()
            }
        }
    }
}

/// `(label, value)` pairs of the summarizable fields that hold a value.
/// Missing, blank and `-` values are dropped.
pub fn summary_facts(record: &CanonicalRecord, language: Language) -> Vec<(&'static str, String)> {
    CanonicalField::SUMMARIZABLE
        .iter()
        .filter_map(|field| {
            let value = record.get(*field).display()?;
            let trimmed = value.trim();
            if trimmed == "-" {
                return None;
            }
            Some((field.label(language), trimmed.to_string()))
        })
        .collect()
}

/// Fixed prompt template over `"label: value"` pairs joined by `"; "`.
pub fn build_prompt(facts: &[(&str, String)], language: Language) -> String {
    let joined = facts
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("; ");
    language.summary_prompt(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{normalize_record, RawRecord, RawValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGenerator {
        reply: Result<&'static str, ()>,
        calls: AtomicUsize,
        last_prompt: std::sync::Mutex<Option<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: Result<&'static str, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_prompt: std::sync::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(SummaryError::Api {
                    status: 429,
                    message: "quota exceeded".into(),
                }),
            }
        }
    }

    fn record(cells: &[(&str, RawValue)]) -> CanonicalRecord {
        let raw: RawRecord = cells.iter().cloned().collect();
        normalize_record(&raw, &CanonicalField::ALL, None)
    }

    #[tokio::test]
    async fn test_blank_record_skips_service() {
        let generator = ScriptedGenerator::new(Ok("unused"));
        let enricher = SummaryEnricher::new(generator.clone(), Language::En);

        let summary = enricher
            .summarize(&record(&[
                ("client_name", RawValue::text("")),
                ("task", RawValue::text("-")),
                ("status", RawValue::text("  ")),
                ("amount", RawValue::Number(10.0)),
            ]))
            .await;

        assert_eq!(summary, Language::En.insufficient_data());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_lists_labelled_pairs() {
        let generator = ScriptedGenerator::new(Ok("  All good.  "));
        let enricher = SummaryEnricher::new(generator.clone(), Language::En);

        let summary = enricher
            .summarize(&record(&[
                ("client_name", RawValue::text("Acme")),
                ("status", RawValue::text("Done")),
                ("comments", RawValue::text("-")),
            ]))
            .await;

        assert_eq!(summary, "All good.");
        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Client: Acme; Status: Done."));
        assert!(!prompt.contains("Comments"));
    }

    #[tokio::test]
    async fn test_service_error_becomes_fallback_text() {
        let generator = ScriptedGenerator::new(Err(()));
        let enricher = SummaryEnricher::new(generator.clone(), Language::Uk);

        let summary = enricher
            .summarize(&record(&[("task", RawValue::text("Audit"))]))
            .await;

        assert_eq!(summary, Language::Uk.summary_failed());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_becomes_fallback_text() {
        let generator = ScriptedGenerator::new(Ok("   "));
        let enricher = SummaryEnricher::new(generator, Language::En);

        let summary = enricher
            .summarize(&record(&[("task", RawValue::text("Audit"))]))
            .await;

        assert_eq!(summary, Language::En.summary_failed());
    }

    #[test]
    fn test_summary_facts_follow_prompt_order() {
        let facts = summary_facts(
            &record(&[
                ("date", RawValue::text("2024-05-01")),
                ("client_name", RawValue::text("Acme")),
                ("comments", RawValue::text("Call back")),
            ]),
            Language::En,
        );
        let labels: Vec<_> = facts.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, vec!["Client", "Comments", "Date"]);
    }
}
