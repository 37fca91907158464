//! Environment configuration.
//!
//! Values come from the process environment after `.env` is loaded with
//! `dotenvy`. Blank variables count as unset.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::Language;
use crate::mail::MailConfig;
use crate::source::SheetsConfig;
use crate::summary::GeminiConfig;

pub const DEFAULT_REPORTS_DIR: &str = "reports";
pub const DEFAULT_ARCHIVE_NAME: &str = "all_reports_{date}.zip";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where a run writes its artifacts and how it names the archive.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// Archive file name; `{date}` is replaced with the run date.
    pub archive_name: String,
    pub default_recipient: Option<String>,
    pub language: Language,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            default_recipient: None,
            language: Language::default(),
        }
    }
}

impl OutputConfig {
    pub fn archive_file_name(&self, date: &str) -> String {
        self.archive_name.replace("{date}", date)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub template_path: Option<PathBuf>,
    pub typst_bin: PathBuf,
    pub gemini: GeminiConfig,
    pub sheets: SheetsConfig,
    pub mail: MailConfig,
    pub server: ServerConfig,
    /// Sheet processed by the one-shot binary.
    pub sheet_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let language = match get("REPORT_LANGUAGE") {
            Some(value) => value.parse::<Language>().map_err(|e| {
                ConfigError::Invalid {
                    key: "REPORT_LANGUAGE",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => Language::default(),
        };

        let output = OutputConfig {
            output_dir: get("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
            archive_name: get("ZIP_NAME").unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string()),
            default_recipient: get("EMAIL_TO_DEFAULT"),
            language,
        };

        let gemini_defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL_NAME").unwrap_or(gemini_defaults.model),
            base_url: get("GEMINI_API_BASE").unwrap_or(gemini_defaults.base_url),
        };

        let sheets_defaults = SheetsConfig::default();
        let sheets = SheetsConfig {
            api_key: get("GOOGLE_SHEETS_API_KEY"),
            access_token: get("GOOGLE_SHEETS_ACCESS_TOKEN"),
            base_url: get("GOOGLE_SHEETS_API_BASE").unwrap_or(sheets_defaults.base_url),
            range: get("GOOGLE_SHEET_RANGE").unwrap_or(sheets_defaults.range),
        };

        let mail_defaults = MailConfig::default();
        let mail = MailConfig {
            host: get("MAIL_HOST").unwrap_or(mail_defaults.host),
            port: parse_port("MAIL_PORT", get("MAIL_PORT"), mail_defaults.port)?,
            use_tls: parse_bool("MAIL_TLS", get("MAIL_TLS"), mail_defaults.use_tls)?,
            user: get("EMAIL_USER"),
            access_token: get("MAIL_ACCESS_TOKEN"),
        };

        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_port("SERVER_PORT", get("SERVER_PORT"), 8080)?,
        };

        Ok(Self {
            output,
            template_path: get("REPORT_TEMPLATE").map(PathBuf::from),
            typst_bin: get("TYPST_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("typst")),
            gemini,
            sheets,
            mail,
            server,
            sheet_id: get("GOOGLE_SHEET_ID"),
        })
    }
}

fn parse_port(key: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match value {
        Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.output.output_dir, PathBuf::from("reports"));
        assert_eq!(config.output.archive_file_name("2024-05-01"), "all_reports_2024-05-01.zip");
        assert_eq!(config.output.language, Language::En);
        assert_eq!(config.gemini.model, "models/gemini-1.5-pro-latest");
        assert_eq!(config.mail.port, 443);
        assert!(config.mail.use_tls);
        assert_eq!(config.server.port, 8080);
        assert!(config.output.default_recipient.is_none());
    }

    #[test]
    fn test_values_override_defaults() {
        let config = config_from(&[
            ("REPORTS_DIR", "/tmp/out"),
            ("ZIP_NAME", "bundle-{date}.zip"),
            ("EMAIL_TO_DEFAULT", "ops@example.com"),
            ("REPORT_LANGUAGE", "uk"),
            ("MAIL_PORT", "2525"),
            ("MAIL_TLS", "false"),
            ("GEMINI_MODEL_NAME", "models/gemini-1.5-flash"),
        ])
        .unwrap();

        assert_eq!(config.output.archive_file_name("d"), "bundle-d.zip");
        assert_eq!(config.output.default_recipient.as_deref(), Some("ops@example.com"));
        assert_eq!(config.output.language, Language::Uk);
        assert_eq!(config.mail.port, 2525);
        assert!(!config.mail.use_tls);
        assert_eq!(config.gemini.model, "models/gemini-1.5-flash");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("EMAIL_TO_DEFAULT", "  "), ("REPORTS_DIR", "")]).unwrap();
        assert!(config.output.default_recipient.is_none());
        assert_eq!(config.output.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(matches!(
            config_from(&[("MAIL_PORT", "smtp")]),
            Err(ConfigError::Invalid { key: "MAIL_PORT", .. })
        ));
        assert!(config_from(&[("REPORT_LANGUAGE", "fr")]).is_err());
        assert!(config_from(&[("MAIL_TLS", "maybe")]).is_err());
    }
}
