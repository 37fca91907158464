//! Canonical report fields and the fixed strings of each report language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Internal record keys the rest of the pipeline depends on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ClientName,
    Task,
    Status,
    Date,
    Comments,
    Amount,
}

impl CanonicalField {
    /// Every canonical field, in report order.
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::ClientName,
        CanonicalField::Task,
        CanonicalField::Status,
        CanonicalField::Date,
        CanonicalField::Comments,
        CanonicalField::Amount,
    ];

    /// Fields handed to the summary service, in prompt order.
    pub const SUMMARIZABLE: [CanonicalField; 5] = [
        CanonicalField::ClientName,
        CanonicalField::Task,
        CanonicalField::Status,
        CanonicalField::Comments,
        CanonicalField::Date,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::ClientName => "client_name",
            Self::Task => "task",
            Self::Status => "status",
            Self::Date => "date",
            Self::Comments => "comments",
            Self::Amount => "amount",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn label(&self, language: Language) -> &'static str {
        match (language, self) {
            (Language::En, Self::ClientName) => "Client",
            (Language::En, Self::Task) => "Task",
            (Language::En, Self::Status) => "Status",
            (Language::En, Self::Date) => "Date",
            (Language::En, Self::Comments) => "Comments",
            (Language::En, Self::Amount) => "Amount",
            (Language::Uk, Self::ClientName) => "Клієнт",
            (Language::Uk, Self::Task) => "Завдання",
            (Language::Uk, Self::Status) => "Статус",
            (Language::Uk, Self::Date) => "Дата",
            (Language::Uk, Self::Comments) => "Коментарі",
            (Language::Uk, Self::Amount) => "Сума",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Language of the generated reports, prompts and mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Uk,
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language '{0}' (expected 'en' or 'uk')")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "uk" | "ua" | "ukrainian" => Ok(Self::Uk),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

impl Language {
    pub fn report_title(&self) -> &'static str {
        match self {
            Self::En => "Automatic report",
            Self::Uk => "Автоматичний звіт",
        }
    }

    pub fn summary_label(&self) -> &'static str {
        match self {
            Self::En => "Summary",
            Self::Uk => "Висновок",
        }
    }

    /// Returned when a record has nothing worth summarizing.
    pub fn insufficient_data(&self) -> &'static str {
        match self {
            Self::En => "Not enough data for an automatic summary.",
            Self::Uk => "Недостатньо даних для автоматичного висновку.",
        }
    }

    /// Returned when the summary service could not produce a summary.
    pub fn summary_failed(&self) -> &'static str {
        match self {
            Self::En => "Summary generation failed.",
            Self::Uk => "Помилка під час генерації висновку.",
        }
    }

    pub fn unknown_client(&self) -> &'static str {
        match self {
            Self::En => "Unknown",
            Self::Uk => "Невідомо",
        }
    }

    pub fn summary_prompt(&self, facts: &str) -> String {
        match self {
            Self::En => format!(
                "Write a short one-paragraph analytical summary in English based on the following data: {facts}."
            ),
            Self::Uk => format!(
                "Склади короткий аналітичний висновок українською мовою на основі таких даних: {facts}."
            ),
        }
    }

    pub fn mail_subject(&self, date: &str) -> String {
        match self {
            Self::En => format!("Daily report for {date}"),
            Self::Uk => format!("Щоденний звіт за {date}"),
        }
    }

    pub fn mail_body(&self) -> &'static str {
        match self {
            Self::En => "The reports archive is attached.",
            Self::Uk => "Архів зі звітами у вкладенні.",
        }
    }
}

/// One catalog entry as exposed to form builders.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldDescriptor {
    pub key: CanonicalField,
    pub label: String,
}

pub fn field_catalog(language: Language) -> Vec<FieldDescriptor> {
    CanonicalField::ALL
        .iter()
        .map(|field| FieldDescriptor {
            key: *field,
            label: field.label(language).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_from_key() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_key(field.key()), Some(field));
        }
        assert_eq!(CanonicalField::from_key("Client Name"), None);
    }

    #[test]
    fn test_serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&CanonicalField::ClientName).unwrap();
        assert_eq!(json, "\"client_name\"");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("UK".parse::<Language>().unwrap(), Language::Uk);
        assert_eq!(" en ".parse::<Language>().unwrap(), Language::En);
        assert!("de".parse::<Language>().is_err());
    }

    #[test]
    fn test_catalog_lists_every_field_once() {
        let catalog = field_catalog(Language::Uk);
        assert_eq!(catalog.len(), CanonicalField::ALL.len());
        assert_eq!(catalog[0].label, "Клієнт");
    }
}
