//! Presence checks for report requests.

use std::fmt;

use super::multipart_parser::ReportForm;

/// One failed check, naming the offending form field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// All messages joined into one line for an `ErrorResponse`.
    pub fn to_message(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Exactly one of `file` and `sheet_id` must be present.
pub fn validate_source(form: &ReportForm, errors: &mut ValidationErrors) {
    match (&form.file, &form.sheet_id) {
        (Some(_), Some(_)) => errors.add(ValidationError::new(
            "source",
            "provide either a CSV file or a sheet id, not both",
        )),
        (None, None) => errors.add(ValidationError::new(
            "source",
            "a CSV file or a sheet id is required",
        )),
        _ => {}
    }
}

/// Checks for `POST /api/reports`.
pub fn validate_report_form(form: &ReportForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match form.email.as_deref() {
        None => errors.add(ValidationError::new("email", "email is required")),
        Some(email) if !email.contains('@') => errors.add(ValidationError::new(
            "email",
            format!("'{}' is not a valid email address", email),
        )),
        Some(_) => {}
    }

    validate_source(form, &mut errors);

    if form.file.is_some() && form.mapping.as_ref().map_or(true, |m| m.is_empty()) {
        errors.add(ValidationError::new(
            "mapping",
            "map at least one column of the uploaded CSV",
        ));
    }

    errors.into_result()
}
