//! Typst rendering engine.
//!
//! Binds the report context into a Typst source, writes it to a temporary
//! directory, invokes the compiler, and copies the PDF to its destination.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

use super::common::{escape_typst_string, get_static_dir};
use super::{RenderError, ReportContext, ReportRenderer};
use crate::catalog::CanonicalField;

pub const TEMPLATE_FILE: &str = "report_template.typ";
const SOURCE_FILE: &str = "report.typ";
const OUTPUT_FILE: &str = "report.pdf";

/// Renders contexts through a Typst template and the `typst` CLI.
#[derive(Debug, Clone)]
pub struct TypstReportRenderer {
    template: String,
    typst_bin: PathBuf,
}

impl TypstReportRenderer {
    /// Load the template from `template_path`, or from the bundled static
    /// directory when no path is given.
    pub fn new(template_path: Option<&Path>, typst_bin: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let path = template_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| get_static_dir().join(TEMPLATE_FILE));
        let template = fs::read_to_string(&path).map_err(RenderError::TemplateIo)?;
        Ok(Self::from_template(template, typst_bin))
    }

    pub fn from_template(template: impl Into<String>, typst_bin: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            typst_bin: typst_bin.into(),
        }
    }

    /// Complete Typst source: a `ctx` binding followed by the template body.
    pub fn render_source(&self, context: &ReportContext) -> String {
        let language = context.language;
        let label = |field: CanonicalField| escape_typst_string(field.label(language));

        format!(
            r#"#let ctx = (
  title: "{}",
  client: "{}",
  task: "{}",
  status: "{}",
  summary: "{}",
  comments: "{}",
  date: "{}",
  amount: "{}",
  labels: (
    client: "{}",
    task: "{}",
    status: "{}",
    date: "{}",
    comments: "{}",
    amount: "{}",
    summary: "{}",
  ),
)

{}"#,
            escape_typst_string(&context.title),
            escape_typst_string(&context.client),
            escape_typst_string(&context.task),
            escape_typst_string(&context.status),
            escape_typst_string(&context.summary),
            escape_typst_string(&context.comments),
            escape_typst_string(&context.date),
            escape_typst_string(&context.amount),
            label(CanonicalField::ClientName),
            label(CanonicalField::Task),
            label(CanonicalField::Status),
            label(CanonicalField::Date),
            label(CanonicalField::Comments),
            label(CanonicalField::Amount),
            escape_typst_string(language.summary_label()),
            self.template,
        )
    }
}

impl ReportRenderer for TypstReportRenderer {
    fn render(&self, context: &ReportContext, output: &Path) -> Result<(), RenderError> {
        let temp_dir = tempdir().map_err(RenderError::TempDir)?;
        let source_path = temp_dir.path().join(SOURCE_FILE);
        fs::write(&source_path, self.render_source(context)).map_err(RenderError::WriteSource)?;

        let pdf = compile_typst_to_pdf(&self.typst_bin, temp_dir.path())?;

        fs::write(output, pdf).map_err(|source| RenderError::WritePdf {
            path: output.display().to_string(),
            source,
        })?;
        debug!("rendered '{}' to {}", context.client, output.display());
        Ok(())
    }
}

/// Compile `SOURCE_FILE` inside `work_dir` and return the PDF bytes.
fn compile_typst_to_pdf(typst_bin: &Path, work_dir: &Path) -> Result<Vec<u8>, RenderError> {
    let output_path = work_dir.join(OUTPUT_FILE);

    let result = Command::new(typst_bin)
        .arg("compile")
        .arg(SOURCE_FILE)
        .arg(OUTPUT_FILE)
        .current_dir(work_dir)
        .output()
        .map_err(RenderError::CompilerIo)?;

    if !result.status.success() {
        return Err(RenderError::CompilerExit {
            code: result.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }

    fs::read(&output_path).map_err(RenderError::CompilerIo)
}
