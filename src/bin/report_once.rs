//! One-shot report run.
//!
//! Reads the sheet named by `GOOGLE_SHEET_ID`, or the CSV file given as the
//! first argument, and mails the archive to `EMAIL_TO_DEFAULT`.

use anyhow::{bail, Context};
use auto_report_server::source::{CsvSource, RecordSource};
use auto_report_server::{build_state, AppConfig, RunStatus};
use log::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let state = build_state(&config)?;

    let source: Box<dyn RecordSource> = match std::env::args().nth(1) {
        Some(path) => {
            let content = std::fs::read(&path).with_context(|| format!("failed to read {path}"))?;
            Box::new(CsvSource::new(path, content))
        }
        None => match config.sheet_id.clone() {
            Some(sheet_id) => Box::new(state.sheets.sheet(sheet_id)),
            None => bail!("set GOOGLE_SHEET_ID or pass a CSV file path"),
        },
    };

    let outcome = state.dispatcher.run(source.as_ref(), None, None).await;
    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    match outcome.status {
        RunStatus::Failed => {
            error!("{}", outcome.message);
            std::process::exit(1);
        }
        _ => {
            info!("{}", outcome.message);
            Ok(())
        }
    }
}
