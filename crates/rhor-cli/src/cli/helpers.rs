use super::CliError;
use anyhow::Context;
use rhor_core::domain::{AnalysisRecord, RhorError};
use rhor_core::modules::serialization::{render_record_json, render_record_table, write_record_json};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum OutputFormat {
    Json,
    Table,
}

#[derive(clap::Args)]
pub(super) struct OutputFlags {
    /// Output format printed on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(super) format: OutputFormat,

    /// Also write the record as JSON to this path
    #[arg(long)]
    pub(super) output: Option<PathBuf>,
}

pub(super) fn read_text(path: &Path, what: &str) -> Result<String, CliError> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} '{}'", path.display()))
        .map_err(CliError::from)
}

pub(super) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let content = read_text(path, what)?;
    serde_json::from_str(&content).map_err(|source| {
        CliError::Compute(RhorError::input_validation(
            "INPUT.CLI_JSON",
            format!("failed to parse {what} '{}': {source}", path.display()),
        ))
    })
}

pub(super) fn emit_record(record: &AnalysisRecord, flags: &OutputFlags) -> Result<(), CliError> {
    match flags.format {
        OutputFormat::Json => println!("{}", render_record_json(record)?),
        OutputFormat::Table => print!("{}", render_record_table(record)),
    }
    if let Some(path) = &flags.output {
        write_record_json(path, record)?;
        tracing::info!(path = %path.display(), "wrote analysis record");
    }
    Ok(())
}
