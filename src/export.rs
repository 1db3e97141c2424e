//! Result export: flattened CSV and structured JSON.
//!
//! The CSV uses the canonical flattened row shape; the JSON export keeps
//! the full result objects (validation notes included) for downstream
//! tooling.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::company::{ExportRow, PipelineResult};
use crate::stats::RunStats;

/// Output format for batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown output format '{}'. Expected 'csv' or 'json'", other),
        }
    }
}

/// Full JSON export document
#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    summary: &'a RunStats,
    results: &'a [PipelineResult],
}

/// Write results to a file in the requested format
pub fn export_results(
    results: &[PipelineResult],
    stats: &RunStats,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }

    match format {
        OutputFormat::Csv => export_csv(results, path)?,
        OutputFormat::Json => export_json(results, stats, path)?,
    }

    info!("Wrote {} results to {}", results.len(), path.display());
    Ok(())
}

fn export_csv(results: &[PipelineResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV output file {:?}", path))?;

    for result in results {
        writer
            .serialize(ExportRow::from_result(result))
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn export_json(results: &[PipelineResult], stats: &RunStats, path: &Path) -> Result<()> {
    let document = JsonExport {
        summary: stats,
        results,
    };
    let content =
        serde_json::to_string_pretty(&document).context("Failed to serialize results")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write JSON output file {:?}", path))?;
    Ok(())
}
