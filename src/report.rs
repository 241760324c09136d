//! Optional per-file CSV report of a run.

use crate::convert::{display_name, FileOutcome};
use anyhow::{Context, Result};
use csv::Writer;
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    file: &'a str,
    status: &'static str,
    body_words: Option<usize>,
    abstract_words: Option<usize>,
    total_words: Option<usize>,
    output: Option<String>,
    error: Option<String>,
}

pub struct ReportWriter {
    writer: Writer<File>,
    file_path: PathBuf,
    rows: usize,
}

impl ReportWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory structure for: {}", file_path.display()))?;
        }
        let writer = Writer::from_path(&file_path)
            .with_context(|| format!("Failed to create report file: {}", file_path.display()))?;
        info!("Writing per-file report to: {}", file_path.display());
        Ok(Self { writer, file_path, rows: 0 })
    }

    pub fn record(&mut self, input: &Path, outcome: &FileOutcome) -> Result<()> {
        let file_name = display_name(input);

        let row = match outcome {
            FileOutcome::Converted { output, words } => ReportRow {
                file: &file_name,
                status: "converted",
                body_words: Some(words.body),
                abstract_words: Some(words.abstract_words),
                total_words: Some(words.total()),
                output: Some(output.display().to_string()),
                error: None,
            },
            FileOutcome::BelowThreshold { words } => ReportRow {
                file: &file_name,
                status: "below_threshold",
                body_words: Some(words.body),
                abstract_words: Some(words.abstract_words),
                total_words: Some(words.total()),
                output: None,
                error: None,
            },
            FileOutcome::Failed { error } => ReportRow {
                file: &file_name,
                status: "failed",
                body_words: None,
                abstract_words: None,
                total_words: None,
                output: None,
                error: Some(format!("{:#}", error)),
            },
        };

        self.writer
            .serialize(row)
            .with_context(|| format!("Failed to write report row to: {}", self.file_path.display()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush report file: {}", self.file_path.display()))?;
        Ok(self.rows)
    }
}
