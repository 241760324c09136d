//! Batch driver: scan the input directory, convert every matching file and
//! write the accepted records as pretty-printed JSON.

use crate::config::ConverterConfig;
use crate::extract::{extract_record, ArticleRecord, WordCounts};
use crate::report::ReportWriter;
use crate::tree;
use anyhow::{anyhow, bail, Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum FileOutcome {
    Converted { output: PathBuf, words: WordCounts },
    BelowThreshold { words: WordCounts },
    Failed { error: anyhow::Error },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_found: usize,
    pub processed: usize,
    pub skipped_below_threshold: usize,
    pub skipped_failed: usize,
    pub failed_files: Vec<PathBuf>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_below_threshold + self.skipped_failed
    }

    fn tally(&mut self, input: &Path, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Converted { .. } => self.processed += 1,
            FileOutcome::BelowThreshold { .. } => self.skipped_below_threshold += 1,
            FileOutcome::Failed { .. } => {
                self.skipped_failed += 1;
                self.failed_files.push(input.to_path_buf());
            }
        }
    }
}

/// Whether a record carries enough body and abstract text to be kept.
pub fn passes_gate(words: &WordCounts, min_word_count: usize) -> bool {
    words.total() >= min_word_count
}

pub fn run(config: &ConverterConfig) -> Result<RunSummary> {
    config.validate()?;

    if !config.input_dir.is_dir() {
        bail!(
            "Input folder '{}' not found (create it and add your XML files)",
            config.input_dir.display()
        );
    }

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output folder: {}", config.output_dir.display()))?;

    let files = find_input_files(&config.input_dir, &config.extension)?;
    let mut summary = RunSummary {
        files_found: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        warn!(
            "No {} files found in '{}'",
            config.extension,
            config.input_dir.display()
        );
        return Ok(summary);
    }

    info!("Found {} file(s) to process...", files.len());
    info!("Minimum word count: {} words", config.min_word_count);

    let mut report = match &config.report_path {
        Some(path) => Some(ReportWriter::create(path)?),
        None => None,
    };

    let progress_bar = if config.show_progress {
        ProgressBar::new(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=> "),
    );

    for path in &files {
        let outcome = convert_file(path, config)?;
        let file_name = display_name(path);

        match &outcome {
            FileOutcome::Converted { output, .. } => {
                info!("Saved to: {}", output.display());
                progress_bar.set_message(format!("OK: {}", file_name));
            }
            FileOutcome::BelowThreshold { words } => {
                warn!(
                    "Skipping {}: only {} words (body {}, abstract {}; minimum: {})",
                    file_name,
                    words.total(),
                    words.body,
                    words.abstract_words,
                    config.min_word_count
                );
                progress_bar.set_message(format!("SHORT: {}", file_name));
            }
            FileOutcome::Failed { error } => {
                error!("Error parsing {}: {:#}", path.display(), error);
                progress_bar.set_message(format!("ERR: {}", file_name));
            }
        }

        summary.tally(path, &outcome);
        if let Some(report) = report.as_mut() {
            report.record(path, &outcome)?;
        }
        progress_bar.inc(1);
    }

    progress_bar.finish_with_message(format!(
        "Processing finished. {} converted, {} skipped.",
        summary.processed,
        summary.skipped()
    ));

    if let Some(report) = report {
        let rows = report.finish()?;
        debug!("Report complete with {} rows.", rows);
    }

    Ok(summary)
}

/// Parse, gate and (if accepted) write a single document. Document-level
/// problems come back as `FileOutcome::Failed`; only output write errors
/// are returned as `Err`.
pub fn convert_file(path: &Path, config: &ConverterConfig) -> Result<FileOutcome> {
    let root = match tree::parse_file(path) {
        Ok(root) => root,
        Err(error) => return Ok(FileOutcome::Failed { error }),
    };

    let record = extract_record(&root);
    let words = record.word_counts();
    debug!(
        "{}: {} body words, {} abstract words",
        path.display(),
        words.body,
        words.abstract_words
    );

    if !passes_gate(&words, config.min_word_count) {
        return Ok(FileOutcome::BelowThreshold { words });
    }

    let output = match output_path_for(path, config) {
        Ok(output) => output,
        Err(error) => return Ok(FileOutcome::Failed { error }),
    };
    write_record(&record, &output)?;
    Ok(FileOutcome::Converted { output, words })
}

fn output_path_for(path: &Path, config: &ConverterConfig) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("File name is not valid UTF-8: {}", path.display()))?;
    let output_name = config
        .output_file_name(file_name)
        .ok_or_else(|| anyhow!("File name does not end with '{}': {}", config.extension, file_name))?;
    Ok(config.output_dir.join(output_name))
}

/// Writes the record with four-space indentation. Non-ASCII text is written
/// as-is; existing files are overwritten.
pub fn write_record(record: &ArticleRecord, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut serializer = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    record
        .serialize(&mut serializer)
        .with_context(|| format!("Failed to serialize record to: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", path.display()))?;
    Ok(())
}

/// Immediate entries of `input_dir` whose name ends with `extension`
/// (case-sensitive). Directories are left out.
pub fn find_input_files(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}",
        Pattern::escape(&input_dir.to_string_lossy()),
        Pattern::escape(extension)
    );
    debug!("Searching for files matching pattern: {}", pattern);

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths: Vec<PathBuf> = glob_with(&pattern, options)
        .with_context(|| format!("Invalid search pattern: {}", pattern))?
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .collect();
    Ok(paths)
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn gate_is_inclusive_at_threshold() {
        let words = WordCounts { body: 30, abstract_words: 20 };
        assert!(passes_gate(&words, 50));
        assert!(!passes_gate(&words, 51));
        assert!(passes_gate(&WordCounts::default(), 0));
    }

    #[test]
    fn finds_only_matching_immediate_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.xml"), "<a/>").unwrap();
        fs::write(tmp.path().join("b.XML"), "<b/>").unwrap();
        fs::write(tmp.path().join("c.xml.bak"), "<c/>").unwrap();
        fs::create_dir(tmp.path().join("dir.xml")).unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("d.xml"), "<d/>").unwrap();

        let files = find_input_files(tmp.path(), ".xml").unwrap();
        assert_eq!(files, vec![tmp.path().join("a.xml")]);
    }

    #[test]
    fn input_directory_with_glob_characters_is_escaped() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("batch[1]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.xml"), "<a/>").unwrap();

        let files = find_input_files(&dir, ".xml").unwrap();
        assert_eq!(files, vec![dir.join("a.xml")]);
    }

    #[test]
    fn writes_pretty_json_with_four_space_indent_and_literal_unicode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");
        let record = ArticleRecord {
            title: "Über Graphen".to_string(),
            abstract_text: "No abstract".to_string(),
            body: "Körper".to_string(),
            citations: vec![],
            references: vec![],
            datasets: vec![],
            authors: vec!["Zoë".to_string()],
            publication_date: "Unknown".to_string(),
            keywords: vec![],
            institution: "Unknown Institution".to_string(),
        };
        write_record(&record, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("{\n    \"title\": \"Über Graphen\",\n"));
        assert!(contents.contains("    \"citations\": [],\n"));
        assert!(contents.contains("    \"authors\": [\n        \"Zoë\"\n    ],\n"));
        assert!(contents.contains("\"publication date\": \"Unknown\""));
        assert!(!contents.contains("\\u"));
    }
}
