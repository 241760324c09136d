//! Run configuration for the converter.

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_INPUT_DIR: &str = "./xml_files";
pub const DEFAULT_OUTPUT_DIR: &str = "./json_output";
pub const DEFAULT_MIN_WORD_COUNT: usize = 50;
pub const DEFAULT_EXTENSION: &str = ".xml";

/// Everything a single batch run needs. Built once at startup and passed
/// down to [`crate::convert::run`].
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Directory scanned (non-recursively) for source documents.
    pub input_dir: PathBuf,
    /// Directory receiving one `.json` file per accepted document.
    pub output_dir: PathBuf,
    /// Documents whose body + abstract word count is below this are skipped.
    pub min_word_count: usize,
    /// Case-sensitive file name suffix, including the leading dot.
    pub extension: String,
    /// Optional CSV file listing the outcome of every input file.
    pub report_path: Option<PathBuf>,
    pub show_progress: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            min_word_count: DEFAULT_MIN_WORD_COUNT,
            extension: DEFAULT_EXTENSION.to_string(),
            report_path: None,
            show_progress: true,
        }
    }
}

impl ConverterConfig {
    pub fn new<I: Into<PathBuf>, O: Into<PathBuf>>(input_dir: I, output_dir: O) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            bail!("File extension must not be empty");
        }
        if self.extension.contains('/') || self.extension.contains('\\') {
            bail!("File extension '{}' must not contain a path separator", self.extension);
        }
        Ok(())
    }

    /// Output file name for an input file name: the configured extension is
    /// replaced by `.json`. Returns `None` when the name doesn't carry it.
    pub fn output_file_name(&self, input_file_name: &str) -> Option<String> {
        input_file_name
            .strip_suffix(self.extension.as_str())
            .map(|stem| format!("{}.json", stem))
    }
}
