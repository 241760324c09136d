//! Converts Elsevier full-text article XML into flat JSON records, dropping
//! articles whose body and abstract together fall below a word threshold.

pub mod config;
pub mod convert;
pub mod extract;
pub mod report;
pub mod tree;

pub use config::ConverterConfig;
pub use convert::{run, FileOutcome, RunSummary};
pub use extract::{count_words, extract_record, ArticleRecord, WordCounts};
