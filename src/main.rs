use anyhow::Result;
use clap::Parser;
use elsevier_xml_json_parse::config::{
    ConverterConfig, DEFAULT_EXTENSION, DEFAULT_INPUT_DIR, DEFAULT_MIN_WORD_COUNT, DEFAULT_OUTPUT_DIR,
};
use elsevier_xml_json_parse::{run, RunSummary};
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use time::macros::format_description;

#[derive(Parser)]
#[command(name = "Elsevier XML to JSON Converter")]
#[command(about = "Convert Elsevier full-text article XML files into JSON records, skipping articles below a minimum word count")]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_INPUT_DIR, help = "Directory containing the XML files")]
    input: PathBuf,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, help = "Directory the JSON files are written to")]
    output: PathBuf,

    #[arg(short = 'm', long, default_value_t = DEFAULT_MIN_WORD_COUNT, help = "Minimum body + abstract word count to keep an article")]
    min_words: usize,

    #[arg(short, long, default_value = DEFAULT_EXTENSION, help = "Case-sensitive suffix of the files to convert")]
    extension: String,

    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,

    #[arg(long, help = "Write a CSV report with the outcome of every file")]
    report: Option<PathBuf>,

    #[arg(long, help = "Disable the progress bar")]
    no_progress: bool,
}

impl Cli {
    fn to_config(&self) -> ConverterConfig {
        ConverterConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            min_word_count: self.min_words,
            extension: self.extension.clone(),
            report_path: self.report.clone(),
            show_progress: !self.no_progress,
        }
    }
}

fn setup_logging(log_level_str: &str) -> Result<()> {
    let log_level = match log_level_str.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            eprintln!("Invalid log level '{}', defaulting to INFO.", other);
            LevelFilter::Info
        }
    };

    SimpleLogger::new()
        .with_level(log_level)
        .with_timestamp_format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .init()?;

    Ok(())
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, elapsed.subsec_millis())
    }
}

fn print_final_summary(start_time: Instant, summary: &RunSummary, config: &ConverterConfig) {
    info!("-------------------- PROCESSING COMPLETE --------------------");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Input files found: {}", summary.files_found);
    info!("Processed: {} files", summary.processed);
    info!(
        "Skipped: {} ({} below {} words, {} failed to parse)",
        summary.skipped(),
        summary.skipped_below_threshold,
        config.min_word_count,
        summary.skipped_failed
    );
    if !summary.failed_files.is_empty() {
        for failed in summary.failed_files.iter().take(10) {
            warn!("  - {}", failed.display());
        }
        if summary.failed_files.len() > 10 {
            warn!("  ... (and {} more)", summary.failed_files.len() - 10);
        }
    }
    info!("Output folder: '{}'", config.output_dir.display());
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    setup_logging(&cli.log_level)?;
    let config = cli.to_config();
    info!("Starting Elsevier XML to JSON conversion");
    info!("Input folder: '{}'", config.input_dir.display());

    let summary = run(&config)?;
    if summary.files_found > 0 {
        print_final_summary(start_time, &summary, &config);
    }

    Ok(())
}
