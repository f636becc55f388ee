use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docsum::{
    config,
    extraction::{DocumentFormat, Extractor},
    logging,
    summarization::{SummarizationEngine, SummaryMode, SummaryOutput},
};
use serde::Serialize;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Extract and summarize documents from the command line"
)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the extracted text of a document.
    Extract { path: PathBuf },
    /// Summarize a single document.
    Summarize {
        path: PathBuf,
        #[arg(long, default_value = "both")]
        mode: SummaryMode,
    },
    /// Summarize every supported document under a directory, one JSON line per file.
    Batch {
        dir: PathBuf,
        #[arg(long, default_value = "both")]
        mode: SummaryMode,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing(cli.verbose);
    let config = config::init_config().context("failed to load configuration")?;
    let extractor = Extractor::new(config.extraction_limits());

    match cli.command {
        Command::Extract { path } => {
            let text = extract_file(&extractor, &path)?;
            write_stdout(&format!("{text}\n"))
        }
        Command::Summarize { path, mode } => {
            let engine = SummarizationEngine::from_config(config);
            let text = extract_file(&extractor, &path)?;
            let output = engine
                .summarize(&text, mode)
                .await
                .with_context(|| format!("failed to summarize {}", path.display()))?;
            if engine.is_fallback() {
                tracing::warn!("Summaries produced by the extractive fallback");
            }
            write_stdout(&render_summary(&output))
        }
        Command::Batch { dir, mode } => {
            let engine = SummarizationEngine::from_config(config);
            let files = collect_supported_files(&dir)?;
            if files.is_empty() {
                bail!("no PDF, DOCX, or TXT files found under {}", dir.display());
            }
            let mut failures = 0usize;
            for path in &files {
                let record = summarize_entry(&extractor, &engine, path, mode).await;
                if record.error.is_some() {
                    failures += 1;
                }
                let line =
                    serde_json::to_string(&record).context("failed to encode batch record")?;
                write_stdout(&format!("{line}\n"))?;
            }
            tracing::info!(files = files.len(), failures, "Batch finished");
            Ok(())
        }
    }
}

fn extract_file(extractor: &Extractor, path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read document at {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid filename: {}", path.display()))?;
    extractor
        .extract(&bytes, filename, bytes.len() as u64)
        .with_context(|| format!("unable to process file {}", path.display()))
}

/// One line of `batch` output.
#[derive(Serialize)]
struct BatchRecord {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    short_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detailed_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn summarize_entry(
    extractor: &Extractor,
    engine: &SummarizationEngine,
    path: &Path,
    mode: SummaryMode,
) -> BatchRecord {
    let mut record = BatchRecord {
        path: path.display().to_string(),
        chars: None,
        short_summary: None,
        detailed_notes: None,
        error: None,
    };
    let text = match extract_file(extractor, path) {
        Ok(text) => text,
        Err(err) => {
            record.error = Some(format!("{err:#}"));
            return record;
        }
    };
    record.chars = Some(text.chars().count());
    match engine.summarize(&text, mode).await {
        Ok(output) => {
            record.short_summary = Some(output.short_summary);
            record.detailed_notes = Some(output.detailed_notes);
        }
        Err(err) => record.error = Some(err.to_string()),
    }
    record
}

/// Supported documents under `dir`, sorted for stable output.
fn collect_supported_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .file_name()
            .to_str()
            .and_then(DocumentFormat::from_filename)
            .is_some();
        if supported {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn render_summary(output: &SummaryOutput) -> String {
    let mut rendered = String::new();
    if !output.short_summary.is_empty() {
        rendered.push_str("Summary:\n");
        rendered.push_str(&output.short_summary);
        rendered.push_str("\n\n");
    }
    if !output.detailed_notes.is_empty() {
        rendered.push_str("Notes:\n");
        rendered.push_str(&output.detailed_notes);
        rendered.push('\n');
    }
    rendered
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .context("failed to write to stdout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsum::extraction::ExtractionLimits;
    use docsum::summarization::{DisabledModelLoader, LengthBounds, SummaryLengths};
    use tempfile::tempdir;

    #[test]
    fn collects_only_supported_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("nested dir");
        fs::write(dir.path().join("a.txt"), "alpha").expect("write");
        fs::write(nested.join("B.PDF"), "pdf").expect("write");
        fs::write(nested.join("c.docx"), "docx").expect("write");
        fs::write(dir.path().join("notes.md"), "skip").expect("write");

        let files = collect_supported_files(dir.path()).expect("files");
        let names: Vec<_> = files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();

        assert_eq!(files.len(), 3);
        assert!(names.contains(&"a.txt"));
        assert!(names.contains(&"B.PDF"));
        assert!(names.contains(&"c.docx"));
    }

    #[test]
    fn rejects_non_directory() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.txt");
        fs::write(&file, "alpha").expect("write");
        assert!(collect_supported_files(&file).is_err());
    }

    #[test]
    fn extract_reads_text_files() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("a.txt");
        fs::write(&file, "  body text \n").expect("write");
        let extractor = Extractor::new(ExtractionLimits {
            max_document_size_mb: 1,
            max_extract_chars: 4,
        });
        assert_eq!(extract_file(&extractor, &file).expect("text"), "body");
    }

    #[tokio::test]
    async fn batch_entry_reports_extraction_errors_inline() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("broken.pdf");
        fs::write(&file, "not a pdf").expect("write");
        let extractor = Extractor::new(ExtractionLimits {
            max_document_size_mb: 1,
            max_extract_chars: 100,
        });
        let bounds = LengthBounds {
            max_length: 40,
            min_length: 10,
        };
        let engine = SummarizationEngine::new(
            Box::new(DisabledModelLoader),
            SummaryLengths {
                short: bounds,
                detailed: bounds,
            },
        );

        let record = summarize_entry(&extractor, &engine, &file, SummaryMode::Both).await;
        assert!(record.error.is_some());
        assert!(record.short_summary.is_none());
    }

    #[test]
    fn render_skips_empty_halves() {
        let output = SummaryOutput {
            short_summary: String::new(),
            detailed_notes: "- One".into(),
        };
        assert_eq!(render_summary(&output), "Notes:\n- One\n");
    }
}
