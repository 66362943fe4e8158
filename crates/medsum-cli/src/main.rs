use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medsum_core::config_file::Settings;
use medsum_core::{AnalysisRequest, AppContext, PipelineError};
use medsum_onnx::OnnxModelProvider;
use medsum_pdf_mupdf::MupdfBackend;

mod output;

use output::{ColorMode, Format};

/// Disease Research Paper Summarizer - Summarize research PDFs and tag biomedical entities
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a PDF and list the biomedical entities it mentions
    Analyze {
        /// Path to the research paper PDF
        file_path: PathBuf,

        /// Disease the paper is about (shown in the report)
        #[arg(short, long)]
        disease: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory holding the exported summarization model
        #[arg(long, env = "MEDSUM_SUMMARIZER_MODEL")]
        summarizer_model: Option<PathBuf>,

        /// Directory holding the exported NER model
        #[arg(long, env = "MEDSUM_NER_MODEL")]
        ner_model: Option<PathBuf>,
    },

    /// Print the normalized text of a PDF without running any model
    Extract {
        /// Path to the PDF
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            file_path,
            disease,
            format,
            no_color,
            output,
            summarizer_model,
            ner_model,
        } => {
            analyze(
                file_path,
                disease,
                format,
                no_color,
                output,
                summarizer_model,
                ner_model,
            )
            .await
        }
        Command::Extract {
            file_path,
            no_color,
            output,
        } => extract(file_path, no_color, output),
    }
}

fn open_writer(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    })
}

fn read_document(file_path: &Path) -> anyhow::Result<Vec<u8>> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    Ok(std::fs::read(file_path)?)
}

async fn analyze(
    file_path: PathBuf,
    disease: String,
    format: Format,
    no_color: bool,
    output: Option<PathBuf>,
    summarizer_model: Option<PathBuf>,
    ner_model: Option<PathBuf>,
) -> anyhow::Result<()> {
    let disease = disease.trim().to_string();
    if disease.is_empty() {
        anyhow::bail!("Please provide a disease name.");
    }
    let document = read_document(&file_path)?;

    // Resolve configuration: CLI flags > env vars > config files > defaults
    let mut settings = Settings::load();
    if let Some(dir) = summarizer_model {
        settings.summarizer_dir = dir;
    }
    if let Some(dir) = ner_model {
        settings.ner_dir = dir;
    }

    let use_color = !no_color && output.is_none();
    let color = ColorMode(use_color);
    let mut writer = open_writer(&output)?;

    if format == Format::Text {
        output::print_status(&mut writer, &disease, color)?;
    }

    let ctx = AppContext::new(
        Arc::new(MupdfBackend::new()),
        Arc::new(OnnxModelProvider::from_settings(&settings)),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Summarizing and tagging entities...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let name = disease.clone();
    let result = tokio::task::spawn_blocking(move || {
        medsum_core::analyze(
            &ctx,
            AnalysisRequest {
                document: &document,
                disease_name: &name,
            },
        )
    })
    .await?;
    spinner.finish_and_clear();

    match result {
        Ok(analysis) => {
            tracing::info!(
                disease = %analysis.disease_name,
                chars = analysis.text_chars,
                entities = analysis.entities.len(),
                "analysis complete"
            );
            output::print_analysis(&mut writer, &analysis, format, color)?;
        }
        Err(e) if e.is_warning() => {
            output::print_empty_content(&mut writer, &disease, format, color)?;
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(path) = &output {
        eprintln!("Output written to {}", path.display());
    }
    Ok(())
}

fn extract(file_path: PathBuf, no_color: bool, output: Option<PathBuf>) -> anyhow::Result<()> {
    let document = read_document(&file_path)?;
    let use_color = !no_color && output.is_none();
    let mut writer = open_writer(&output)?;

    if use_color {
        writeln!(writer, "{}", "EXTRACT: normalized text only".bold().cyan())?;
    } else {
        writeln!(writer, "EXTRACT: normalized text only")?;
    }
    writeln!(writer)?;

    let backend = MupdfBackend::new();
    match medsum_core::prepare_text(&backend, &document) {
        Ok(text) => {
            writeln!(writer, "{}", text)?;
            writeln!(writer)?;
            if use_color {
                writeln!(writer, "{}", format!("{} characters", text.chars().count()).dimmed())?;
            } else {
                writeln!(writer, "{} characters", text.chars().count())?;
            }
        }
        Err(PipelineError::EmptyContent) => output::print_warning(&mut writer, ColorMode(use_color))?,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
