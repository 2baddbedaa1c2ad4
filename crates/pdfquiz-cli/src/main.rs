use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pdfquiz_core::config_file::{self, ApiKeysConfig, ConfigFile, ModelConfig};
use pdfquiz_core::{
    Difficulty, GeminiClient, QuizSettings, SummaryProgress, create_quiz,
    extract_non_empty, generate_summary_with_progress, write_summary,
};
use pdfquiz_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// PDF Quiz - Summarize a PDF with Gemini and generate a multiple-choice quiz
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text extracted from a PDF
    Extract {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Drop text in the top fraction of each page (e.g. 0.05)
        #[arg(long, default_value_t = 0.0)]
        header_exclusion: f32,

        /// Drop text in the bottom fraction of each page (e.g. 0.05)
        #[arg(long, default_value_t = 0.0)]
        footer_exclusion: f32,
    },

    /// Summarize a PDF
    Summarize {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Gemini API key (falls back to GEMINI_API_KEY, then the config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Write the summary to this file as well as stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Summarize a PDF and generate a multiple-choice quiz from the summary
    Quiz {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Number of questions (1-50)
        #[arg(short = 'n', long, default_value_t = 5)]
        questions: u32,

        /// Difficulty: easy, medium or hard
        #[arg(short, long, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,

        /// Gemini API key (falls back to GEMINI_API_KEY, then the config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Print answers and rationales after each question
        #[arg(long)]
        show_answers: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show or update the saved configuration
    Config {
        /// Save this Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Save this model name
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config().with_env();

    match cli.command {
        Command::Extract {
            file_path,
            header_exclusion,
            footer_exclusion,
        } => {
            let backend = MupdfBackend::new()
                .with_header_exclusion(header_exclusion)
                .with_footer_exclusion(footer_exclusion);
            let text = extract(&backend, &file_path).await?;
            println!("{text}");
            Ok(())
        }
        Command::Summarize {
            file_path,
            api_key,
            model,
            output,
            no_color,
        } => {
            let color = ColorMode(!no_color);
            let client = build_client(&config, api_key, model)?;
            let summary = summarize(&config, &client, &file_path, color).await?;

            if let Some(path) = output.or_else(|| config.summary_output_path()) {
                write_summary(&path, &summary)?;
                eprintln!("Summary written to {}", path.display());
            }
            let mut out = std::io::stdout().lock();
            output::print_summary(&mut out, &summary, color)?;
            Ok(())
        }
        Command::Quiz {
            file_path,
            questions,
            difficulty,
            api_key,
            model,
            show_answers,
            no_color,
        } => {
            let color = ColorMode(!no_color);
            let settings = QuizSettings::new(questions, difficulty)?;
            let client = build_client(&config, api_key, model)?;
            let summary = summarize(&config, &client, &file_path, color).await?;

            eprintln!(
                "Generating {} {} questions...",
                settings.num_questions, settings.difficulty
            );
            let quiz = create_quiz(&client, &summary, &settings, config.retry_policy()).await?;
            if quiz.is_empty() {
                anyhow::bail!("The model returned no questions. Try again.");
            }

            let mut out = std::io::stdout().lock();
            output::print_quiz(&mut out, &quiz, show_answers, color)?;
            Ok(())
        }
        Command::Config { api_key, model } => update_config(api_key, model),
    }
}

/// Resolve the API key (flag > env > config file) and build a client.
fn build_client(
    config: &ConfigFile,
    api_key: Option<String>,
    model: Option<String>,
) -> anyhow::Result<GeminiClient> {
    let api_key = api_key
        .or_else(|| config.gemini_api_key().map(str::to_string))
        .unwrap_or_default();
    if api_key.trim().is_empty() {
        anyhow::bail!(
            "No Gemini API key. Pass --api-key, set GEMINI_API_KEY, or run: pdfquiz config --api-key <KEY>"
        );
    }

    let client = config.gemini_client(&api_key)?;
    Ok(match model {
        Some(name) => client.with_model(name),
        None => client,
    })
}

async fn extract(backend: &MupdfBackend, path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let backend = backend.clone();
    let path = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || extract_non_empty(&backend, &path)).await??;
    Ok(text)
}

async fn summarize(
    config: &ConfigFile,
    client: &GeminiClient,
    path: &Path,
    color: ColorMode,
) -> anyhow::Result<String> {
    let text = extract(&MupdfBackend::new(), path).await?;
    eprintln!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );

    let progress = |event: SummaryProgress| {
        let mut err = std::io::stderr().lock();
        let _ = output::print_progress(&mut err, &event, color);
    };
    let summary =
        generate_summary_with_progress(client, &text, &config.summary_options(), progress).await?;
    Ok(summary)
}

/// Merge new values into the platform config file, or print it when nothing is given.
fn update_config(api_key: Option<String>, model: Option<String>) -> anyhow::Result<()> {
    let path = config_file::config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    let current = config_file::load_from_path(&path).unwrap_or_default();

    if api_key.is_none() && model.is_none() {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Config file: {}", path.display())?;
        writeln!(out, "Model: {}", current.model_name())?;
        writeln!(
            out,
            "API key: {}",
            if current.gemini_api_key().is_some() {
                "set"
            } else {
                "not set"
            }
        )?;
        return Ok(());
    }

    let overlay = ConfigFile {
        api_keys: api_key.map(|key| ApiKeysConfig {
            gemini_api_key: Some(key),
        }),
        model: model.map(|name| ModelConfig {
            name: Some(name),
            ..ModelConfig::default()
        }),
        ..ConfigFile::default()
    };
    let saved = config_file::save_config(&config_file::merge(current, overlay))
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("Saved {}", saved.display());
    Ok(())
}
