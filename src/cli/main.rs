use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use scribe::common::ImageInput;
use scribe::export::write_text_export;
use scribe::history::HistoryStore;
use scribe::process::{OcrOrchestrator, ProcessorConfig, RecognitionOutcome};
use scribescan::common::utils::{init_logger_exe, join_task, load_dotenv, spawn_progress_logger};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "A CLI tool to turn handwriting into text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize text in one image
    Scan {
        #[arg(
            long,
            conflicts_with = "reference",
            help = "input file in image (png, jpeg, gif, webp, tiff, bmp) format"
        )]
        image: Option<PathBuf>,
        #[arg(long, help = "URL or data URI of the image, processed locally")]
        reference: Option<String>,
        #[arg(long, help = "OCR language, e.g. eng or eng+deu")]
        language: Option<String>,
        #[arg(long, help = "write the recognized text with a header to this file")]
        export: Option<PathBuf>,
        #[arg(long, help = "print the outcome as JSON")]
        json: bool,
        #[arg(long, help = "do not record the result in history")]
        no_history: bool,
    },
    /// Show or edit recent recognitions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    Show { id: String },
    Remove { id: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_logger_exe();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            image,
            reference,
            language,
            export,
            json,
            no_history,
        } => {
            let (input, original) = match (image, reference) {
                (Some(path), _) => (ImageInput::from_path(&path)?, path.display().to_string()),
                (None, Some(reference)) => (ImageInput::from_reference(reference.clone()), reference),
                (None, None) => bail!("Either --image or --reference is required"),
            };
            scan(input, &original, language.as_deref(), export, json, no_history).await
        }
        Command::History { action } => history(action),
    }
}

async fn scan(
    input: ImageInput,
    original: &str,
    language: Option<&str>,
    export: Option<PathBuf>,
    json: bool,
    no_history: bool,
) -> Result<()> {
    let config = ProcessorConfig::from_env();
    let orchestrator = OcrOrchestrator::from_config(&config);

    let reporter = spawn_progress_logger(orchestrator.subscribe());

    let start = std::time::Instant::now();
    let outcome = orchestrator.process_image(&input, language).await;
    log::info!("Time taken: {:.2?}", start.elapsed());
    drop(orchestrator);
    join_task("Progress reporter", reporter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    let result = match outcome {
        RecognitionOutcome::Success(result) => result,
        RecognitionOutcome::Failure { message } => bail!("Recognition failed: {}", message),
    };

    if !json {
        println!("{}", result.text);
    }
    log::info!(
        "Recognized {} characters with {} engine, confidence {:.0}%",
        result.text.chars().count(),
        result.engine,
        result.confidence
    );

    if let Some(path) = export {
        write_text_export(&path, &result, original)?;
    }

    if !no_history {
        match HistoryStore::open_default().and_then(|history| history.add(original, &result)) {
            Ok(item) => log::debug!("Saved to history as {}", item.id),
            Err(e) => log::error!("Failed to save history: {:#}", e),
        }
    }

    Ok(())
}

fn history(action: HistoryAction) -> Result<()> {
    let store = HistoryStore::open_default()?;

    match action {
        HistoryAction::List => {
            for item in store.list()? {
                let preview: String = item.processed_text.lines().next().unwrap_or("").chars().take(60).collect();
                println!(
                    "{}  {}  {:>3.0}%  {:<9}  {}",
                    item.id, item.timestamp, item.confidence, item.engine, preview
                );
            }
        }
        HistoryAction::Show { id } => match store.get(&id)? {
            Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
            None => bail!("No history entry {}", id),
        },
        HistoryAction::Remove { id } => {
            if !store.remove(&id)? {
                bail!("No history entry {}", id);
            }
            log::info!("Removed {}", id);
        }
        HistoryAction::Clear => {
            let removed = store.clear()?;
            log::info!("Cleared {} history entries", removed);
        }
    }

    Ok(())
}
