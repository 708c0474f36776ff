//! # ragpipe CLI
//!
//! Command-line front end for the retrieval pipeline and the agent crew demo.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragpipe ingest` | Scan the document folder and list what would be indexed |
//! | `ragpipe ask "<question>"` | Build the index and answer one question |
//! | `ragpipe crew <writing\|rsac>` | Run a fixed agent crew over a seed file |
//!
//! Answers go to stdout, logs to stderr (`RUST_LOG` controls the filter).
//!
//! ## Examples
//!
//! ```bash
//! ragpipe --config ./ragpipe.toml ask "How do I rotate keys?"
//! ragpipe ask "Summarize the onboarding guide" --no-stream
//! ragpipe crew rsac --seed rsac_seed.txt --log-dir logs
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use serde_json::{Map, Value};

use ragpipe::config::load_valves;
use ragpipe::connector_fs::scan_documents;
use ragpipe::crew::log::{read_seed_file, save_output_to_log};
use ragpipe::crew::tasks::{rsac_crew, rsac_report, writing_crew, writing_report};
use ragpipe::crew::Fields;
use ragpipe::llm::OllamaClient;
use ragpipe::{PipeOutput, Pipeline};

/// Retrieval-augmented question answering over a local document folder.
#[derive(Parser)]
#[command(name = "ragpipe", version, about)]
struct Cli {
    /// Path to a TOML file with a `[valves]` table.
    ///
    /// Environment variables override file values, which override defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the document folder and print the documents that would be indexed.
    Ingest {
        /// Override the configured document path.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Build the index and answer a single question.
    Ask {
        question: String,

        /// Wait for the full answer instead of printing tokens as they arrive.
        #[arg(long)]
        no_stream: bool,
    },

    /// Run a fixed multi-agent crew and save the consolidated output.
    Crew {
        #[arg(value_enum)]
        set: CrewSet,

        /// Seed file whose trimmed contents become the `abstract` field.
        #[arg(long)]
        seed: PathBuf,

        /// Directory for the timestamped output file.
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,

        /// Mission statement for the `rsac` set.
        #[arg(long, default_value = "Create a compelling RSA Conference abstract.")]
        mission: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CrewSet {
    Writing,
    Rsac,
}

#[tokio::main]
async fn main() -> Result<()> {
    ragpipe::telemetry::init();
    let cli = Cli::parse();
    let valves = load_valves(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { path } => {
            let root = path.unwrap_or_else(|| valves.document_path.clone());
            let docs = scan_documents(&root, &valves.include_globs)?;
            println!("{} documents under {}", docs.len(), root.display());
            for doc in &docs {
                println!("  {} ({})", doc.source_id, doc.content_type);
            }
        }
        Commands::Ask { question, no_stream } => {
            let mut pipeline = Pipeline::new(valves)?;
            pipeline.on_startup().await.context("startup failed")?;

            let mut body = Map::new();
            if no_stream {
                body.insert("stream".to_string(), Value::Bool(false));
            }
            let model_id = pipeline.valves().model_name.clone();
            let output = pipeline.pipe(&question, &model_id, &[], &body).await?;

            match output {
                PipeOutput::Text(text) => println!("{}", text),
                PipeOutput::Stream(mut tokens) => {
                    let mut stdout = std::io::stdout();
                    while let Some(fragment) = tokens.next().await {
                        write!(stdout, "{}", fragment)?;
                        stdout.flush()?;
                    }
                    writeln!(stdout)?;
                }
            }
            pipeline.on_shutdown().await;
        }
        Commands::Crew {
            set,
            seed,
            log_dir,
            mission,
        } => {
            let seed_text = read_seed_file(&seed)?;
            let report = match set {
                CrewSet::Writing => {
                    let model =
                        OllamaClient::new(&valves).context("cannot configure model client")?;
                    let crew = writing_crew(Arc::new(model))?;
                    let out = crew
                        .kickoff(Fields::from([("abstract".to_string(), seed_text)]))
                        .await?;
                    writing_report(&out)
                }
                CrewSet::Rsac => {
                    let crew = rsac_crew()?;
                    let out = crew
                        .kickoff(Fields::from([
                            ("abstract".to_string(), seed_text),
                            ("mission".to_string(), mission),
                        ]))
                        .await?;
                    rsac_report(&out)
                }
            };

            let path = save_output_to_log(&report, &log_dir)?;
            println!("{}", report);
            eprintln!("Final output saved to: {}", path.display());
        }
    }

    Ok(())
}
