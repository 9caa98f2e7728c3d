//! Interview a simulated patient from the terminal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable. Type
//! `exit` or `quit` to end the conversation.
//!
//! # Examples
//!
//! ```sh
//! # Interactive session with the built-in catalog
//! patient-sim
//!
//! # Custom catalog, log file and patient behaviour
//! patient-sim --catalog diseases.json --log-file session.jsonl \
//!   --instructions "Answer briefly and sound anxious."
//!
//! # Replay canned questions from a file
//! patient-sim --script questions.txt --seed 42
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use patient_sim::config::SimConfig;
use patient_sim::controller::EndReason;
use patient_sim::error::SimError;
use patient_sim::events::{CompositeEventHandler, ConversationEvent, EventHandler, LoggingHandler};
use patient_sim::input::{InputSource, LineInput};
use patient_sim::{DEFAULT_LOG_PATH, DEFAULT_MODEL, OpenRouterClient};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Interview a simulated patient.
///
/// Reads the API key from the OPENROUTER_KEY environment variable.
#[derive(Parser)]
#[command(name = "patient-sim")]
struct Cli {
    /// Model used for tone scoring and patient replies
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Maximum tokens per generation call
    #[arg(long, default_value_t = 512)]
    max_tokens: u32,

    /// Append turn records to this JSON Lines file
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_file: PathBuf,

    /// JSON file with the disease catalog (defaults to the built-in one)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Extra steering for the patient's replies
    #[arg(long)]
    instructions: Option<String>,

    /// Seed for choosing the patient profile
    #[arg(long)]
    seed: Option<u64>,

    /// Read doctor questions from a file instead of the terminal
    #[arg(long)]
    script: Option<PathBuf>,
}

impl Cli {
    fn to_config(&self) -> SimConfig {
        SimConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            log_path: self.log_file.clone(),
            catalog_path: self.catalog.clone(),
            instructions: self.instructions.clone().unwrap_or_default(),
            seed: self.seed,
        }
    }
}

/// Prints the conversation the way a doctor expects to read it.
struct ConsoleHandler;

impl EventHandler for ConsoleHandler {
    fn on_event(&self, event: &ConversationEvent<'_>) {
        match event {
            ConversationEvent::SessionStarted { disease } => {
                println!("Patient initialized with disease context: {disease}");
            }
            ConversationEvent::ToneEvaluated { label, .. } => {
                println!("[Tone Evaluation] {label}");
            }
            ConversationEvent::PatientReplied { response, .. } => {
                println!("Patient: {response}");
            }
            ConversationEvent::RephraseSuggested { .. } => {
                println!("[Feedback] Consider rephrasing for better empathy and professionalism.");
            }
            ConversationEvent::SessionEnded { reason, .. } => {
                if *reason == EndReason::Terminated {
                    println!("Ending conversation.");
                }
                println!("Conversation ended.");
            }
            _ => {}
        }
    }
}

async fn run(cli: &Cli) -> Result<(), SimError> {
    let config = cli.to_config();

    let api_key = SimConfig::api_key_from_env()?;
    let client = OpenRouterClient::with_headers(
        api_key,
        "https://crates.io/crates/patient-sim",
        "patient-sim",
    )?;
    let gateway = config.build_gateway(client);

    let handler = CompositeEventHandler::new()
        .with(LoggingHandler)
        .with(ConsoleHandler);

    let mut input: Box<dyn InputSource> = match &cli.script {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                SimError::configuration(format!(
                    "failed to open script '{}': {e}",
                    path.display()
                ))
            })?;
            Box::new(LineInput::new(BufReader::new(file)))
        }
        None => Box::new(LineInput::terminal()),
    };

    let outcome = config
        .build_controller(&gateway)?
        .with_event_handler(&handler)
        .run(input.as_mut())
        .await?;

    tracing::debug!(
        "{} turn(s) logged to {}",
        outcome.turns,
        config.log_path.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
