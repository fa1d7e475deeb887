//! arena-agent command line.
//!
//! Usage:
//!   arena-agent parse response.txt --dialect plain
//!   arena-agent ground --image shot.png --action 'computer.mouse.move("OK button")' --visualize out.png
//!   arena-agent plan --image shot.png --instruction "Open the settings"

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use arena_agent::config::{self, AppConfig};
use arena_agent::episode::Observation;
use arena_agent::errors::ArenaResult;
use arena_agent::grounding::GroundingClient;
use arena_agent::llm::registry::ProviderRegistry;
use arena_agent::parser::{strip_solution, ResponseDialect, ResponseParser};
use arena_agent::perception::{draw_markers, encode_jpeg_base64};
use arena_agent::AgentSession;

#[derive(Parser)]
#[command(name = "arena-agent", about = "Computer-use agent loop with vision grounding")]
struct Cli {
    /// Path to config.toml; searched for when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a saved model response and print its decision and action.
    Parse {
        file: PathBuf,
        /// `cot` or `plain`.
        #[arg(long, default_value = "cot", value_parser = serde_enum::<ResponseDialect>)]
        dialect: ResponseDialect,
    },
    /// Ground the element references of an action against a screenshot.
    Ground {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        action: String,
        /// Write a copy of the screenshot with every resolved point marked.
        #[arg(long)]
        visualize: Option<PathBuf>,
    },
    /// Run one planning turn on a screenshot.
    Plan {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        instruction: String,
    },
}

fn serde_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    arena_agent::init_tracing(&cli.log_level);

    let result = match cli.command {
        Command::Parse { file, dialect } => run_parse(&file, dialect),
        Command::Ground {
            image,
            action,
            visualize,
        } => run_ground(cli.config.as_deref(), &image, &action, visualize.as_deref()).await,
        Command::Plan { image, instruction } => {
            run_plan(cli.config.as_deref(), &image, &instruction).await
        }
    };

    if let Err(e) = result {
        eprintln!("arena-agent: {e}");
        std::process::exit(1);
    }
}

fn load(path: Option<&Path>) -> ArenaResult<AppConfig> {
    match path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
}

fn run_parse(file: &Path, dialect: ResponseDialect) -> ArenaResult<()> {
    let full = std::fs::read_to_string(file)?;
    let parsed = ResponseParser::new(dialect).parse(strip_solution(&full));
    println!("decision: {}", parsed.decision_text);
    println!("action:\n{}", parsed.action.as_str());
    Ok(())
}

async fn run_ground(
    config_path: Option<&Path>,
    image: &Path,
    action: &str,
    visualize: Option<&Path>,
) -> ArenaResult<()> {
    let config = load(config_path)?;
    let registry = ProviderRegistry::from_config(&config);
    let client = GroundingClient::from_config(&config, &registry)?;

    let bytes = std::fs::read(image)?;
    let encoded = encode_jpeg_base64(&bytes)?;
    let grounded = client.ground_action(&encoded.base64, action).await;

    println!("{}", grounded.text);
    for result in &grounded.results {
        println!("{:?} -> ({}, {})", result.reference, result.point.x(), result.point.y());
    }
    if let Some(error) = &grounded.error {
        eprintln!("grounding error: {error}");
    }

    if let Some(out) = visualize {
        let marked = draw_markers(&bytes, &grounded.points())?;
        std::fs::write(out, marked)?;
        tracing::info!(
            path = %out.display(),
            points = grounded.results.len(),
            "visualization written"
        );
    }
    Ok(())
}

async fn run_plan(config_path: Option<&Path>, image: &Path, instruction: &str) -> ArenaResult<()> {
    let config = load(config_path)?;
    let registry = ProviderRegistry::from_config(&config);
    let mut session = AgentSession::from_config(&config, &registry)?;

    let observation = Observation {
        screenshot: std::fs::read(image)?,
        ..Default::default()
    };
    let turn = session.predict(instruction, &observation).await?;

    for action in &turn.actions {
        println!("{action}");
    }
    println!("{}", serde_json::to_string_pretty(&turn.logs)?);
    Ok(())
}
