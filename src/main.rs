// Solace - Mental health support chat backend
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

use solace::config::{load_config, Config};
use solace::pipeline::TurnPipeline;
use solace::resources::{ResourceLibrary, ResourceScraper};
use solace::server::AppServer;

#[derive(Parser, Debug)]
#[command(name = "solace")]
#[command(about = "Mental health support chat backend", version)]
struct Args {
    /// Run mode
    #[command(subcommand)]
    command: Command,

    /// Path to config file (default: $SOLACE_CONFIG or ~/.solace/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single chat turn and print the response JSON
    Chat {
        /// Message text
        message: String,
        /// Emotion reported by the user
        #[arg(long)]
        emotion: Option<String>,
    },
    /// Rebuild the resource cache
    Scrape,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Serve { bind } => run_server(config, bind).await,
        Command::Chat { message, emotion } => run_chat(&config, &message, emotion.as_deref()).await,
        Command::Scrape => run_scrape(&config).await,
    }
}

/// Initialize tracing with RUST_LOG support (default: info)
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Resolve both capabilities once and build the pipeline around them
async fn build_pipeline(config: &Config) -> Result<TurnPipeline> {
    let generator = solace::generators::connect(&config.generator);
    let llm = solace::providers::connect(&config.llm).await;
    TurnPipeline::from_config(config, generator, llm)
}

async fn run_server(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let pipeline = build_pipeline(&config).await?;
    tracing::info!(
        text_generation = pipeline.generation_available(),
        instruction_llm = pipeline.llm_available(),
        "Pipeline ready"
    );

    let server = AppServer::new(&config, pipeline)?;
    server.serve().await
}

async fn run_chat(config: &Config, message: &str, emotion: Option<&str>) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let response = pipeline.process_turn(message, emotion).await;

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(())
}

async fn run_scrape(config: &Config) -> Result<()> {
    let library = ResourceLibrary::new(config.resources.dir.clone());
    let scraper = ResourceScraper::new(config.resources.sources.clone(), config.resources.timeout())?;

    let payload = library.load(&scraper, true).await?;
    for resource in &payload.resources {
        println!("• {}", resource.title);
    }
    println!(
        "\n{} resources cached in {}",
        payload.resources.len(),
        library.dir().display()
    );
    Ok(())
}
