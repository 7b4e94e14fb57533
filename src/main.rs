use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use campus_assistant::chat::{ChatClient, ChatSession};
use campus_assistant::core::config::{AppPaths, ConfigService};
use campus_assistant::llm::build_provider;
use campus_assistant::logging;
use campus_assistant::rag::IndexLoader;
use campus_assistant::server;
use campus_assistant::state::AppState;
use campus_assistant::storage::build_object_store;
use campus_assistant::tools::filter::filter_enrollment_files;
use campus_assistant::tools::scraper::{write_ratings, RatingScraper};

#[derive(Parser)]
#[command(name = "campus-assistant", version, about = "UTD CS graduate program assistant")]
struct Cli {
    /// Path to config.yml (overrides discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load or build the index and serve the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Rebuild the index from the data directory, save and upload it
    BuildIndex,
    /// Answer a single question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Terminal chat against a running server
    Chat {
        #[arg(long)]
        url: Option<String>,
    },
    /// Subset enrollment CSVs to graduate CS courses
    Filter,
    /// Scrape professor ratings into the ratings JSON file
    Scrape {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let mut config = ConfigService::new(paths.clone());
    if let Some(path) = cli.config {
        config = config.with_config_path(path);
    }

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&config, port).await,
        Command::BuildIndex => build_index(&config).await,
        Command::Ask { question } => {
            let state = AppState::initialize(&config).await?;
            let answer = state.answerer.answer(&question.join(" ")).await?;
            println!("Answer: {}", answer);
            Ok(())
        }
        Command::Chat { url } => {
            let mut settings = config.load_settings()?.chat;
            if let Some(url) = url {
                settings.api_url = url;
            }
            ChatSession::new(ChatClient::new(&settings)?).run().await
        }
        Command::Filter => {
            let settings = config.load_settings()?;
            let data_dir = paths.resolve(&settings.data_dir);
            let outcomes = filter_enrollment_files(&data_dir, &settings.enrollment_filter);
            tracing::info!(
                "Filtered {} of {} files",
                outcomes.len(),
                settings.enrollment_filter.files.len()
            );
            Ok(())
        }
        Command::Scrape { output } => {
            let settings = config.load_settings()?;
            let ratings = RatingScraper::new(&settings.scraper)?.scrape().await;
            let output = output.unwrap_or_else(|| paths.resolve(&settings.scraper.output));
            write_ratings(&output, &ratings)?;
            tracing::info!(
                "Saved ratings for {} courses to {}",
                ratings.len(),
                output.display()
            );
            Ok(())
        }
    }
}

async fn serve(config: &ConfigService, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::initialize(config).await?;

    let port = port
        .or_else(|| env::var("PORT").ok().and_then(|val| val.parse::<u16>().ok()))
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn build_index(config: &ConfigService) -> anyhow::Result<()> {
    let settings = config.load_settings()?;
    let provider = build_provider(&settings.llm).await?;
    let store = build_object_store(&settings.storage).await;

    let (index, source) = IndexLoader::new(&settings, config.paths(), provider, store)
        .rebuild()
        .await?;
    tracing::info!("Index {}: {} chunks", source.as_str(), index.len());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutting down");
}
