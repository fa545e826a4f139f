//! Routeopt Worker - single-vehicle route optimization service
//!
//! This worker connects to NATS and answers route optimization requests.

mod cli;
mod config;
mod error;
mod handlers;
mod services;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::cli::{Cli, Command};
use crate::services::explanation::{create_explainer, Explainer, TemplateExplainer};
use crate::services::optimizer;
use crate::types::OptimizeRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before reading LOGS_DIR / RUST_LOG
    dotenvy::dotenv().ok();

    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "worker.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Console logs go to stderr so `optimize` can print JSON on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,routeopt_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    match cli.command {
        Some(Command::Optimize { file, no_explain }) => run_once(&config, &file, no_explain).await,
        Some(Command::Serve) | None => serve(config).await,
    }
}

async fn serve(config: config::Config) -> Result<()> {
    info!("Starting Routeopt Worker...");

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match config.nats_credentials() {
        Some((user, password)) => {
            async_nats::ConnectOptions::new()
                .user_and_password(user.to_string(), password.to_string())
                .connect(&config.nats_url)
                .await?
        }
        None => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Start message handlers
    let handler_result = handlers::start_handlers(nats_client, &config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Optimize a single request file and print the response JSON
async fn run_once(config: &config::Config, file: &std::path::Path, no_explain: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let request: OptimizeRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse optimize request in {}", file.display()))?;

    let explainer: Arc<dyn Explainer> = if no_explain {
        Arc::new(TemplateExplainer)
    } else {
        create_explainer(&config.explanation)?
    };

    let response = optimizer::optimize(&request, explainer.as_ref(), &config.optimizer_settings())
        .await
        .with_context(|| format!("Failed to optimize {}", file.display()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
