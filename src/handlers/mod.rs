//! NATS message handlers

pub mod ping;
pub mod route;

use std::sync::Arc;
use anyhow::Result;
use async_nats::Client;
use tracing::{info, error};
use tokio::select;

use crate::config::Config;
use crate::services::explanation::create_explainer;

/// Start all message handlers
pub async fn start_handlers(client: Client, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let explainer = create_explainer(&config.explanation)?;
    info!("Explainer initialized: {}", explainer.name());

    let settings = Arc::new(config.optimizer_settings());

    // Subscribe to all subjects
    let ping_subject = config.subject("ping");
    let optimize_subject = config.subject("route.optimize");
    let ping_sub = client.subscribe(ping_subject.clone()).await?;
    let optimize_sub = client.subscribe(optimize_subject.clone()).await?;
    info!("Subscribed to {} and {}", ping_subject, optimize_subject);

    let client_ping = client.clone();
    let client_optimize = client.clone();

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let optimize_handle = tokio::spawn(async move {
        route::handle_optimize(client_optimize, optimize_sub, explainer, settings).await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which would indicate an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = optimize_handle => {
            error!("Route optimize handler finished: {:?}", result);
        }
    }

    Ok(())
}
