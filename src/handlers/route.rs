//! Route optimization message handler

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::explanation::Explainer;
use crate::services::optimizer::{self, OptimizerSettings};
use crate::types::{ErrorResponse, OptimizeRequest, Request, SuccessResponse};

/// Handle route.optimize messages
///
/// Each message is processed in its own task so a slow explanation call
/// does not hold up other requests.
pub async fn handle_optimize(
    client: Client,
    mut subscriber: Subscriber,
    explainer: Arc<dyn Explainer>,
    settings: Arc<OptimizerSettings>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received route.optimize message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let client = client.clone();
        let explainer = Arc::clone(&explainer);
        let settings = Arc::clone(&settings);

        tokio::spawn(async move {
            let response = process_optimize(&msg.payload, explainer.as_ref(), &settings).await;
            if let Err(e) = client.publish(reply, response.into()).await {
                error!("Failed to publish route.optimize reply: {}", e);
            }
        });
    }

    Ok(())
}

/// Turn a raw request body into a serialized success or error reply
pub async fn process_optimize(
    payload: &[u8],
    explainer: &dyn Explainer,
    settings: &OptimizerSettings,
) -> Vec<u8> {
    let request: Request<OptimizeRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return to_bytes(&ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()));
        }
    };

    match optimizer::optimize(&request.payload, explainer, settings).await {
        Ok(response) => to_bytes(&SuccessResponse::new(request.id, response)),
        Err(e) => {
            if e.is_client_error() {
                warn!("Rejected request {}: {}", request.id, e);
            } else {
                error!("Request {} failed: {}", request.id, e);
            }
            to_bytes(&ErrorResponse::new(request.id, e.code(), e.to_string()))
        }
    }
}

fn to_bytes<T: serde::Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|e| {
        error!("Failed to serialize reply: {}", e);
        br#"{"error":{"code":"INTERNAL_ERROR","message":"failed to serialize reply"}}"#.to_vec()
    })
}
