//! Mistral chat-completions client
//!
//! API documentation:
//! https://docs.mistral.ai/api/#tag/chat

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Explainer, RouteSummary};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Explainer backed by the Mistral chat API
pub struct MistralExplainer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MistralExplainer {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn build_request(&self, summary: &RouteSummary) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(summary),
            }],
        }
    }
}

/// Prompt describing the optimized trip
fn build_prompt(summary: &RouteSummary) -> String {
    format!(
        "A routing optimizer produced the following trip:\n\
         - Route order (excluding depot): [{}]\n\
         - Total distance: {} km\n\
         - Estimated time: {} minutes\n\
         - Average speed assumed: {:?} km/h\n\n\
         Explain this result in clear, simple language as if speaking to a logistics manager. \
         Highlight how the algorithm found the shortest/efficient path. \
         Start the explanation directly and answer in a single line without line breaks.",
        quoted_names(&summary.route_names),
        summary.total_km,
        summary.total_min,
        summary.speed_kmph,
    )
}

/// Render names as a single-quoted list, e.g. `'A', 'B'`
fn quoted_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pull the first choice's text out of a chat response
fn extract_content(response: ChatResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .context("Mistral response contained no choices")?;

    if text.is_empty() {
        anyhow::bail!("Mistral returned an empty explanation");
    }
    Ok(text)
}

#[async_trait]
impl Explainer for MistralExplainer {
    async fn explain(&self, summary: &RouteSummary) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("Requesting explanation from Mistral for {} stops", summary.route_names.len());

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(summary))
            .send()
            .await
            .context("Failed to send explanation request to Mistral")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mistral returned error {}: {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Mistral response")?;

        extract_content(chat)
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}
