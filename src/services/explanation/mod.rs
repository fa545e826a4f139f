//! Natural-language route explanations
//!
//! - `MistralExplainer` asks a hosted chat model to describe the route
//! - `TemplateExplainer` renders a fixed sentence locally (no network)
//! - `ResilientExplainer` adds timeout, retries and a circuit breaker around
//!   any other explainer
//!
//! Without `MISTRAL_API_KEY` the worker uses the template explainer.

mod mistral;

pub use mistral::MistralExplainer;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Route statistics handed to the explainer
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    /// Customer names in visiting order, depot excluded
    pub route_names: Vec<String>,
    /// Rounded to 2 decimals
    pub total_km: f64,
    /// Rounded to 1 decimal
    pub total_min: f64,
    pub speed_kmph: f64,
}

/// Explainer trait - abstraction over explanation backends
#[async_trait]
pub trait Explainer: Send + Sync {
    /// Describe the route in one line of prose
    async fn explain(&self, summary: &RouteSummary) -> Result<String>;

    /// Get the name of this explainer implementation
    fn name(&self) -> &'static str;
}

/// Explanation backend configuration
#[derive(Debug, Clone)]
pub struct ExplanationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Per-attempt timeout in seconds
    pub timeout_seconds: u64,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Serve a locally built explanation when the backend fails
    pub fallback_enabled: bool,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.mistral.ai".to_string(),
            model: "mistral-medium-latest".to_string(),
            timeout_seconds: 20,
            max_retries: 1,
            fallback_enabled: true,
        }
    }
}

/// Render a one-line explanation without calling any service
pub fn template_explanation(summary: &RouteSummary) -> String {
    if summary.route_names.is_empty() {
        return "No orders were submitted, so there is nothing to route.".to_string();
    }

    format!(
        "Starting from the depot, the truck visits {} stop(s) in the order {}, covering {} km in about {} minutes at {:?} km/h; \
         the order was built by always driving to the nearest unvisited site and then reversing any legs that crossed each other until no shorter order could be found.",
        summary.route_names.len(),
        summary.route_names.join(" -> "),
        summary.total_km,
        summary.total_min,
        summary.speed_kmph,
    )
}

/// Collapse every whitespace run (including line breaks) into a single space
pub fn normalize_single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Create the explainer described by the configuration
pub fn create_explainer(config: &ExplanationConfig) -> Result<Arc<dyn Explainer>> {
    match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            let client = MistralExplainer::new(&config.base_url, key, &config.model, config.timeout_seconds)?;
            info!("Using Mistral explainer (model {})", config.model);
            Ok(Arc::new(ResilientExplainer::new(
                Box::new(client),
                Duration::from_secs(config.timeout_seconds),
                config.max_retries,
            )))
        }
        _ => {
            info!("MISTRAL_API_KEY not set, using template explainer");
            Ok(Arc::new(TemplateExplainer))
        }
    }
}

// ==========================================================================
// TemplateExplainer Implementation
// ==========================================================================

/// Deterministic local explainer
pub struct TemplateExplainer;

#[async_trait]
impl Explainer for TemplateExplainer {
    async fn explain(&self, summary: &RouteSummary) -> Result<String> {
        Ok(template_explanation(summary))
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

// ==========================================================================
// CircuitBreaker Implementation
// ==========================================================================

/// Circuit breaker to stop calling a failing service
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: Mutex<Option<Instant>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: Mutex::new(None),
            recovery_time,
        }
    }

    /// Check if circuit is open (blocking calls)
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }

        match *self.last_failure.lock() {
            // Half-open: let one call through after the recovery time
            Some(last_time) => last_time.elapsed() < self.recovery_time,
            None => true,
        }
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(Instant::now());
    }

    /// Record a success (resets failure count)
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }
}

// ==========================================================================
// ResilientExplainer Implementation
// ==========================================================================

const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;
const DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS: u64 = 60;

/// Explainer wrapper with per-attempt timeout, retries and circuit breaker
pub struct ResilientExplainer {
    inner: Box<dyn Explainer>,
    timeout: Duration,
    max_retries: u32,
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl ResilientExplainer {
    pub fn new(inner: Box<dyn Explainer>, timeout: Duration, max_retries: u32) -> Self {
        Self::with_circuit_breaker(
            inner,
            timeout,
            max_retries,
            CircuitBreaker::new(
                DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
                Duration::from_secs(DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS),
            ),
        )
    }

    pub fn with_circuit_breaker(
        inner: Box<dyn Explainer>,
        timeout: Duration,
        max_retries: u32,
        circuit_breaker: CircuitBreaker,
    ) -> Self {
        Self {
            inner,
            timeout,
            max_retries,
            circuit_breaker,
        }
    }
}

#[async_trait]
impl Explainer for ResilientExplainer {
    async fn explain(&self, summary: &RouteSummary) -> Result<String> {
        if self.circuit_breaker.is_open() {
            anyhow::bail!("{} explainer circuit breaker is open", self.inner.name());
        }

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match tokio::time::timeout(self.timeout, self.inner.explain(summary)).await {
                Ok(Ok(text)) => {
                    self.circuit_breaker.record_success();
                    return Ok(text);
                }
                Ok(Err(e)) => {
                    warn!("Explanation attempt {} failed: {:#}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!("Explanation attempt {} timed out after {:?}", attempt + 1, self.timeout);
                    last_error = Some(anyhow!("timed out after {:?}", self.timeout));
                }
            }
        }

        self.circuit_breaker.record_failure();
        Err(last_error.unwrap_or_else(|| anyhow!("no explanation attempts were made")))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
