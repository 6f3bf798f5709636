use super::models::{estimate_cost, ModelTier, SamplingParams, Usage};
use super::rate_limit::{CallKey, RateLimitState};
use super::transport::{decode_converse, ConverseRequest, Transport, TransportFailure};
use crate::config::{Config, ModelConfig, ThrottleConfig};
use crate::util::truncate_str;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Maximum length for response bodies quoted in failure messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Calling context used by [`InvocationClient::invoke`]
pub const DEFAULT_CONTEXT: &str = "default";

/// A decoded, successful model response
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub text: String,
    pub usage: Usage,
    /// Estimated USD cost from the static rate table
    pub cost: f64,
    pub model_id: String,
    pub attempts: u32,
}

/// Why an invocation failed, independent of transport details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    InvalidRequest,
    Throttled,
    ModelTimeout,
    ServiceUnavailable,
    Network,
    Unexpected,
}

impl FailureKind {
    /// Transient failures are worth another attempt; everything else fails closed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::Throttled
                | FailureKind::ModelTimeout
                | FailureKind::ServiceUnavailable
                | FailureKind::Network
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::AccessDenied => "access_denied",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Throttled => "throttled",
            FailureKind::ModelTimeout => "model_timeout",
            FailureKind::ServiceUnavailable => "service_unavailable",
            FailureKind::Network => "network",
            FailureKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{model_id} failed with {kind} after {attempts} attempt(s): {message}")]
pub struct InvocationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub model_id: String,
    pub attempts: u32,
}

impl InvocationFailure {
    pub fn retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Map a raw transport failure onto a [`FailureKind`] and a short message.
///
/// The service error name wins over the status code when both are present.
pub fn classify(failure: &TransportFailure) -> (FailureKind, String) {
    match failure {
        TransportFailure::Status {
            status,
            error_type,
            body,
        } => {
            let by_name = error_type.as_deref().and_then(|name| match name {
                "ThrottlingException" => Some(FailureKind::Throttled),
                "ModelTimeoutException" => Some(FailureKind::ModelTimeout),
                "ResourceNotFoundException" => Some(FailureKind::NotFound),
                "AccessDeniedException" | "UnrecognizedClientException" => {
                    Some(FailureKind::AccessDenied)
                }
                "ValidationException" => Some(FailureKind::InvalidRequest),
                "ModelNotReadyException"
                | "ServiceUnavailableException"
                | "InternalServerException" => Some(FailureKind::ServiceUnavailable),
                _ => None,
            });
            let kind = by_name.unwrap_or(match status {
                429 => FailureKind::Throttled,
                408 => FailureKind::ModelTimeout,
                404 => FailureKind::NotFound,
                401 | 403 => FailureKind::AccessDenied,
                400 | 413 | 422 => FailureKind::InvalidRequest,
                500..=599 => FailureKind::ServiceUnavailable,
                _ => FailureKind::Unexpected,
            });
            let message = format!(
                "HTTP {}{}: {}",
                status,
                error_type
                    .as_deref()
                    .map(|name| format!(" ({})", name))
                    .unwrap_or_default(),
                truncate_str(body.trim(), MAX_ERROR_CONTENT_LEN)
            );
            (kind, message)
        }
        TransportFailure::Network { timeout, message } => {
            let prefix = if *timeout { "request timed out" } else { "network error" };
            (FailureKind::Network, format!("{}: {}", prefix, message))
        }
        TransportFailure::Local(message) => (FailureKind::Unexpected, message.clone()),
    }
}

/// Rate-limited, retrying client for the remote classifier.
///
/// Owns its rate-limit state and call counters; nothing is process-global.
pub struct InvocationClient<T> {
    transport: T,
    models: ModelConfig,
    throttle: ThrottleConfig,
    state: Mutex<RateLimitState>,
}

impl<T: Transport> InvocationClient<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            models: config.model.clone(),
            throttle: config.throttle.clone(),
            state: Mutex::new(RateLimitState::default()),
        }
    }

    /// Sampling parameters configured for this deployment
    pub fn default_sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.models.temperature,
            top_p: self.models.top_p,
            stop_sequences: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn model_id(&self, tier: ModelTier) -> &str {
        &self.models.tier(tier).id
    }

    pub async fn invoke(
        &self,
        tier: ModelTier,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Invocation, InvocationFailure> {
        self.invoke_for(DEFAULT_CONTEXT, tier, prompt, params).await
    }

    /// Invoke `tier` on behalf of `context`, retrying transient failures.
    pub async fn invoke_for(
        &self,
        context: &str,
        tier: ModelTier,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Invocation, InvocationFailure> {
        let key = CallKey::new(tier, context);
        let settings = self.models.tier(tier);
        let request = ConverseRequest::user_prompt(prompt, params, settings.max_tokens);
        let model_id = settings.id.as_str();

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.rate_gate(&key).await;
            debug!(model = model_id, attempt, "Dispatching model request");

            let result = self.transport.converse(model_id, &request).await;
            self.lock_state().complete(&key, Instant::now());

            let (kind, message) = match result {
                Ok(body) => match decode_converse(&body) {
                    Ok((text, usage)) => {
                        self.lock_state().record_call(&key);
                        return Ok(Invocation {
                            text,
                            cost: estimate_cost(model_id, usage.input_tokens, usage.output_tokens),
                            usage,
                            model_id: model_id.to_string(),
                            attempts: attempt,
                        });
                    }
                    Err(err) => (
                        FailureKind::Unexpected,
                        format!("Failed to decode model response: {}", err),
                    ),
                },
                Err(failure) => classify(&failure),
            };

            match self.retry_delay(kind, attempt) {
                Some(delay) => {
                    warn!(
                        model = model_id,
                        attempt,
                        kind = %kind,
                        delay_ms = delay.as_millis() as u64,
                        "Model call failed, retrying: {}",
                        message
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(InvocationFailure {
                        kind,
                        message,
                        model_id: model_id.to_string(),
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// The single retry decision: `None` means surface the failure now.
    ///
    /// Throttling backs off in proportion to the attempt number; other
    /// transient failures wait a fixed delay.
    pub fn retry_delay(&self, kind: FailureKind, attempt: u32) -> Option<Duration> {
        if !kind.is_retryable() || attempt >= self.throttle.max_retries {
            return None;
        }
        let base = self.throttle.retry_delay();
        Some(match kind {
            FailureKind::Throttled => base.saturating_mul(attempt),
            _ => base,
        })
    }

    /// Successful calls per `tier:context`
    pub fn call_statistics(&self) -> HashMap<String, u32> {
        self.lock_state().call_counts()
    }

    /// Clear call counters and rate-limit timestamps
    pub fn reset_statistics(&self) {
        self.lock_state().reset();
    }

    async fn rate_gate(&self, key: &CallKey) {
        let wait = self.lock_state().reserve(
            key,
            Instant::now(),
            self.throttle.min_call_interval(),
            self.throttle.pacing_delay(),
        );
        if !wait.is_zero() {
            debug!(key = %key, wait_ms = wait.as_millis() as u64, "Rate gate holding call");
            tokio::time::sleep(wait).await;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
