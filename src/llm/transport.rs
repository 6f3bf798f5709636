//! Wire adapter for the model-serving endpoint (Bedrock Converse).
//!
//! The transport only moves bytes and reports *what* went wrong; deciding
//! whether a failure is worth retrying belongs to the client.

use super::models::{SamplingParams, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding a Bedrock API key (bearer token)
pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Raw failure from a single dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The endpoint answered with a non-success status
    Status {
        status: u16,
        /// Service error name, e.g. `ThrottlingException`
        error_type: Option<String>,
        body: String,
    },
    /// No response arrived (connect failure, timeout, broken body)
    Network { timeout: bool, message: String },
    /// The request could not be built or sent for a local reason
    Local(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one Converse request and return the raw success body.
    async fn converse(
        &self,
        model_id: &str,
        request: &ConverseRequest,
    ) -> Result<String, TransportFailure>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<Message>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl ConverseRequest {
    /// Single-turn user prompt
    pub fn user_prompt(prompt: &str, params: &SamplingParams, max_tokens: u32) -> Self {
        Self {
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![ContentBlock {
                    text: prompt.to_string(),
                }],
            }],
            inference_config: InferenceConfig {
                max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                stop_sequences: params.stop_sequences.clone(),
            },
        }
    }
}

#[derive(Deserialize, Default)]
struct ConverseResponse {
    #[serde(default)]
    output: ConverseOutput,
    #[serde(default)]
    usage: ConverseUsage,
}

#[derive(Deserialize, Default)]
struct ConverseOutput {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// Decode a Converse success body into the first text block and usage.
///
/// Missing pieces decode as empty text and zero tokens; only a body that is
/// not JSON of the expected shape is an error.
pub fn decode_converse(body: &str) -> Result<(String, Usage), serde_json::Error> {
    let parsed: ConverseResponse = serde_json::from_str(body)?;
    let text = parsed
        .output
        .message
        .and_then(|m| m.content.into_iter().next())
        .map(|block| block.text)
        .unwrap_or_default();
    let usage = Usage {
        input_tokens: parsed.usage.input_tokens,
        output_tokens: parsed.usage.output_tokens,
        total_tokens: parsed
            .usage
            .total_tokens
            .unwrap_or_else(|| parsed.usage.input_tokens.saturating_add(parsed.usage.output_tokens)),
    };
    Ok((text, usage))
}

/// HTTP transport against `{base_url}/model/{model_id}/converse`
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: url::Url,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid model endpoint {}: {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("Model endpoint {} cannot be a base URL", base_url));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            client,
            base_url,
            bearer_token: std::env::var(BEARER_TOKEN_ENV).ok().filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint_for(&self, model_id: &str) -> url::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("model").push(model_id).push("converse");
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn converse(
        &self,
        model_id: &str,
        request: &ConverseRequest,
    ) -> Result<String, TransportFailure> {
        let mut builder = self
            .client
            .post(self.endpoint_for(model_id))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(network_failure)?;
        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(':').next().unwrap_or(v).to_string());
        let body = response.text().await.map_err(network_failure)?;

        if status.is_success() {
            return Ok(body);
        }
        Err(TransportFailure::Status {
            status: status.as_u16(),
            error_type: error_type.or_else(|| error_type_from_body(&body)),
            body,
        })
    }
}

fn network_failure(err: reqwest::Error) -> TransportFailure {
    if err.is_builder() {
        return TransportFailure::Local(err.to_string());
    }
    TransportFailure::Network {
        timeout: err.is_timeout(),
        message: err.to_string(),
    }
}

/// Error bodies carry the type as `__type` (`ns#ThrottlingException`) when the header is absent.
fn error_type_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let raw = value.get("__type")?.as_str()?;
    Some(raw.rsplit('#').next().unwrap_or(raw).to_string())
}
