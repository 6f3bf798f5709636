//! In-memory transport for client and pipeline tests.

use super::transport::{ConverseRequest, Transport, TransportFailure};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed script of responses, one per dispatch.
///
/// Once the script runs dry every further call fails with a 503.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, TransportFailure>>>,
    requests: Mutex<Vec<(String, ConverseRequest)>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<String, TransportFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<(String, ConverseRequest)> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, req)| req.messages.first())
            .filter_map(|m| m.content.first())
            .map(|block| block.text.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn converse(
        &self,
        model_id: &str,
        request: &ConverseRequest,
    ) -> Result<String, TransportFailure> {
        self.requests
            .lock()
            .unwrap()
            .push((model_id.to_string(), request.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportFailure::Status {
                    status: 503,
                    error_type: None,
                    body: "script exhausted".to_string(),
                })
            })
    }
}

pub fn converse_body(text: &str, input_tokens: u32, output_tokens: u32) -> String {
    serde_json::json!({
        "output": {"message": {"role": "assistant", "content": [{"text": text}]}},
        "usage": {
            "inputTokens": input_tokens,
            "outputTokens": output_tokens,
            "totalTokens": input_tokens + output_tokens
        }
    })
    .to_string()
}

pub fn throttled() -> TransportFailure {
    TransportFailure::Status {
        status: 429,
        error_type: Some("ThrottlingException".to_string()),
        body: "{\"message\":\"Too many requests\"}".to_string(),
    }
}

pub fn access_denied() -> TransportFailure {
    TransportFailure::Status {
        status: 403,
        error_type: Some("AccessDeniedException".to_string()),
        body: "{\"message\":\"not authorized\"}".to_string(),
    }
}
