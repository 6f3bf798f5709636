use serde::{Deserialize, Serialize};

/// Remote classifier tiers, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Screening tier - fast, cheap classification of compressed files (Nova Micro)
    Micro,
    /// Detection tier - balanced issue detection (Nova Lite)
    Lite,
    /// Suggestion tier - best reasoning for fix generation (Nova Premier)
    Premier,
}

impl ModelTier {
    pub fn default_id(&self) -> &'static str {
        match self {
            ModelTier::Micro => "us.amazon.nova-micro-v1:0",
            ModelTier::Lite => "us.amazon.nova-lite-v1:0",
            ModelTier::Premier => "us.amazon.nova-premier-v1:0",
        }
    }

    /// Output token ceiling; small for screening, larger for deeper stages
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            ModelTier::Micro => 500,
            ModelTier::Lite => 4000,
            ModelTier::Premier => 8000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelTier::Micro => "micro",
            ModelTier::Lite => "lite",
            ModelTier::Premier => "premier",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// USD per million tokens (input and output billed alike).
///
/// Keyed by model id; anything unrecognised is billed at the Lite rate.
pub fn usd_per_million_tokens(model_id: &str) -> f64 {
    match model_id {
        "us.amazon.nova-micro-v1:0" => 0.0075,
        "us.amazon.nova-lite-v1:0" => 0.015,
        "us.amazon.nova-premier-v1:0" => 0.80,
        _ => 0.015,
    }
}

pub fn estimate_cost(model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let total = f64::from(input_tokens) + f64::from(output_tokens);
    total / 1_000_000.0 * usd_per_million_tokens(model_id)
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            stop_sequences: None,
        }
    }
}

/// Token usage for one successful invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}
