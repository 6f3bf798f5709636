//! Batch aggregation: counts, histograms and token estimates.

use super::model::{ScreenedFile, ScreeningSummary, TokenUsage, VerdictSource};
use crate::llm::models::{usd_per_million_tokens, ModelTier};
use crate::llm::Invocation;
use serde::Serialize;
use std::collections::BTreeMap;

/// Approximate prompt tokens billed per screened file
pub const ESTIMATED_INPUT_TOKENS_PER_FILE: u64 = 100;
/// Approximate response tokens billed per screened file
pub const ESTIMATED_OUTPUT_TOKENS_PER_FILE: u64 = 50;

/// How the input files of one batch were disposed of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub input: usize,
    /// Dropped by the filter, including those over the file limit
    pub filtered_out: usize,
    /// Screened but judged not to be source code
    pub rejected: usize,
    pub errors: usize,
}

impl BatchCounts {
    pub fn processed(&self) -> usize {
        self.input.saturating_sub(self.filtered_out)
    }
}

/// Fold the screened files and batch counts into a summary.
///
/// Order-independent: histograms are sorted maps and totals are sums.
pub fn summarize(counts: &BatchCounts, files: &[ScreenedFile]) -> ScreeningSummary {
    let mut language_distribution = BTreeMap::new();
    let mut complexity_distribution = BTreeMap::new();
    for file in files {
        *language_distribution.entry(file.language.clone()).or_insert(0) += 1;
        *complexity_distribution
            .entry(file.complexity.as_str().to_string())
            .or_insert(0) += 1;
    }

    let average_confidence = if files.is_empty() {
        0.0
    } else {
        files.iter().map(|f| f.confidence).sum::<f32>() / files.len() as f32
    };

    ScreeningSummary {
        input_files: counts.input,
        processed_files: counts.processed(),
        valid_files: files.len(),
        skipped_files: counts.filtered_out + counts.rejected,
        rejected_files: counts.rejected,
        error_files: counts.errors,
        language_distribution,
        complexity_distribution,
        average_confidence,
        total_size: files.iter().map(|f| f.size).sum(),
        total_lines: files.iter().map(|f| f.line_count).sum(),
    }
}

/// Flat per-file estimate at Micro pricing, independent of what the client observed.
pub fn estimate_token_usage(files: &[ScreenedFile]) -> TokenUsage {
    let count = files.len() as u64;
    let input_tokens = count * ESTIMATED_INPUT_TOKENS_PER_FILE;
    let output_tokens = count * ESTIMATED_OUTPUT_TOKENS_PER_FILE;
    let total_tokens = input_tokens + output_tokens;
    TokenUsage {
        input_tokens,
        output_tokens,
        total_tokens,
        estimated_cost: total_tokens as f64 / 1_000_000.0
            * usd_per_million_tokens(ModelTier::Micro.default_id()),
        model_calls: files.len(),
    }
}

/// What the classifier actually reported over one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedUsage {
    pub successful_calls: usize,
    pub attempts: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    /// Files that ended up with a fallback verdict after a classifier call
    pub fallbacks: usize,
}

impl ObservedUsage {
    pub fn record(&mut self, invocation: &Invocation) {
        self.successful_calls += 1;
        self.attempts += invocation.attempts;
        self.input_tokens += u64::from(invocation.usage.input_tokens);
        self.output_tokens += u64::from(invocation.usage.output_tokens);
        self.cost += invocation.cost;
    }

    pub fn record_failure(&mut self, attempts: u32) {
        self.attempts += attempts;
        self.fallbacks += 1;
    }
}

/// Number of screened files per verdict source
pub fn source_counts(files: &[ScreenedFile]) -> (usize, usize) {
    files.iter().fold((0, 0), |(classifier, fallback), f| match f.verdict_source {
        VerdictSource::Classifier => (classifier + 1, fallback),
        VerdictSource::Fallback => (classifier, fallback + 1),
    })
}
