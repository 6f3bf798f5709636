//! Screening orchestrator
//!
//! Drives one batch through filter, optimizer, classifier and parser, one file
//! at a time, and folds the results into a [`ScreeningReport`]. Classifier
//! trouble never fails a file: it degrades to the extension-based verdict.

pub mod model;
pub mod summary;

#[cfg(test)]
mod tests;

use crate::config::{Config, FilterConfig};
use crate::filter::{PathFilter, Rejection};
use crate::llm::models::{ModelTier, SamplingParams};
use crate::llm::parse::parse_verdict;
use crate::llm::prompts::screening_prompt;
use crate::llm::{InvocationClient, Transport};
use crate::optimizer::{self, Mode};
use model::{
    FileCandidate, ProcessingError, ProcessingTime, ScreenedFile, ScreeningReport,
    ScreeningRequest, ScreeningVerdict, VerdictSource,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use summary::{BatchCounts, ObservedUsage};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Calling context the screening stage uses for rate limiting and statistics
pub const SCREENING_CONTEXT: &str = "screening";

/// A candidate that cannot be screened at all
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CandidateError {
    #[error("file {0} has no content")]
    MissingContent(String),
    #[error("file {path} content is {actual} bytes, over the {limit} byte limit")]
    ContentTooLarge { path: String, actual: u64, limit: u64 },
}

impl CandidateError {
    pub fn code(&self) -> &'static str {
        match self {
            CandidateError::MissingContent(_) => "MISSING_CONTENT",
            CandidateError::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
        }
    }
}

/// Per-batch running state
#[derive(Default)]
struct BatchProgress {
    files: Vec<ScreenedFile>,
    errors: Vec<ProcessingError>,
    rejected: usize,
    observed: ObservedUsage,
    classifier_time: Duration,
}

/// First-tier screener: one per deployment, reused across batches.
pub struct Screener<T> {
    client: InvocationClient<T>,
    filter: FilterConfig,
    sampling: SamplingParams,
}

impl<T: Transport> Screener<T> {
    pub fn new(client: InvocationClient<T>, config: &Config) -> Self {
        let sampling = client.default_sampling();
        Self {
            client,
            filter: config.filter.clone(),
            sampling,
        }
    }

    pub fn client(&self) -> &InvocationClient<T> {
        &self.client
    }

    /// Screen one batch. Never fails: problems are reported in the returned report.
    pub async fn screen(&self, request: &ScreeningRequest) -> ScreeningReport {
        let mut time = ProcessingTime::start();
        let analysis_id = request.analysis_id.clone();
        let session_id = request.session_id.clone();

        if let Err(err) = request.validate() {
            warn!(analysis_id = ?analysis_id, "Rejecting batch: {}", err);
            return batch_error(analysis_id, session_id, err.to_string(), time);
        }
        let filter = match PathFilter::new(&self.filter, request.options.as_ref()) {
            Ok(filter) => filter,
            Err(err) => {
                warn!(analysis_id = ?analysis_id, "Cannot build file filter: {}", err);
                return batch_error(analysis_id, session_id, err.to_string(), time);
            }
        };
        let use_classifier = request.options.as_ref().map_or(true, |o| o.enable_classifier);

        info!(
            analysis_id = ?analysis_id,
            files = request.files.len(),
            classifier = use_classifier,
            "Starting screening"
        );

        let outcome = filter.filter_batch(&request.files);
        info!(
            accepted = outcome.accepted.len(),
            total = request.files.len(),
            "After basic filtering: {}/{} files remain",
            outcome.accepted.len(),
            request.files.len()
        );
        let mut rejections: BTreeMap<&str, usize> = BTreeMap::new();
        for (candidate, reason) in &outcome.skipped {
            debug!(path = %candidate.path, reason = reason.as_str(), "Skipped by filter");
            *rejections.entry(reason.as_str()).or_insert(0) += 1;
        }

        let screening_started = Instant::now();
        let mut progress = BatchProgress::default();
        for candidate in &outcome.accepted {
            match self
                .screen_candidate(candidate, &filter, use_classifier, &mut progress)
                .await
            {
                Ok(Some(file)) => progress.files.push(file),
                Ok(None) => progress.rejected += 1,
                Err(err) => {
                    warn!(path = %candidate.path, "Failed to screen file: {}", err);
                    progress.errors.push(ProcessingError::new(
                        err.code(),
                        err.to_string(),
                        Some(candidate.path.as_str()),
                    ));
                }
            }
        }
        time.screening_duration_ms = Some(screening_started.elapsed().as_millis() as i64);
        time.classifier_duration_ms = Some(progress.classifier_time.as_millis() as i64);

        let counts = BatchCounts {
            input: request.files.len(),
            filtered_out: outcome.skipped.len(),
            rejected: progress.rejected,
            errors: progress.errors.len(),
        };
        let batch_summary = summary::summarize(&counts, &progress.files);
        let token_usage = summary::estimate_token_usage(&progress.files);
        let (classifier_verdicts, fallback_verdicts) = summary::source_counts(&progress.files);

        let mut warnings = Vec::new();
        if !use_classifier {
            warnings
                .push("Classifier disabled; all files screened with fallback verdicts".to_string());
        } else if progress.observed.fallbacks > 0 {
            warnings.push(format!(
                "{} file(s) screened with fallback verdicts",
                progress.observed.fallbacks
            ));
        }
        if let Some(limit) = filter.max_files() {
            if outcome
                .skipped
                .iter()
                .any(|(_, reason)| *reason == Rejection::OverFileLimit)
            {
                warnings.push(format!(
                    "File limit of {} reached; remaining files skipped",
                    limit
                ));
            }
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("modelId".to_string(), json!(self.client.model_id(ModelTier::Micro)));
        metadata.insert("classifierEnabled".to_string(), json!(use_classifier));
        metadata.insert("classifierVerdicts".to_string(), json!(classifier_verdicts));
        metadata.insert("fallbackVerdicts".to_string(), json!(fallback_verdicts));
        metadata.insert("filterRejections".to_string(), json!(rejections));
        if let Ok(observed) = serde_json::to_value(&progress.observed) {
            metadata.insert("observedUsage".to_string(), observed);
        }
        if let Some(options) = &request.options {
            metadata.insert("confidenceThreshold".to_string(), json!(options.confidence_threshold));
        }
        if let Some(repository) = &request.repository {
            metadata.insert("repository".to_string(), json!(repository));
        }
        if let Some(branch) = &request.branch {
            metadata.insert("branch".to_string(), json!(branch));
        }
        if let Some(scan_number) = request.scan_number {
            metadata.insert("scanNumber".to_string(), json!(scan_number));
        }

        let mut report = ScreeningReport::completed(
            analysis_id,
            session_id,
            progress.files,
            progress.errors,
            counts.processed(),
        );
        report.summary = Some(batch_summary);
        report.token_usage = Some(token_usage);
        report.warnings = warnings;
        report.metadata = metadata;
        time.mark_end();
        report.processing_time = time;

        info!(
            status = ?report.status,
            valid = report.files.len(),
            errors = report.errors.len(),
            "Screening complete: {} files ready for analysis",
            report.files.len()
        );
        report
    }

    /// `Ok(None)` means the file was screened and judged not to be source code.
    async fn screen_candidate(
        &self,
        candidate: &FileCandidate,
        filter: &PathFilter,
        use_classifier: bool,
        progress: &mut BatchProgress,
    ) -> Result<Option<ScreenedFile>, CandidateError> {
        let content = candidate
            .content
            .as_deref()
            .ok_or_else(|| CandidateError::MissingContent(candidate.path.clone()))?;
        let actual = content.len() as u64;
        if actual > filter.max_file_size() {
            return Err(CandidateError::ContentTooLarge {
                path: candidate.path.clone(),
                actual,
                limit: filter.max_file_size(),
            });
        }

        let optimized = optimizer::optimize(content, &candidate.language(), Mode::Screening);
        let verdict = if use_classifier {
            self.classify(candidate, &optimized, progress).await
        } else {
            ScreeningVerdict::fallback_for(&candidate.path)
        };

        if !verdict.is_valid {
            info!(
                path = %candidate.path,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Classifier rejected file"
            );
            return Ok(None);
        }
        Ok(Some(ScreenedFile::new(candidate, optimized, verdict)))
    }

    async fn classify(
        &self,
        candidate: &FileCandidate,
        optimized: &str,
        progress: &mut BatchProgress,
    ) -> ScreeningVerdict {
        let prompt = screening_prompt(candidate.display_name(), candidate.size_bytes(), optimized);
        let started = Instant::now();
        let result = self
            .client
            .invoke_for(SCREENING_CONTEXT, ModelTier::Micro, &prompt, &self.sampling)
            .await;
        progress.classifier_time += started.elapsed();

        match result {
            Ok(invocation) => {
                progress.observed.record(&invocation);
                let verdict = parse_verdict(&invocation.text, &candidate.path);
                if verdict.source == VerdictSource::Fallback {
                    progress.observed.fallbacks += 1;
                }
                verdict
            }
            Err(failure) => {
                warn!(
                    path = %candidate.path,
                    kind = %failure.kind,
                    "Classifier call failed, using fallback verdict: {}",
                    failure
                );
                progress.observed.record_failure(failure.attempts);
                ScreeningVerdict::fallback_for(&candidate.path)
            }
        }
    }
}

fn batch_error(
    analysis_id: Option<String>,
    session_id: Option<String>,
    message: String,
    mut time: ProcessingTime,
) -> ScreeningReport {
    let mut report = ScreeningReport::error(analysis_id, session_id, message);
    time.mark_end();
    report.processing_time = time;
    report
}
