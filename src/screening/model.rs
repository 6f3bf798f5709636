//! Batch request, verdict and report types exchanged with the surrounding pipeline.
//!
//! Field names follow the camelCase JSON the upstream and downstream stages use.

use crate::config::MAX_FILE_SIZE;
use crate::language::{self, UNKNOWN_LANGUAGE};
use crate::optimizer::estimate_tokens;
use crate::util::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STAGE: &str = "screening";
pub const NEXT_STAGE: &str = "detection";

/// Confidence assigned to extension-based fallback verdicts
pub const FALLBACK_CONFIDENCE: f32 = 0.8;

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_stage() -> String {
    STAGE.to_string()
}

/// One file as submitted by the caller. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileCandidate {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Declared size in bytes; derived from the content when absent
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default, rename = "language")]
    pub declared_language: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl FileCandidate {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        Self {
            name: path.rsplit('/').next().unwrap_or(&path).to_string(),
            size: Some(content.len() as u64),
            content: Some(content),
            path,
            sha: None,
            declared_language: None,
            mime_type: None,
            encoding: default_encoding(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size
            .unwrap_or_else(|| self.content.as_deref().map_or(0, |c| c.len() as u64))
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.path.rsplit('/').next().unwrap_or(&self.path)
        } else {
            &self.name
        }
    }

    /// Declared language, or one guessed from the extension
    pub fn language(&self) -> String {
        match self.declared_language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_lowercase(),
            _ => language::from_path(&self.path).to_string(),
        }
    }
}

/// Optional knobs a caller may send with a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreeningOptions {
    pub max_file_size: u64,
    /// Only enforced when the caller sets it
    pub max_files: Option<usize>,
    pub include_tests: bool,
    pub include_docs: bool,
    pub language_filter: Option<Vec<String>>,
    /// Recorded for downstream stages; not enforced here
    pub confidence_threshold: f32,
    #[serde(alias = "enableNovaAnalysis")]
    pub enable_classifier: bool,
}

impl Default for ScreeningOptions {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_files: None,
            include_tests: false,
            include_docs: false,
            language_filter: None,
            confidence_threshold: 0.7,
            enable_classifier: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Invalid request: missing required fields (sessionId)")]
    MissingSessionId,
    #[error("Invalid request: missing required fields (analysisId)")]
    MissingAnalysisId,
    #[error("Invalid request: missing required fields (files)")]
    NoFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub files: Vec<FileCandidate>,
    #[serde(default = "default_stage")]
    pub stage: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub scan_number: Option<u32>,
    #[serde(default)]
    pub options: Option<ScreeningOptions>,
}

impl ScreeningRequest {
    pub fn new(
        analysis_id: impl Into<String>,
        session_id: impl Into<String>,
        files: Vec<FileCandidate>,
    ) -> Self {
        Self {
            session_id: Some(session_id.into()),
            analysis_id: Some(analysis_id.into()),
            repository: None,
            branch: None,
            files,
            stage: default_stage(),
            timestamp: Some(now_millis()),
            scan_number: None,
            options: None,
        }
    }

    /// Both identifiers and a non-empty file list are required.
    pub fn validate(&self) -> Result<(), BatchError> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.session_id) {
            return Err(BatchError::MissingSessionId);
        }
        if blank(&self.analysis_id) {
            return Err(BatchError::MissingAnalysisId);
        }
        if self.files.is_empty() {
            return Err(BatchError::NoFiles);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
    Unknown,
}

impl Complexity {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Complexity::Low,
            "medium" => Complexity::Medium,
            "high" => Complexity::High,
            _ => Complexity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
            Complexity::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Classifier,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningVerdict {
    pub is_valid: bool,
    pub language: String,
    pub confidence: f32,
    pub complexity: Complexity,
    pub source: VerdictSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScreeningVerdict {
    /// Deterministic extension-based verdict used whenever the classifier can't help.
    pub fn fallback_for(path: &str) -> Self {
        Self {
            is_valid: true,
            language: language::from_path(path).to_string(),
            confidence: FALLBACK_CONFIDENCE,
            complexity: Complexity::Medium,
            source: VerdictSource::Fallback,
            reason: None,
        }
    }
}

/// A candidate that passed screening, with its verdict and size metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenedFile {
    pub path: String,
    pub name: String,
    pub content: String,
    pub optimized_content: String,
    pub size: u64,
    pub sha: Option<String>,
    pub language: String,
    pub confidence: f32,
    pub complexity: Complexity,
    pub mime_type: Option<String>,
    pub encoding: String,
    pub line_count: usize,
    pub character_count: usize,
    pub estimated_tokens: usize,
    pub verdict_source: VerdictSource,
}

impl ScreenedFile {
    pub fn new(candidate: &FileCandidate, optimized_content: String, verdict: ScreeningVerdict) -> Self {
        let content = candidate.content.clone().unwrap_or_default();
        let character_count = content.chars().count();
        Self {
            path: candidate.path.clone(),
            name: candidate.display_name().to_string(),
            line_count: content.lines().count(),
            character_count,
            estimated_tokens: estimate_tokens(&content),
            content,
            optimized_content,
            size: candidate.size_bytes(),
            sha: candidate.sha.clone(),
            language: if verdict.language.is_empty() {
                UNKNOWN_LANGUAGE.to_string()
            } else {
                verdict.language
            },
            confidence: verdict.confidence,
            complexity: verdict.complexity,
            mime_type: candidate.mime_type.clone(),
            encoding: candidate.encoding.clone(),
            verdict_source: verdict.source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningSummary {
    pub input_files: usize,
    /// Candidates that survived filtering
    pub processed_files: usize,
    pub valid_files: usize,
    /// Filtered out, over the file cap, or rejected by the classifier
    pub skipped_files: usize,
    /// The classifier-rejected part of `skipped_files`
    pub rejected_files: usize,
    pub error_files: usize,
    pub language_distribution: BTreeMap<String, usize>,
    pub complexity_distribution: BTreeMap<String, usize>,
    pub average_confidence: f32,
    pub total_size: u64,
    pub total_lines: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub model_calls: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTime {
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub total_duration_ms: Option<i64>,
    pub screening_duration_ms: Option<i64>,
    pub classifier_duration_ms: Option<i64>,
}

impl ProcessingTime {
    pub fn start() -> Self {
        Self {
            start_time: now_millis(),
            ..Self::default()
        }
    }

    pub fn mark_end(&mut self) {
        let end = now_millis();
        self.end_time = Some(end);
        self.total_duration_ms = Some(end - self.start_time);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub code: String,
    pub message: String,
    pub file_path: Option<String>,
    pub severity: Severity,
    pub timestamp: i64,
}

impl ProcessingError {
    pub fn new(code: &str, message: impl Into<String>, file_path: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            file_path: file_path.map(str::to_string),
            severity: Severity::Error,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    PartialSuccess,
    Error,
}

/// Everything the next pipeline stage needs from screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningReport {
    pub status: ReportStatus,
    pub analysis_id: Option<String>,
    pub session_id: Option<String>,
    pub stage: String,
    pub files: Vec<ScreenedFile>,
    pub summary: Option<ScreeningSummary>,
    pub token_usage: Option<TokenUsage>,
    pub processing_time: ProcessingTime,
    pub errors: Vec<ProcessingError>,
    pub warnings: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub timestamp: i64,
    pub next_stage: String,
}

impl ScreeningReport {
    fn empty(status: ReportStatus, analysis_id: Option<String>, session_id: Option<String>) -> Self {
        Self {
            status,
            analysis_id,
            session_id,
            stage: STAGE.to_string(),
            files: Vec::new(),
            summary: None,
            token_usage: None,
            processing_time: ProcessingTime::start(),
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: BTreeMap::new(),
            timestamp: now_millis(),
            next_stage: NEXT_STAGE.to_string(),
        }
    }

    /// Batch-level failure: no files, one `SCREENING_FAILED` error.
    pub fn error(analysis_id: Option<String>, session_id: Option<String>, message: impl Into<String>) -> Self {
        let mut report = Self::empty(ReportStatus::Error, analysis_id, session_id);
        report
            .errors
            .push(ProcessingError::new("SCREENING_FAILED", message, None));
        report
    }

    pub fn completed(
        analysis_id: Option<String>,
        session_id: Option<String>,
        files: Vec<ScreenedFile>,
        errors: Vec<ProcessingError>,
        processed: usize,
    ) -> Self {
        let status = if errors.is_empty() {
            ReportStatus::Success
        } else if errors.len() >= processed {
            ReportStatus::Error
        } else {
            ReportStatus::PartialSuccess
        };
        let mut report = Self::empty(status, analysis_id, session_id);
        report.files = files;
        report.errors = errors;
        report
    }
}
