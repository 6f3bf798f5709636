//! Static path/type filter applied before any content is read.

use crate::config::{ConfigError, FilterConfig, MAX_FILE_SIZE};
use crate::screening::model::{FileCandidate, ScreeningOptions};
use crate::util::file_extension;
use regex::Regex;
use std::borrow::Cow;

/// Why a candidate did not make it past the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedExtension,
    ExcludedPath,
    TooLarge,
    LanguageNotRequested,
    OverFileLimit,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::UnsupportedExtension => "unsupported_extension",
            Rejection::ExcludedPath => "excluded_path",
            Rejection::TooLarge => "too_large",
            Rejection::LanguageNotRequested => "language_not_requested",
            Rejection::OverFileLimit => "over_file_limit",
        }
    }
}

/// Compiled filter for one batch.
///
/// Built from the deployment's [`FilterConfig`], narrowed by the batch options.
/// Options can lower the size ceiling and restrict languages but never widen
/// the extension list or the 5 MiB hard ceiling.
#[derive(Debug, Clone)]
pub struct PathFilter {
    extensions: Vec<String>,
    excludes: Vec<Regex>,
    max_file_size: u64,
    max_files: Option<usize>,
    languages: Option<Vec<String>>,
}

/// Result of filtering a whole batch, in submission order
#[derive(Debug)]
pub struct FilterOutcome<'a> {
    pub accepted: Vec<&'a FileCandidate>,
    pub skipped: Vec<(&'a FileCandidate, Rejection)>,
}

impl PathFilter {
    pub fn new(config: &FilterConfig, options: Option<&ScreeningOptions>) -> Result<Self, ConfigError> {
        let include_tests = options.is_some_and(|o| o.include_tests);
        let patterns = config
            .exclude_patterns
            .iter()
            .chain(config.test_patterns.iter().filter(|_| !include_tests));
        let excludes = patterns
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut max_file_size = config.max_file_size.min(MAX_FILE_SIZE);
        let mut max_files = (config.max_files > 0).then_some(config.max_files);
        let mut languages = None;
        if let Some(options) = options {
            if options.max_file_size > 0 {
                max_file_size = max_file_size.min(options.max_file_size);
            }
            if let Some(limit) = options.max_files.filter(|&n| n > 0) {
                max_files = Some(limit);
            }
            languages = options
                .language_filter
                .as_ref()
                .filter(|list| !list.is_empty())
                .map(|list| list.iter().map(|l| l.trim().to_lowercase()).collect());
        }

        Ok(Self {
            extensions: config.supported_extensions.iter().map(|e| e.to_lowercase()).collect(),
            excludes,
            max_file_size,
            max_files,
            languages,
        })
    }

    /// Filter with deployment defaults only
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        Self::new(config, None)
    }

    /// `None` when every accepted candidate proceeds
    pub fn max_files(&self) -> Option<usize> {
        self.max_files
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check one candidate, cheapest test first.
    pub fn check(&self, candidate: &FileCandidate) -> Result<(), Rejection> {
        let ext = file_extension(&candidate.path).to_lowercase();
        if !self.extensions.iter().any(|e| *e == ext) {
            return Err(Rejection::UnsupportedExtension);
        }
        let path = normalize_path(&candidate.path);
        if self.excludes.iter().any(|re| re.is_match(&path)) {
            return Err(Rejection::ExcludedPath);
        }
        if candidate.size_bytes() > self.max_file_size {
            return Err(Rejection::TooLarge);
        }
        if let Some(languages) = &self.languages {
            if !languages.contains(&candidate.language()) {
                return Err(Rejection::LanguageNotRequested);
            }
        }
        Ok(())
    }

    pub fn accept(&self, candidate: &FileCandidate) -> bool {
        self.check(candidate).is_ok()
    }

    /// Split a batch into accepted and skipped candidates.
    ///
    /// Accepted candidates beyond the file limit, if one is set, are skipped as well.
    pub fn filter_batch<'a>(&self, files: &'a [FileCandidate]) -> FilterOutcome<'a> {
        let mut accepted = Vec::new();
        let mut skipped = Vec::new();
        for candidate in files {
            match self.check(candidate) {
                Ok(()) if self.max_files.map_or(true, |cap| accepted.len() < cap) => {
                    accepted.push(candidate)
                }
                Ok(()) => skipped.push((candidate, Rejection::OverFileLimit)),
                Err(reason) => skipped.push((candidate, reason)),
            }
        }
        FilterOutcome { accepted, skipped }
    }
}

/// Forward slashes and a leading `/`, so directory patterns also match at the root.
fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') && !path.contains('\\') {
        return Cow::Borrowed(path);
    }
    let path = path.replace('\\', "/");
    if path.starts_with('/') {
        Cow::Owned(path)
    } else {
        Cow::Owned(format!("/{}", path))
    }
}
