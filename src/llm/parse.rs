//! Parsing of the line-oriented screening response.
//!
//! The model is asked for `KEY: value` lines. In practice it decorates them
//! (`**LANGUAGE**:`, `- CONFIDENCE:`, `1. VALID:`), changes case, reorders them
//! or wraps them in prose, so matching is loose and per line.

use crate::language::UNKNOWN_LANGUAGE;
use crate::screening::model::{Complexity, ScreeningVerdict, VerdictSource};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("empty response")]
    Empty,
    #[error("no recognised fields in response")]
    NoFields,
    #[error("response has no confidence value")]
    MissingConfidence,
    #[error("unreadable confidence value {0:?}")]
    BadConfidence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Language,
    Confidence,
    Complexity,
    Valid,
    Reason,
}

/// Parse a classifier response into a verdict, falling back to the
/// extension-based verdict for `path` when the response is malformed.
pub fn parse_verdict(raw: &str, path: &str) -> ScreeningVerdict {
    match parse_fields(raw) {
        Ok(verdict) => verdict,
        Err(err) => {
            debug!(path, error = %err, "Unusable classifier response, using fallback verdict");
            ScreeningVerdict::fallback_for(path)
        }
    }
}

/// Strict parse: fails when the response carries no usable confidence.
///
/// The first occurrence of each key wins. Language and complexity default to
/// `unknown`; validity is true only for an explicit `yes`.
pub fn parse_fields(raw: &str) -> Result<ScreeningVerdict, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut language: Option<String> = None;
    let mut confidence: Option<&str> = None;
    let mut complexity: Option<Complexity> = None;
    let mut valid: Option<bool> = None;
    let mut reason: Option<String> = None;

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(field) = match_key(key) else {
            continue;
        };
        let value = clean_value(value);
        match field {
            Field::Language if language.is_none() => language = Some(parse_language(value)),
            Field::Confidence if confidence.is_none() => confidence = Some(value),
            Field::Complexity if complexity.is_none() => {
                complexity = Some(Complexity::from_label(first_word(value)))
            }
            Field::Valid if valid.is_none() => valid = Some(parse_yes(value)),
            Field::Reason if reason.is_none() && !value.is_empty() => {
                reason = Some(value.to_string())
            }
            _ => {}
        }
    }

    if language.is_none()
        && confidence.is_none()
        && complexity.is_none()
        && valid.is_none()
        && reason.is_none()
    {
        return Err(ParseError::NoFields);
    }
    let confidence = parse_confidence(confidence.ok_or(ParseError::MissingConfidence)?)?;

    Ok(ScreeningVerdict {
        is_valid: valid.unwrap_or(false),
        language: language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        confidence,
        complexity: complexity.unwrap_or(Complexity::Unknown),
        source: VerdictSource::Classifier,
        reason,
    })
}

fn match_key(key: &str) -> Option<Field> {
    let key = key
        .trim()
        .trim_start_matches(|c: char| {
            c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ')' | '-' | '#' | '>')
        })
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '`'))
        .to_lowercase();
    match key.as_str() {
        "language" | "programming language" => Some(Field::Language),
        "confidence" | "confidence level" => Some(Field::Confidence),
        "complexity" | "code complexity" => Some(Field::Complexity),
        "valid" | "valid source code" | "is valid" => Some(Field::Valid),
        "reason" => Some(Field::Reason),
        _ => None,
    }
}

fn clean_value(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`' | '[' | ']' | '"'))
        .trim()
}

fn first_word(value: &str) -> &str {
    value
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '(' | '/'))
        .find(|w| !w.is_empty())
        .unwrap_or("")
}

fn parse_language(value: &str) -> String {
    first_word(value)
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '#' && c != '+')
        .to_lowercase()
}

fn parse_yes(value: &str) -> bool {
    first_word(value)
        .trim_matches(|c: char| !c.is_alphanumeric())
        .eq_ignore_ascii_case("yes")
}

/// Decimal (`0.85`), percentage (`85%`) or bare percentage (`85`), clamped to [0, 1].
fn parse_confidence(value: &str) -> Result<f32, ParseError> {
    let token = first_word(value);
    let (number, percent) = match token.strip_suffix('%') {
        Some(n) => (n.trim(), true),
        None => (token.trim_end_matches(|c: char| c == '.' || c == ','), false),
    };
    let parsed: f32 = number
        .parse()
        .map_err(|_| ParseError::BadConfidence(value.to_string()))?;
    if !parsed.is_finite() {
        return Err(ParseError::BadConfidence(value.to_string()));
    }
    // A bare number above 1 reads as a percentage when it is whole or at least 2;
    // anything between (1.5) is an overshoot on the 0-1 scale.
    let scaled = if percent || (parsed > 1.0 && (parsed >= 2.0 || parsed.fract() == 0.0)) {
        parsed / 100.0
    } else {
        parsed
    };
    Ok(scaled.clamp(0.0, 1.0))
}
