//! Content optimizer
//!
//! Compresses source text before it is sent to a model. Screening keeps only
//! structural signatures under a small budget; detection keeps executable code
//! under a larger one. Both are pure and deterministic.

pub mod languages;

pub use languages::{config_for, LanguageConfig};

use crate::util::truncate_str;
use regex::Captures;
use serde::{Deserialize, Serialize};

/// Character budget for screening output (~250 tokens)
pub const SCREENING_BUDGET: usize = 1000;
/// Character budget for detection output (~1250 tokens)
pub const DETECTION_BUDGET: usize = 5000;
pub const CHARS_PER_TOKEN: usize = 4;

/// Lines kept for languages without signature heuristics
const LEADING_LINE_LIMIT: usize = 50;
const FOCUSED_CODE_CHARS: usize = 500;
const SURROUNDING_CONTEXT_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Screening,
    Detection,
}

impl Mode {
    pub fn budget(&self) -> usize {
        match self {
            Mode::Screening => SCREENING_BUDGET,
            Mode::Detection => DETECTION_BUDGET,
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "screening" => Ok(Mode::Screening),
            "detection" => Ok(Mode::Detection),
            other => Err(format!("unknown optimization mode: {}", other)),
        }
    }
}

/// Compress `content` for the given mode. Output never exceeds `mode.budget()` chars.
pub fn optimize(content: &str, language: &str, mode: Mode) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    let config = config_for(language);
    let stripped = strip_comments(content, config);
    match mode {
        Mode::Screening => {
            let structure = extract_signatures(&stripped, config);
            limit_length(&collapse_whitespace(&structure), SCREENING_BUDGET)
        }
        Mode::Detection => {
            let code = drop_boilerplate(&stripped, config);
            limit_length(&normalize_whitespace(&code), DETECTION_BUDGET)
        }
    }
}

/// Remove comments, leaving string literals (and any comment markers inside them) intact.
pub fn strip_comments(content: &str, config: &LanguageConfig) -> String {
    config
        .strip
        .replace_all(content, |caps: &Captures| {
            if caps.name("comment").is_some() {
                " ".to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn extract_signatures(content: &str, config: &LanguageConfig) -> String {
    if !config.has_signatures() {
        return leading_lines(content);
    }
    let signatures: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && is_signature(line, config))
        .collect();
    if signatures.is_empty() {
        // Nothing declaration-shaped (scripts, config-like code); keep the head instead.
        return leading_lines(content);
    }
    signatures.join("\n")
}

fn is_signature(line: &str, config: &LanguageConfig) -> bool {
    let first_word = line
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    if languages::CONTROL_WORDS.contains(&first_word) {
        return false;
    }
    config.signatures.iter().any(|re| re.is_match(line))
}

fn leading_lines(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .take(LEADING_LINE_LIMIT)
        .collect::<Vec<_>>()
        .join("\n")
}

fn drop_boilerplate(content: &str, config: &LanguageConfig) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.chars().count() >= config.min_line_length
                && !line.chars().all(|c| "{}()[];,".contains(c) || c.is_whitespace())
                && !config
                    .boilerplate_prefixes
                    .iter()
                    .any(|prefix| line.starts_with(prefix))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_whitespace(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace but keep braces and semicolons as separate tokens.
fn normalize_whitespace(content: &str) -> String {
    let mut spaced = String::with_capacity(content.len() + content.len() / 8);
    for c in content.chars() {
        match c {
            '{' | '}' => {
                spaced.push(' ');
                spaced.push(c);
                spaced.push(' ');
            }
            ';' => spaced.push_str("; "),
            _ => spaced.push(c),
        }
    }
    collapse_whitespace(&spaced).replace(" ;", ";")
}

/// Cut `content` to at most `budget` chars.
///
/// Prefers the last newline, `;` or `}` in the final 20% of the budget over a
/// mid-token cut. Trailing whitespace is dropped.
pub fn limit_length(content: &str, budget: usize) -> String {
    if content.chars().count() <= budget {
        return content.to_string();
    }
    let floor = budget * 4 / 5;
    let mut cut = None;
    for (pos, (idx, c)) in content.char_indices().take(budget).enumerate() {
        if pos > floor {
            match c {
                '\n' => cut = Some(idx),
                ';' | '}' => cut = Some(idx + 1),
                _ => {}
            }
        }
    }
    let kept = match cut {
        Some(end) => &content[..end],
        None => truncate_str(content, budget),
    };
    kept.trim_end().to_string()
}

/// Rough token count at 4 chars per token; for reporting only.
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count() / CHARS_PER_TOKEN
}

/// Focused input for suggestion-tier prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub focused_code: String,
    pub context: String,
    pub language: String,
    pub issue_type: String,
    pub hints: Vec<String>,
    pub token_estimate: usize,
}

/// Build a compact prompt context around one reported issue.
///
/// The issue code is cut to a centred 500-char window, the surrounding code
/// to its first 300 chars.
pub fn suggestion_context(
    issue_code: &str,
    surrounding: &str,
    language: &str,
    issue_type: &str,
) -> SuggestionContext {
    let focused_code = centered_window(issue_code, FOCUSED_CODE_CHARS);
    let context = if surrounding.chars().count() <= SURROUNDING_CONTEXT_CHARS {
        surrounding.to_string()
    } else {
        format!("{}...", truncate_str(surrounding, SURROUNDING_CONTEXT_CHARS))
    };
    let token_estimate = estimate_tokens(&format!("{}{}", focused_code, context));
    SuggestionContext {
        hints: language_hints(language, issue_type),
        focused_code,
        context,
        language: language.to_string(),
        issue_type: issue_type.to_string(),
        token_estimate,
    }
}

fn centered_window(code: &str, width: usize) -> String {
    let len = code.chars().count();
    if len <= width {
        return code.to_string();
    }
    let start = (len / 2).saturating_sub(width / 2);
    code.chars().skip(start).take(width).collect()
}

fn language_hints(language: &str, issue_type: &str) -> Vec<String> {
    let issue = issue_type.to_lowercase();
    let mut hints = Vec::new();
    match language.trim().to_lowercase().as_str() {
        "java" => {
            if issue.contains("sql") {
                hints.push("Use PreparedStatement");
                hints.push("Consider Spring Data JPA");
            }
            if issue.contains("performance") {
                hints.push("Check Collections usage");
                hints.push("Consider Stream API");
            }
        }
        "python" => {
            if issue.contains("performance") {
                hints.push("Use list comprehensions");
                hints.push("Consider numpy for large data");
            }
        }
        _ => {}
    }
    hints.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests;
