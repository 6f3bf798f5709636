//! Static per-language tables for the content optimizer.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// How one language is compressed
#[derive(Debug)]
pub struct LanguageConfig {
    pub name: &'static str,
    /// Declaration keywords (`class`, `def`, `func`, ...)
    pub keywords: &'static [&'static str],
    /// Line prefixes that carry no executable code
    pub boilerplate_prefixes: &'static [&'static str],
    /// Shorter trimmed lines are dropped in detection mode
    pub min_line_length: usize,
    /// Comments and string literals in one alternation; only the `comment` group is stripped
    pub(crate) strip: Regex,
    /// Empty for languages without signature heuristics
    pub(crate) signatures: Vec<Regex>,
}

const C_COMMENTS: &[&str] = &[r"//[^\n]*", r"/\*.*?\*/"];
const PYTHON_COMMENTS: &[&str] = &[r"#[^\n]*", r#"""".*?""""#, r"'''.*?'''"];
const RUBY_COMMENTS: &[&str] = &[r"#[^\n]*", r"^=begin.*?^=end"];
const PHP_COMMENTS: &[&str] = &[r"//[^\n]*", r"#[^\n]*", r"/\*.*?\*/"];
const GENERIC_COMMENTS: &[&str] = &[r"//[^\n]*", r"#[^\n]*", r"/\*.*?\*/"];

const QUOTED: &[&str] = &[r#""(?:[^"\\\n]|\\.)*""#, r"'(?:[^'\\\n]|\\.)*'"];
const QUOTED_WITH_BACKTICK: &[&str] = &[
    r#""(?:[^"\\\n]|\\.)*""#,
    r"'(?:[^'\\\n]|\\.)*'",
    r"`(?:[^`\\]|\\.)*`",
];

/// Modifiers that may precede a declaration keyword
const MODIFIERS: &str = r"(?:(?:export|default|declare|async|public|private|protected|internal|static|abstract|final|sealed|partial|override|virtual|readonly|unsafe|extern|inline)\s+)*";

/// `type name(args)` with an optional brace, no trailing statement terminator
const TYPED_DECLARATION: &str =
    r"^(?:[\w<>\[\],.?*&:~]+\s+)+[\w:~]+\s*\([^;]*\)\s*(?:const\s*)?(?:throws\s+[\w.,\s]+)?\{?\s*$";

const MODIFIED_METHOD: &str = r"^(?:public|private|protected|internal)\b.*\(.*\)";

/// Lines starting with these are statements, never declarations
pub(crate) const CONTROL_WORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "try", "return",
    "throw", "new", "await", "yield", "elif", "unless", "until",
];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn strip_regex(comments: &[&str], strings: &[&str]) -> Regex {
    re(&format!(
        "(?ms)(?P<comment>{})|(?:{})",
        comments.join("|"),
        strings.join("|")
    ))
}

fn declaration(keywords: &[&str]) -> Regex {
    re(&format!(r"^{}(?:{})\b\s*[\w(]", MODIFIERS, keywords.join("|")))
}

impl LanguageConfig {
    fn new(
        name: &'static str,
        keywords: &'static [&'static str],
        comments: &[&str],
        strings: &[&str],
        extra_signatures: &[&str],
        boilerplate_prefixes: &'static [&'static str],
        min_line_length: usize,
    ) -> Self {
        let mut signatures = vec![declaration(keywords)];
        signatures.extend(extra_signatures.iter().map(|p| re(p)));
        Self {
            name,
            keywords,
            boilerplate_prefixes,
            min_line_length,
            strip: strip_regex(comments, strings),
            signatures,
        }
    }

    fn generic() -> Self {
        Self {
            name: "generic",
            keywords: &["function", "class", "def", "public", "private"],
            boilerplate_prefixes: &["import ", "package ", "#include", "using "],
            min_line_length: 3,
            strip: strip_regex(GENERIC_COMMENTS, QUOTED),
            signatures: Vec::new(),
        }
    }

    /// Whether signature extraction applies; otherwise the leading lines are kept.
    pub fn has_signatures(&self) -> bool {
        !self.signatures.is_empty()
    }
}

static LANGUAGE_CONFIGS: Lazy<HashMap<&'static str, LanguageConfig>> = Lazy::new(|| {
    let c_like = [TYPED_DECLARATION, MODIFIED_METHOD];
    let configs = [
        LanguageConfig::new(
            "java",
            &["class", "interface", "enum", "record", "@interface"],
            C_COMMENTS,
            QUOTED,
            &c_like,
            &["import ", "package "],
            3,
        ),
        LanguageConfig::new(
            "csharp",
            &["class", "interface", "enum", "struct", "record", "namespace"],
            C_COMMENTS,
            QUOTED,
            &c_like,
            &["using ", "[assembly:"],
            3,
        ),
        LanguageConfig::new(
            "cpp",
            &["class", "struct", "enum", "union", "namespace", "template"],
            C_COMMENTS,
            QUOTED,
            &[TYPED_DECLARATION],
            &["#include", "#pragma", "using namespace "],
            3,
        ),
        LanguageConfig::new(
            "c",
            &["struct", "enum", "union", "typedef"],
            C_COMMENTS,
            QUOTED,
            &[TYPED_DECLARATION],
            &["#include", "#pragma"],
            3,
        ),
        LanguageConfig::new(
            "python",
            &["def", "class"],
            PYTHON_COMMENTS,
            QUOTED,
            &[],
            &["import ", "from "],
            6,
        ),
        LanguageConfig::new(
            "javascript",
            &["function", "class", "const", "let", "var"],
            C_COMMENTS,
            QUOTED_WITH_BACKTICK,
            &["=>", r"^\w+\s*\([^;]*\)\s*\{\s*$"],
            &["import ", "export * from ", "'use strict'", "\"use strict\""],
            3,
        ),
        LanguageConfig::new(
            "typescript",
            &["function", "class", "interface", "type", "enum", "const", "let", "var"],
            C_COMMENTS,
            QUOTED_WITH_BACKTICK,
            &["=>", r"^\w+\s*\([^;]*\)\s*(?::\s*[\w<>\[\]|, ]+)?\s*\{\s*$"],
            &["import ", "export * from "],
            3,
        ),
        LanguageConfig::new(
            "go",
            &["func", "type"],
            C_COMMENTS,
            QUOTED_WITH_BACKTICK,
            &[],
            &["import ", "package "],
            3,
        ),
        LanguageConfig::new(
            "ruby",
            &["def", "class", "module"],
            RUBY_COMMENTS,
            QUOTED,
            &[],
            &["require ", "require_relative "],
            3,
        ),
        LanguageConfig::new(
            "php",
            &["function", "class", "interface", "trait", "enum"],
            PHP_COMMENTS,
            QUOTED,
            &[],
            &["use ", "namespace ", "require", "include", "<?php"],
            3,
        ),
    ];
    configs.into_iter().map(|config| (config.name, config)).collect()
});

static GENERIC_CONFIG: Lazy<LanguageConfig> = Lazy::new(LanguageConfig::generic);

/// Config for a language tag (case-insensitive), or the generic default.
pub fn config_for(language: &str) -> &'static LanguageConfig {
    let key = language.trim().to_lowercase();
    LANGUAGE_CONFIGS
        .get(key.as_str())
        .unwrap_or_else(|| &*GENERIC_CONFIG)
}
