//! Extension → language mapping used for guessing and fallback verdicts.

use crate::util::file_extension;

/// Sentinel for anything we cannot name.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Map a file extension (with or without the leading dot) to a language tag.
///
/// Only the languages the classifier prompt offers are mapped; everything else
/// (including supported-but-unmapped extensions like `.kt`) is `unknown`.
pub fn from_extension(ext: &str) -> &'static str {
    let ext = ext.trim_start_matches('.');
    match ext.to_lowercase().as_str() {
        "java" => "java",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "cs" => "csharp",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "cpp" => "cpp",
        "c" => "c",
        _ => UNKNOWN_LANGUAGE,
    }
}

/// Language tag for a path, by its extension.
pub fn from_path(path: &str) -> &'static str {
    from_extension(file_extension(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions_case_insensitively() {
        assert_eq!(from_extension(".java"), "java");
        assert_eq!(from_extension("PY"), "python");
        assert_eq!(from_path("web/App.TS"), "typescript");
    }

    #[test]
    fn unmapped_extensions_are_unknown() {
        assert_eq!(from_extension(".kt"), UNKNOWN_LANGUAGE);
        assert_eq!(from_path("README"), UNKNOWN_LANGUAGE);
    }
}
