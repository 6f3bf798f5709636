/// Truncate a string to at most `max_chars` characters (Unicode-safe, no ellipsis)
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// File extension including the leading dot (`.java`), or empty when there is none.
///
/// Only the last path segment counts. A dot in its first position (dotfiles)
/// or its last position does not start an extension.
pub fn file_extension(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => &name[idx..],
        _ => "",
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_is_char_safe() {
        assert_eq!(truncate_str("héllo", 2), "hé");
        assert_eq!(truncate_str("abc", 10), "abc");
        assert_eq!(truncate_str("", 3), "");
    }

    #[test]
    fn extension_rules() {
        assert_eq!(file_extension("src/Main.java"), ".java");
        assert_eq!(file_extension("a/b/c.min.js"), ".js");
        assert_eq!(file_extension(".gitignore"), "");
        assert_eq!(file_extension("Makefile"), "");
        assert_eq!(file_extension("weird."), "");
        assert_eq!(file_extension("lib.d/Makefile"), "");
        assert_eq!(file_extension("src/.env"), "");
        assert_eq!(file_extension("pkg\\mod.py"), ".py");
    }
}
