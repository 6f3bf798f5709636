//! Loading screening batches from disk.

use crate::screening::model::{FileCandidate, ScreeningRequest};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Read a JSON batch file.
pub fn read_request(path: &Path) -> Result<ScreeningRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse batch {}", path.display()))
}

/// Collect every UTF-8 file under `root` as a candidate, paths relative to `root`.
///
/// Hidden directories are not entered. Binary files are left out since they
/// could never pass screening.
pub fn collect_candidates(root: &Path) -> Result<Vec<FileCandidate>> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let path = relative.to_string_lossy().replace('\\', "/");
        match String::from_utf8(bytes) {
            Ok(content) => files.push(FileCandidate::new(path, content)),
            Err(_) => debug!(path = %path, "Skipping non-UTF-8 file"),
        }
    }
    Ok(files)
}

/// Build a request from a JSON batch file or a directory.
pub fn load_request(input: &Path, analysis_id: &str, session_id: &str) -> Result<ScreeningRequest> {
    if input.is_dir() {
        let files = collect_candidates(input)?;
        let mut request = ScreeningRequest::new(analysis_id, session_id, files);
        request.repository = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        return Ok(request);
    }
    let mut request = read_request(input)?;
    if request.analysis_id.is_none() {
        request.analysis_id = Some(analysis_id.to_string());
    }
    if request.session_id.is_none() {
        request.session_id = Some(session_id.to_string());
    }
    Ok(request)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collect_candidates_skips_hidden_and_binary() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("src/app.py"), "def run():\n    pass\n").unwrap();
        fs::write(dir.path().join(".git/config.py"), "x = 1").unwrap();
        fs::write(dir.path().join("logo.png"), [0xff, 0xfe, 0x00, 0x81]).unwrap();

        let files = collect_candidates(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/app.py");
        assert_eq!(files[0].size_bytes(), 20);
    }

    #[test]
    fn test_json_batch_keeps_its_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(
            &path,
            r#"{"sessionId":"s-9","analysisId":"a-9","files":[{"path":"a.go","content":"package a"}]}"#,
        )
        .unwrap();

        let request = load_request(&path, "fallback-a", "fallback-s").unwrap();
        assert_eq!(request.analysis_id.as_deref(), Some("a-9"));
        assert_eq!(request.session_id.as_deref(), Some("s-9"));
        assert_eq!(request.files.len(), 1);
    }

    #[test]
    fn test_directory_batch_takes_given_ids() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Main.java"), "class Main {}").unwrap();
        let request = load_request(dir.path(), "a-1", "s-1").unwrap();
        assert_eq!(request.analysis_id.as_deref(), Some("a-1"));
        assert_eq!(request.files[0].path, "Main.java");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_request(&dir.path().join("nope.json"), "a", "s").is_err());
    }
}
