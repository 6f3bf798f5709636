use super::*;
use crate::llm::testing::{access_denied, converse_body, ScriptedTransport};
use crate::llm::TransportFailure;
use model::{Complexity, ReportStatus, ScreeningOptions};
use pretty_assertions::assert_eq;

const PYTHON_VERDICT: &str = "LANGUAGE: python\nCONFIDENCE: 85%\nCOMPLEXITY: low\nVALID: yes";

fn screener(script: Vec<Result<String, TransportFailure>>) -> Screener<ScriptedTransport> {
    let config = Config::default();
    Screener::new(
        InvocationClient::new(ScriptedTransport::new(script), &config),
        &config,
    )
}

fn request(files: Vec<FileCandidate>) -> ScreeningRequest {
    ScreeningRequest::new("analysis-1", "session-1", files)
}

fn assert_accounted(report: &ScreeningReport) {
    let summary = report.summary.as_ref().unwrap();
    assert_eq!(
        summary.valid_files + summary.skipped_files + summary.error_files,
        summary.input_files
    );
}

#[tokio::test(start_paused = true)]
async fn test_access_denied_falls_back_without_error() {
    let screener = screener(vec![Err(access_denied())]);
    let report = screener
        .screen(&request(vec![FileCandidate::new(
            "src/main/java/Service.java",
            "public class Service {\n    public void run() {}\n}\n",
        )]))
        .await;

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.files.len(), 1);
    let file = &report.files[0];
    assert_eq!(file.language, "java");
    assert_eq!(file.confidence, 0.8);
    assert_eq!(file.complexity, Complexity::Medium);
    assert_eq!(file.verdict_source, VerdictSource::Fallback);

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.error_files, 0);
    assert_eq!(summary.valid_files, 1);
    assert!(report.errors.is_empty());
    assert_eq!(report.metadata["observedUsage"]["fallbacks"], 1);
    assert!(report.warnings.iter().any(|w| w.contains("fallback")));
    // Access denied is terminal: exactly one dispatch.
    assert_eq!(screener.client().transport().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_file_list_is_batch_error_without_work() {
    let screener = screener(Vec::new());
    let report = screener.screen(&request(Vec::new())).await;
    assert_eq!(report.status, ReportStatus::Error);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, "SCREENING_FAILED");
    assert!(report.errors[0].message.contains("files"));
    assert!(report.summary.is_none());
    assert!(report.files.is_empty());
    assert_eq!(report.next_stage, "detection");
    assert_eq!(screener.client().transport().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_identifiers_are_batch_errors() {
    let screener = screener(Vec::new());
    let mut req = request(vec![FileCandidate::new("a.py", "x = 1")]);
    req.session_id = None;
    let report = screener.screen(&req).await;
    assert_eq!(report.status, ReportStatus::Error);
    assert_eq!(report.analysis_id.as_deref(), Some("analysis-1"));
    assert_eq!(screener.client().transport().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_classifier_verdict_is_used() {
    let screener = screener(vec![Ok(converse_body(PYTHON_VERDICT, 120, 30))]);
    let report = screener
        .screen(&request(vec![FileCandidate::new(
            "app/main.py",
            "import os\n\ndef main():\n    print(os.getcwd())\n",
        )]))
        .await;

    assert_eq!(report.status, ReportStatus::Success);
    let file = &report.files[0];
    assert_eq!(file.language, "python");
    assert_eq!(file.confidence, 0.85);
    assert_eq!(file.complexity, Complexity::Low);
    assert_eq!(file.verdict_source, VerdictSource::Classifier);
    assert_eq!(file.optimized_content, "def main():");
    assert_eq!(file.line_count, 4);

    let usage = report.token_usage.as_ref().unwrap();
    assert_eq!(usage.input_tokens, 100);
    assert_eq!(usage.output_tokens, 50);
    assert_eq!(usage.model_calls, 1);
    assert_eq!(report.metadata["observedUsage"]["inputTokens"], 120);
    assert_eq!(report.metadata["classifierVerdicts"], 1);

    let prompts = screener.client().transport().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("File: main.py"));
    assert!(prompts[0].contains("Content preview: def main():"));
    assert_eq!(
        screener.client().call_statistics().get("micro:screening"),
        Some(&1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_verdict_is_skipped_not_an_error() {
    let screener = screener(vec![
        Ok(converse_body(PYTHON_VERDICT, 1, 1)),
        Ok(converse_body(
            "LANGUAGE: other\nCONFIDENCE: 0.9\nCOMPLEXITY: low\nVALID: no\nREASON: data file",
            1,
            1,
        )),
    ]);
    let report = screener
        .screen(&request(vec![
            FileCandidate::new("a.py", "def a():\n    pass\n"),
            FileCandidate::new("b.py", "1,2,3\n4,5,6\n"),
        ]))
        .await;

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, "a.py");
    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.processed_files, 2);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(summary.rejected_files, 1);
    assert_eq!(summary.error_files, 0);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_candidate_yields_partial_success() {
    let mut no_content = FileCandidate::new("lib/empty.rb", "");
    no_content.content = None;
    no_content.size = Some(40);

    let screener = screener(vec![Ok(converse_body(PYTHON_VERDICT, 1, 1))]);
    let report = screener
        .screen(&request(vec![
            FileCandidate::new("job.py", "def run():\n    return 1\n"),
            no_content,
            FileCandidate::new("notes.md", "# notes"),
        ]))
        .await;

    assert_eq!(report.status, ReportStatus::PartialSuccess);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, "MISSING_CONTENT");
    assert_eq!(report.errors[0].file_path.as_deref(), Some("lib/empty.rb"));
    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.input_files, 3);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(summary.error_files, 1);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_declared_size_cannot_hide_oversized_content() {
    let mut lying = FileCandidate::new("big.go", "x".repeat(2048));
    lying.size = Some(10);
    let options = ScreeningOptions {
        max_file_size: 1024,
        ..ScreeningOptions::default()
    };
    let mut req = request(vec![lying]);
    req.options = Some(options);

    let screener = screener(Vec::new());
    let report = screener.screen(&req).await;
    // The only processed file errored.
    assert_eq!(report.status, ReportStatus::Error);
    assert_eq!(report.errors[0].code, "CONTENT_TOO_LARGE");
    assert_eq!(screener.client().transport().calls(), 0);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_offline_mode_never_calls_the_classifier() {
    let mut req = request(vec![
        FileCandidate::new("src/app.ts", "export function start(): void {}\n"),
        FileCandidate::new("src/util.kt", "fun util() = 1\n"),
    ]);
    req.options = Some(ScreeningOptions {
        enable_classifier: false,
        ..ScreeningOptions::default()
    });

    let screener = screener(Vec::new());
    let report = screener.screen(&req).await;
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].language, "typescript");
    assert_eq!(report.files[1].language, "unknown");
    assert!(report
        .files
        .iter()
        .all(|f| f.verdict_source == VerdictSource::Fallback));
    assert_eq!(report.metadata["classifierEnabled"], false);
    assert!(report.warnings[0].contains("Classifier disabled"));
    assert_eq!(screener.client().transport().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_filter_scenario_counts_skips() {
    let screener = screener(vec![Ok(converse_body(
        "LANGUAGE: java\nCONFIDENCE: 0.95\nCOMPLEXITY: medium\nVALID: yes",
        1,
        1,
    ))]);
    let report = screener
        .screen(&request(vec![
            FileCandidate::new("src/main/java/App.java", "public class App {}\n"),
            FileCandidate::new("README.md", "# readme\n"),
            FileCandidate::new("src/test/java/AppTest.java", "class AppTest {}\n"),
        ]))
        .await;

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.processed_files, 1);
    assert_eq!(summary.skipped_files, 2);
    assert_eq!(summary.valid_files, 1);
    assert_eq!(summary.language_distribution.get("java"), Some(&1));
    assert_eq!(report.metadata["filterRejections"]["excluded_path"], 1);
    assert_eq!(report.metadata["filterRejections"]["unsupported_extension"], 1);
    assert_eq!(screener.client().transport().calls(), 1);
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_file_limit_skips_and_warns() {
    let files = (0..3)
        .map(|i| FileCandidate::new(format!("m{}.py", i), "def f():\n    pass\n"))
        .collect();
    let mut req = request(files);
    req.options = Some(ScreeningOptions {
        max_files: Some(2),
        enable_classifier: false,
        ..ScreeningOptions::default()
    });

    let report = screener(Vec::new()).screen(&req).await;
    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.valid_files, 2);
    assert_eq!(summary.skipped_files, 1);
    assert!(report.warnings.iter().any(|w| w.contains("File limit of 2")));
    assert_accounted(&report);
}

#[tokio::test(start_paused = true)]
async fn test_large_batch_without_options_is_fully_processed() {
    let files = (0..60)
        .map(|i| FileCandidate::new(format!("src/M{}.java", i), "public class M {}\n"))
        .collect();
    let req = request(files);
    assert!(req.options.is_none());

    // Scripted transport runs dry immediately, so every file takes the fallback path.
    let report = screener(Vec::new()).screen(&req).await;
    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.processed_files, 60);
    assert_eq!(summary.valid_files, 60);
    assert_eq!(summary.skipped_files, 0);
    assert!(!report.warnings.iter().any(|w| w.contains("File limit")));
    assert_accounted(&report);
}
