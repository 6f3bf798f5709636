use super::*;
use pretty_assertions::assert_eq;

const JAVA_SAMPLE: &str = r#"package com.shop;

import java.util.List;

/**
 * Orders.
 */
public class OrderService {
    // cache of orders
    private final Repo repo;

    public Order find(long id) {
        return repo.get(id); // lookup
    }

    List<Order> recent(int limit) {
        String url = "http://example.com/orders";
        return repo.recent(limit);
    }
}
"#;

#[test]
fn test_empty_content_yields_empty_output() {
    for mode in [Mode::Screening, Mode::Detection] {
        assert_eq!(optimize("", "java", mode), "");
        assert_eq!(optimize("  \n\t\n", "python", mode), "");
    }
}

#[test]
fn test_screening_keeps_only_signatures() {
    let out = optimize(JAVA_SAMPLE, "java", Mode::Screening);
    assert_eq!(
        out,
        "public class OrderService { public Order find(long id) { List<Order> recent(int limit) {"
    );
}

#[test]
fn test_detection_drops_boilerplate_and_keeps_code() {
    let out = optimize(JAVA_SAMPLE, "java", Mode::Detection);
    assert!(out.starts_with("public class OrderService { private final Repo repo;"));
    assert!(out.contains("{ return repo.get(id); List<Order> recent(int limit) {"));
    assert!(out.contains("\"http://example.com/orders\";"));
    assert!(!out.contains("import"));
    assert!(!out.contains("package"));
    assert!(!out.contains("lookup"));
    assert!(!out.contains('\n'));
}

#[test]
fn test_optimize_is_idempotent_below_budget() {
    for mode in [Mode::Screening, Mode::Detection] {
        let once = optimize(JAVA_SAMPLE, "java", mode);
        assert_eq!(optimize(&once, "java", mode), once, "mode {:?}", mode);
    }
}

#[test]
fn test_output_never_exceeds_budget() {
    let mut java = String::from("public class Big {\n");
    for i in 0..2000 {
        java.push_str(&format!(
            "    public int method{}(int a, int b) {{ return a + b + {}; }}\n",
            i, i
        ));
    }
    java.push_str("}\n");
    let wide = "é漢字 ".repeat(5000);
    for (content, lang) in [(java.as_str(), "java"), (wide.as_str(), "unknown")] {
        for mode in [Mode::Screening, Mode::Detection] {
            let out = optimize(content, lang, mode);
            assert!(
                out.chars().count() <= mode.budget(),
                "{} {:?} produced {} chars",
                lang,
                mode,
                out.chars().count()
            );
            assert!(!out.is_empty());
        }
    }
}

#[test]
fn test_comment_markers_inside_strings_survive() {
    let js = config_for("javascript");
    let stripped = strip_comments("const u = \"http://x.io/a\"; // trailing\n", js);
    assert!(stripped.contains("\"http://x.io/a\""));
    assert!(!stripped.contains("trailing"));

    let py = config_for("python");
    let stripped = strip_comments(
        "def f():\n    \"\"\"Doc // not code\"\"\"\n    x = '#kept'  # dropped\n",
        py,
    );
    assert!(!stripped.contains("Doc"));
    assert!(stripped.contains("'#kept'"));
    assert!(!stripped.contains("dropped"));
}

#[test]
fn test_unknown_language_keeps_leading_lines() {
    let content: String = (0..80).map(|i| format!("val x{} = {}\n", i, i)).collect();
    let out = optimize(&content, "unknown", Mode::Screening);
    assert!(out.starts_with("val x0 = 0 val x1 = 1"));
    assert!(out.contains("val x49 = 49"));
    assert!(!out.contains("val x50 ="));
}

#[test]
fn test_script_without_declarations_falls_back_to_head() {
    let out = optimize("print('hi')\nx = compute()\n", "python", Mode::Screening);
    assert_eq!(out, "print('hi') x = compute()");
}

#[test]
fn test_limit_length_cut_rule() {
    let with_late_semicolon = format!("{};{}", "a".repeat(900), "b".repeat(200));
    let out = limit_length(&with_late_semicolon, 1000);
    assert_eq!(out.len(), 901);
    assert!(out.ends_with(';'));

    let with_newline = format!("{}\n{}", "a".repeat(850), "b".repeat(300));
    assert_eq!(limit_length(&with_newline, 1000), "a".repeat(850));

    let early_boundary = format!("{};{}", "a".repeat(100), "b".repeat(1500));
    assert_eq!(limit_length(&early_boundary, 1000).chars().count(), 1000);

    // A boundary just past the budget is not reachable.
    let past_budget = format!("{};", "a".repeat(1000));
    assert_eq!(limit_length(&past_budget, 1000), "a".repeat(1000));

    assert_eq!(limit_length("short", 1000), "short");
}

#[test]
fn test_token_estimate() {
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(estimate_tokens("abcdefgh"), 2);
    assert_eq!(estimate_tokens("abc"), 0);
}

#[test]
fn test_mode_from_str() {
    assert_eq!("Detection".parse::<Mode>(), Ok(Mode::Detection));
    assert_eq!("screening".parse::<Mode>(), Ok(Mode::Screening));
    assert!("suggestion".parse::<Mode>().is_err());
}

#[test]
fn test_suggestion_context_windows_and_hints() {
    let code = format!("{}{}{}", "a".repeat(400), "b".repeat(200), "c".repeat(400));
    let surrounding = "s".repeat(400);
    let ctx = suggestion_context(&code, &surrounding, "Java", "sql-injection");
    assert_eq!(ctx.focused_code.chars().count(), 500);
    assert!(ctx.focused_code.starts_with('a'));
    assert!(ctx.focused_code.contains(&"b".repeat(200)));
    assert!(ctx.focused_code.ends_with('c'));
    assert_eq!(ctx.context, format!("{}...", "s".repeat(300)));
    assert_eq!(
        ctx.hints,
        vec!["Use PreparedStatement".to_string(), "Consider Spring Data JPA".to_string()]
    );
    assert_eq!(ctx.token_estimate, 200);

    let py = suggestion_context("for x in y: out.append(x)", "", "python", "performance");
    assert_eq!(py.focused_code, "for x in y: out.append(x)");
    assert_eq!(py.hints.len(), 2);

    let go = suggestion_context("x", "y", "go", "performance");
    assert!(go.hints.is_empty());
}
