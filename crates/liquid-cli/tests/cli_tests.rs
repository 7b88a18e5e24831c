//! Integration tests for the LiquidCode CLI
//!
//! These tests invoke the actual liquid-cli binary and verify:
//! - Exit codes (0 = success, 1 = invalid input, 2 = error)
//! - stdout/stderr output
//! - JSON output format
//! - All commands work end-to-end

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn liquid_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_liquid-cli"))
}

fn fixture(kind: &str, name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/{}/{}", kind, name))
        .to_string_lossy()
        .into_owned()
}

fn valid(name: &str) -> String {
    fixture("valid", name)
}

fn invalid(name: &str) -> String {
    fixture("invalid", name)
}

fn run_liquid(args: &[&str]) -> std::process::Output {
    Command::new(liquid_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute liquid-cli")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_liquid(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let out = stdout(&output);
    assert!(out.contains("liquid"), "should contain 'liquid'");
    assert!(out.contains(env!("CARGO_PKG_VERSION")), "should contain version");
    assert!(out.contains("schema 1.0"), "should contain schema version");
}

#[test]
fn test_version_flag() {
    let output = run_liquid(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── Parse ─────────────────────────────────────────────────

#[test]
fn test_parse_outputs_schema_json() {
    let output = run_liquid(&["parse", &valid("dashboard.lc")]);
    assert!(output.status.success(), "stderr={}", stderr(&output));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["signals"][0]["name"], "dateRange");
    assert_eq!(json["layers"][0]["root"]["type"], "container");
    assert_eq!(json["layers"][0]["root"]["uid"], "b1");
}

#[test]
fn test_parse_compact_is_single_line() {
    let output = run_liquid(&["parse", "--compact", &valid("minimal.lc")]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim().lines().count(), 1);
}

#[test]
fn test_parse_invalid_exits_1_with_diagnostic() {
    let output = run_liquid(&["parse", &invalid("unclosed-bracket.lc")]);
    assert_eq!(output.status.code(), Some(1), "invalid DSL should exit 1");
    let err = stderr(&output);
    assert!(err.contains("error[parse]"), "stderr={}", err);
    assert!(err.contains("add ']' to close the '[' opened at 1:1"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_parse_nonexistent_file() {
    let output = run_liquid(&["parse", "nonexistent.lc"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
    assert!(stderr(&output).contains("cannot read"));
}

#[test]
fn test_max_depth_flag() {
    let output = run_liquid(&["--max-depth", "1", "parse", &valid("dashboard.lc")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("levels of nesting"));
}

// ── Compile ───────────────────────────────────────────────

#[test]
fn test_compile_schema_json() {
    let output = run_liquid(&["compile", &fixture("schema", "dashboard.json")]);
    assert!(output.status.success(), "stderr={}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("@tab\n"), "signals line first: {}", out);
    assert!(out.contains("Kp :revenue \"Revenue\" #green"));
    assert!(out.contains("Bt \"Details\" >/1"));
    assert!(out.contains("/1 Md [Tb :orders]"));
}

#[test]
fn test_compile_malformed_json_exits_2() {
    let output = run_liquid(&["compile", &fixture("schema", "malformed.json")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("invalid schema JSON"));
}

// ── Check ─────────────────────────────────────────────────

#[test]
fn test_check_valid() {
    for name in ["minimal.lc", "dashboard.lc", "overlay.lc", "live.lc", "list.lc"] {
        let output = run_liquid(&["check", &valid(name)]);
        assert!(output.status.success(), "{} should be valid: {}", name, stderr(&output));
        assert!(stdout(&output).contains("is valid (0 warnings)"), "{}", name);
    }
}

#[test]
fn test_check_invalid() {
    let cases = [
        ("unclosed-bracket.lc", "error[parse]"),
        ("unknown-type.lc", "did you mean 'Kp'"),
        ("undeclared-signal.lc", "error[semantic]"),
        ("dangling-layer.lc", "layer 9 is opened but never defined"),
        ("unterminated-string.lc", "closing '\"'"),
    ];
    for (name, needle) in cases {
        let output = run_liquid(&["check", &invalid(name)]);
        assert_eq!(output.status.code(), Some(1), "{} should exit 1", name);
        let err = stderr(&output);
        assert!(err.contains(needle), "{}: stderr={}", name, err);
    }
}

#[test]
fn test_check_warnings_do_not_fail() {
    let output = run_liquid(&["check", &valid("unused-signal.lc")]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("warning[unused-signal]"));
    assert!(stdout(&output).contains("(1 warning)"));
}

#[test]
fn test_check_json_output() {
    let output = run_liquid(&["check", "--json", &valid("overlay.lc")]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"], 0);
}

#[test]
fn test_check_json_invalid() {
    let output = run_liquid(&["check", "--json", &invalid("unknown-type.lc")]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], false);
    assert_eq!(json["diagnostics"][0]["kind"], "semantic");
    assert_eq!(json["diagnostics"][0]["span"]["column"], 9);
}

#[test]
fn test_check_quiet_valid() {
    let output = run_liquid(&["--quiet", "check", &valid("minimal.lc")]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "quiet mode should produce no stdout");
}

// ── Fmt ───────────────────────────────────────────────────

#[test]
fn test_fmt_outputs_canonical_text() {
    let output = run_liquid(&["fmt", &valid("dashboard.lc")]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("@dateRange\n["));
    assert!(!out.contains("//"), "comments are not part of the canonical form");
}

#[test]
fn test_fmt_idempotent() {
    let first = stdout(&run_liquid(&["fmt", &valid("overlay.lc")]));

    let temp = std::env::temp_dir().join("liquid_test_fmt_idempotent.lc");
    std::fs::write(&temp, &first).expect("write temp");
    let second = stdout(&run_liquid(&["fmt", temp.to_str().unwrap()]));
    assert_eq!(first, second, "fmt must be idempotent");

    let _ = std::fs::remove_file(&temp);
}

#[test]
fn test_fmt_write_flag() {
    let temp = std::env::temp_dir().join("liquid_test_fmt_write.lc");
    std::fs::write(&temp, "[ Kp   :revenue ,\n  Tb :orders ]").expect("write temp");

    let output = run_liquid(&["fmt", "--write", temp.to_str().unwrap()]);
    assert!(output.status.success(), "fmt --write should exit 0");
    let formatted = std::fs::read_to_string(&temp).expect("read formatted");
    assert_eq!(formatted, "[Kp :revenue \"Revenue\", Tb :orders \"Orders\"]\n");

    let _ = std::fs::remove_file(&temp);
}

// ── Roundtrip ─────────────────────────────────────────────

#[test]
fn test_roundtrip_valid_fixtures() {
    for name in ["minimal.lc", "dashboard.lc", "overlay.lc", "live.lc", "list.lc"] {
        let output = run_liquid(&["roundtrip", &valid(name)]);
        assert!(output.status.success(), "{}: {}", name, stdout(&output));
        assert!(stdout(&output).contains("lossless"));
    }
}

#[test]
fn test_roundtrip_json_output() {
    let output = run_liquid(&["roundtrip", "--json", &valid("dashboard.lc")]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["isEquivalent"], true);
    assert!(json["differences"].as_array().unwrap().is_empty());
    assert!(json["dsl"].as_str().unwrap().contains("Kp :revenue"));
}

#[test]
fn test_roundtrip_invalid_input() {
    let output = run_liquid(&["roundtrip", &invalid("dangling-layer.lc")]);
    assert_eq!(output.status.code(), Some(1));
}

// ── Diff ──────────────────────────────────────────────────

#[test]
fn test_diff_identical_files() {
    let path = valid("overlay.lc");
    let output = run_liquid(&["diff", &path, &path]);
    assert!(output.status.success(), "diff of same file should exit 0");
    assert!(stdout(&output).contains("identical"));
}

#[test]
fn test_diff_formatting_only_is_identical() {
    let temp = std::env::temp_dir().join("liquid_test_diff_format.lc");
    std::fs::write(&temp, "Kp    :revenue   \"Revenue\"\n").expect("write temp");

    let output = run_liquid(&["diff", &valid("minimal.lc"), temp.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stdout(&output));

    let _ = std::fs::remove_file(&temp);
}

#[test]
fn test_diff_different_files() {
    let output = run_liquid(&["diff", &valid("minimal.lc"), &valid("dashboard.lc")]);
    assert_eq!(output.status.code(), Some(1), "different files should exit 1");
    let out = stdout(&output);
    assert!(out.contains("---"), "should contain diff markers");
    assert!(out.contains("+++"), "should contain diff markers");
    assert!(out.contains("layers[0].root"));
}

// ── Ast ───────────────────────────────────────────────────

#[test]
fn test_ast_dump() {
    let output = run_liquid(&["ast", &invalid("unknown-type.lc")]);
    assert!(output.status.success(), "unknown codes are resolved later");
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    let codes: Vec<&str> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type_code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["Cn", "Kp", "Kpi"]);
}

// ── Hash ──────────────────────────────────────────────────

#[test]
fn test_hash_valid() {
    let output = run_liquid(&["hash", &valid("dashboard.lc")]);
    assert!(output.status.success(), "hash should exit 0");
    let hash = stdout(&output).trim().to_string();
    assert_eq!(hash.len(), 64, "SHA-256 hash should be 64 hex chars");
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()), "hash should be hex");
}

#[test]
fn test_hash_ignores_formatting() {
    let canonical = stdout(&run_liquid(&["fmt", &valid("dashboard.lc")]));
    let temp = std::env::temp_dir().join("liquid_test_hash_format.lc");
    std::fs::write(&temp, &canonical).expect("write temp");

    let a = stdout(&run_liquid(&["hash", &valid("dashboard.lc")]));
    let b = stdout(&run_liquid(&["hash", temp.to_str().unwrap()]));
    assert_eq!(a, b, "hash is over the canonical form");

    let _ = std::fs::remove_file(&temp);
}

#[test]
fn test_hash_determinism() {
    let path = valid("overlay.lc");
    let first = stdout(&run_liquid(&["hash", &path]));
    for _ in 0..10 {
        assert_eq!(first, stdout(&run_liquid(&["hash", &path])), "hash must be deterministic");
    }
}
