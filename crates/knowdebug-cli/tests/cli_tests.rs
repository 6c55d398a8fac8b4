//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn knowdebug() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("knowdebug").unwrap()
}

fn files_ending_with(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect()
}

#[test]
fn validate_valid_script() {
    knowdebug()
        .arg("validate")
        .arg("--script")
        .arg("../../scripts/rust-basics.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 domains, 16 answers"))
        .stdout(predicate::str::contains("All scripts valid"));
}

#[test]
fn validate_directory() {
    knowdebug()
        .arg("validate")
        .arg("--script")
        .arg("../../scripts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Script: async-rust"))
        .stdout(predicate::str::contains("Script: rust-basics"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("odd.toml");
    std::fs::write(
        &path,
        r#"
[session]
main_topic = "Odd"

[[domains]]
domain_name = "Empty"

[[domains]]
domain_name = "Bad"

[[domains.answers]]
correct = true
response_time = 10.0
confidence = 1.5
tag = "t"
"#,
    )
    .unwrap();

    knowdebug()
        .arg("validate")
        .arg("--script")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Empty] WARNING: no answers"))
        .stdout(predicate::str::contains("[Bad] WARNING: answer #1"))
        .stdout(predicate::str::contains("2 warning(s) found."));
}

#[test]
fn validate_nonexistent_file() {
    knowdebug()
        .arg("validate")
        .arg("--script")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    knowdebug()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created knowdebug.toml"))
        .stdout(predicate::str::contains("Created scripts/example.toml"));

    assert!(dir.path().join("knowdebug.toml").exists());

    // The generated script is itself valid
    knowdebug()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--script")
        .arg("scripts/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All scripts valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("knowdebug.toml"), "# mine\n").unwrap();

    knowdebug()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("knowdebug.toml already exists"));

    let content = std::fs::read_to_string(dir.path().join("knowdebug.toml")).unwrap();
    assert_eq!(content, "# mine\n");
}

#[test]
fn simulate_prints_summary() {
    knowdebug()
        .arg("simulate")
        .arg("--script")
        .arg("../../scripts/rust-basics.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Topic: Rust basics"))
        .stdout(predicate::str::contains("MASTERED"))
        .stdout(predicate::str::contains("COMPLETED"))
        .stdout(predicate::str::contains("IN_PROGRESS"))
        .stdout(predicate::str::contains("Overall: 12/16 correct"));
}

#[test]
fn simulate_writes_all_formats() {
    let out = TempDir::new().unwrap();

    knowdebug()
        .arg("simulate")
        .arg("--script")
        .arg("../../scripts/async-rust.toml")
        .arg("--output")
        .arg(out.path())
        .arg("--format")
        .arg("all")
        .assert()
        .success();

    for name in [
        "async-rust-session.json",
        "async-rust-report.json",
        "async-rust-report.html",
        "async-rust-report.md",
    ] {
        assert!(out.path().join(name).exists(), "missing {name}");
    }

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.path().join("async-rust-report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["domains_assessed"], 2);
    let html = std::fs::read_to_string(out.path().join("async-rust-report.html")).unwrap();
    assert!(html.contains("Tokio runtime"));
}

#[test]
fn simulate_rejects_unknown_format() {
    knowdebug()
        .arg("simulate")
        .arg("--script")
        .arg("../../scripts/async-rust.toml")
        .arg("--format")
        .arg("sarif")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format 'sarif'"));
}

#[test]
fn render_report_to_markdown() {
    let out = TempDir::new().unwrap();

    knowdebug()
        .arg("simulate")
        .arg("--script")
        .arg("../../scripts/rust-basics.toml")
        .arg("--output")
        .arg(out.path())
        .assert()
        .success();

    let target = out.path().join("rendered.md");
    knowdebug()
        .arg("render")
        .arg("--report")
        .arg(out.path().join("rust-basics-report.json"))
        .arg("--session")
        .arg(out.path().join("rust-basics-session.json"))
        .arg("--format")
        .arg("md")
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered"));

    let md = std::fs::read_to_string(&target).unwrap();
    assert!(md.contains("Knowledge Assessment Report: Rust basics"));
    assert!(md.contains("Ownership"));
}

#[test]
fn render_defaults_to_html_next_to_report() {
    let out = TempDir::new().unwrap();

    knowdebug()
        .arg("simulate")
        .arg("--script")
        .arg("../../scripts/rust-basics.toml")
        .arg("--output")
        .arg(out.path())
        .assert()
        .success();

    knowdebug()
        .arg("render")
        .arg("--report")
        .arg(out.path().join("rust-basics-report.json"))
        .assert()
        .success();

    assert!(out.path().join("rust-basics-report.html").exists());
}

#[test]
fn run_with_mock_generator() {
    let work = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    knowdebug()
        .current_dir(work.path())
        .env("HOME", home.path())
        .env_remove("KNOWDEBUG_GEMINI_KEY")
        .env_remove("KNOWDEBUG_OPENAI_KEY")
        .arg("run")
        .arg("--source")
        .arg("https://www.youtube.com/watch?v=abc")
        .arg("--generator")
        .arg("mock")
        .arg("--domains")
        .arg("1")
        .write_stdin("2\n80\n".repeat(5))
        .assert()
        .success()
        .stdout(predicate::str::contains("Topic: Mock Video Topic"))
        .stdout(predicate::str::contains("Correct!"))
        .stdout(predicate::str::contains(
            "Finished 'Mock Domain 1 from Video': MASTERED (5/5 correct)",
        ))
        .stdout(predicate::str::contains(
            "Knowledge Assessment Report: Mock Video Topic",
        ));

    let results = work.path().join("knowdebug-results");
    let sessions = files_ending_with(&results, "-session.json");
    assert_eq!(sessions.len(), 1);
    assert_eq!(files_ending_with(&results, "-report.json").len(), 1);

    let session: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&sessions[0]).unwrap()).unwrap();
    assert_eq!(session["total_correct"], 5);
    assert_eq!(session["source"], "https://www.youtube.com/watch?v=abc");
}

#[test]
fn run_quitting_early_skips_report() {
    let work = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    knowdebug()
        .current_dir(work.path())
        .env("HOME", home.path())
        .arg("run")
        .arg("--source")
        .arg("notes.txt")
        .arg("--generator")
        .arg("mock")
        .arg("--domains")
        .arg("2")
        .write_stdin("1\n\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Incorrect. The answer was 2."))
        .stdout(predicate::str::contains("Left 'Mock Domain 2 from Video' unfinished."))
        .stdout(predicate::str::contains("no report generated"));

    let results = work.path().join("knowdebug-results");
    assert_eq!(files_ending_with(&results, "-session.json").len(), 1);
    assert!(files_ending_with(&results, "-report.json").is_empty());
}

#[test]
fn run_rejects_out_of_range_domain() {
    let work = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    knowdebug()
        .current_dir(work.path())
        .env("HOME", home.path())
        .arg("run")
        .arg("--source")
        .arg("notes.txt")
        .arg("--generator")
        .arg("mock")
        .arg("--domains")
        .arg("9")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("domain 9 out of range (1-4)"));
}

#[test]
fn run_unknown_generator_fails() {
    let work = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    knowdebug()
        .current_dir(work.path())
        .env("HOME", home.path())
        .arg("run")
        .arg("--source")
        .arg("notes.txt")
        .arg("--generator")
        .arg("claude")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown generator 'claude'"));
}
