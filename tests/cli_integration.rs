//! CLI integration tests
//!
//! These tests verify the command-line interface behavior, including:
//! - Command parsing and validation
//! - Report formatting
//! - Exit codes

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to get the path to the oasis-build binary
fn oasis_bin() -> PathBuf {
    // In tests, the binary should be at target/debug/oasis-build
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join(format!("oasis-build{}", env::consts::EXE_SUFFIX))
}

/// Command with a clean OASIS_* environment and no step pauses
fn oasis() -> Command {
    let mut cmd = Command::new(oasis_bin());
    for (key, _) in env::vars() {
        if key.starts_with("OASIS_") {
            cmd.env_remove(&key);
        }
    }
    cmd.env("OASIS_STEP_DELAY_MS", "0");
    cmd
}

fn write_steps(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write step list");
    path
}

fn run_file(dir: &Path, file: &Path, extra: &[&str]) -> Output {
    oasis()
        .arg("run")
        .arg(file)
        .arg("-C")
        .arg(dir)
        .arg("--no-progress")
        .args(extra)
        .output()
        .expect("Failed to execute oasis-build")
}

#[test]
fn test_cli_help() {
    let output = oasis()
        .arg("--help")
        .output()
        .expect("Failed to execute oasis-build");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("oasis-build"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("exec"));
    assert!(stdout.contains("verify"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("filter"));
}

#[test]
fn test_cli_version() {
    let output = oasis()
        .arg("--version")
        .output()
        .expect("Failed to execute oasis-build");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("oasis-build"));
}

#[test]
fn test_config_command() {
    let output = oasis()
        .arg("config")
        .output()
        .expect("Failed to execute oasis-build");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Shell:"));
    assert!(stdout.contains("Step delay: 0ms"));
}

#[test]
fn test_config_command_rejects_bad_env() {
    let output = oasis()
        .arg("config")
        .env("OASIS_STEP_DELAY_MS", "later")
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OASIS_STEP_DELAY_MS"));
}

#[cfg(unix)]
#[test]
fn test_exec_success() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let output = oasis()
        .args(["exec", "echo hello from oasis", "--no-progress", "-C"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello from oasis"));
    assert!(stdout.contains("Executing custom build command..."));
    assert!(stdout.contains("BUILD PROCESS COMPLETED SUCCESSFULLY"));
    assert!(stdout.contains("Build Report"));
}

#[cfg(unix)]
#[test]
fn test_exec_failing_command_exits_one() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let output = oasis()
        .args(["exec", "exit 4", "--no-progress", "-C"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Exit code: 4"));
}

#[test]
fn test_exec_empty_command() {
    let output = oasis()
        .args(["exec", "   ", "--no-progress"])
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Custom command cannot be empty"));
}

#[cfg(unix)]
#[test]
fn test_run_toml_json_report() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let steps = write_steps(
        &dir,
        "steps.toml",
        r#"
[[steps]]
name = "Greet"
command = "echo hi"
progress = 50

[[steps]]
name = "Break"
command = "exit 3"
progress = 100
"#,
    );

    let output = run_file(dir.path(), &steps, &["--format", "json"]);

    assert_eq!(output.status.code(), Some(1));
    // The log goes to stderr so stdout holds only the report
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["steps"][0]["outcome"]["kind"], "succeeded");
    assert_eq!(report["steps"][1]["outcome"]["detail"], 3);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[1/2] Greet"));
}

#[cfg(unix)]
#[test]
fn test_run_yaml_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let steps = write_steps(
        &dir,
        "steps.yaml",
        "steps:\n  - name: Touch\n    command: touch made.txt\n    progress: 100\n",
    );

    let output = run_file(dir.path(), &steps, &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("made.txt").exists());
}

#[test]
fn test_run_malformed_step_exits_two() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let steps = write_steps(
        &dir,
        "steps.json",
        r#"{"steps":[{"name":"Empty","command":"","progress":100}]}"#,
    );

    let output = run_file(dir.path(), &steps, &[]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("BUILD FAILED"));
    assert!(stdout.contains("BUILD PROCESS TERMINATED"));
}

#[test]
fn test_run_missing_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_file(dir.path(), &dir.path().join("absent.toml"), &[]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read step list"));
}

#[test]
fn test_run_unsupported_format() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let steps = write_steps(&dir, "steps.ini", "[steps]");

    let output = run_file(dir.path(), &steps, &[]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported step list format"));
}

#[test]
fn test_run_missing_working_directory() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let steps = write_steps(
        &dir,
        "steps.json",
        r#"{"steps":[{"name":"Echo","command":"echo hi","progress":100}]}"#,
    );

    let output = run_file(Path::new("/nonexistent/oasis/dir"), &steps, &[]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Working directory does not exist"));
}

#[test]
fn test_verify_requires_native_source() {
    let output = oasis()
        .args(["verify", "--java-source", "app"])
        .output()
        .expect("Failed to execute oasis-build");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--native-source"));
}

#[cfg(unix)]
#[test]
fn test_build_runs_chosen_tool_steps() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    // No pom.xml, so every Maven step fails whether or not mvn is installed
    let output = oasis()
        .args(["build", "--tool", "maven", "--no-progress", "--format", "json"])
        .arg("--java-source")
        .arg(dir.path())
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
    assert_eq!(report["status"], "completed");

    let steps = report["steps"].as_array().expect("steps should be an array");
    let names: Vec<&str> = steps.iter().filter_map(|s| s["name"].as_str()).collect();
    assert_eq!(
        names,
        vec!["Maven clean...", "Maven compile...", "Maven package...", "Maven install..."]
    );
    let first = steps[0]["command"].as_str().unwrap_or_default();
    assert_eq!(first, format!("cd \"{}\" && mvn clean", dir.path().display()));
}

#[test]
fn test_build_requires_java_source() {
    let output = oasis()
        .args(["build", "--java-source", "  ", "--tool", "javac", "--no-progress"])
        .output()
        .expect("Failed to execute oasis-build");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Java source path is required"));
}

#[test]
fn test_filter_stdin() {
    let mut child = oasis()
        .arg("filter")
        .arg("--explain")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute oasis-build");

    {
        let stdin = child.stdin.as_mut().expect("stdin should be piped");
        stdin
            .write_all(b"C:\\Users\\dev>mvn package\n[INFO] Building app\n\n=====\n[INFO] BUILD SUCCESS\n")
            .expect("Failed to write stdin");
    }
    let output = child.wait_with_output().expect("Failed to wait for oasis-build");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "[INFO] Building app\n[INFO] BUILD SUCCESS\n");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mvn package"));
}
