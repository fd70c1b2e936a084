use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn viruskg_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_viruskg"))
}

fn run(args: &[&str]) -> Output {
    Command::new(viruskg_bin())
        .args(args)
        .env_remove("NEO4J_PASSWORD")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run viruskg")
}

fn write_input(dir: &Path) -> PathBuf {
    let path = dir.join("viruses.jsonl");
    let lines = [
        serde_json::json!({
            "virus_name": "Cascade",
            "origin": "Germany",
            "virus_characteristics": "Symptoms: falling letters. Infected .COM files have a file length increase of 1,701 bytes. Done."
        }),
        serde_json::json!({ "virus_name": "Unknown", "origin": "Nowhere" }),
        serde_json::json!({ "virus_name": "Stoned", "type": "Boot" }),
    ];
    let mut text = String::new();
    for line in lines {
        text.push_str(&line.to_string());
        text.push('\n');
    }
    text.push_str("{ this line is broken\n");
    fs::write(&path, text).expect("write input");
    path
}

fn read_triples(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .expect("read output")
        .lines()
        .map(|l| serde_json::from_str(l).expect("output line is JSON"))
        .collect()
}

#[test]
fn writes_triples_file_without_any_services() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("triples.jsonl");

    let out = run(&[
        "--input-file",
        input.to_str().unwrap(),
        "--output-file",
        output.to_str().unwrap(),
        "--output-to-file",
        "--annotator",
        "none",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let triples = read_triples(&output);
    let has = |s: &str, r: &str, o: &str| {
        triples
            .iter()
            .any(|t| t["subject"] == s && t["relation"] == r && t["object"] == o)
    };
    assert!(has("Cascade", "is_a", "Virus"));
    assert!(has("Cascade", "has_origin", "Germany"));
    assert!(has("Cascade", "has_symptoms", "falling letters."));
    assert!(has("Cascade", "COM_length_increase", "1,701 bytes."));
    assert!(has("Stoned", "has_type", "Boot"));
    assert!(!triples.iter().any(|t| t["subject"] == "Unknown"));
    assert_eq!(triples.len(), 6);

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("malformed lines:  1"), "{stdout}");
}

#[test]
fn append_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("triples.jsonl");
    let args = [
        "--input-file",
        input.to_str().unwrap(),
        "--output-file",
        output.to_str().unwrap(),
        "--output-to-file",
        "--annotator",
        "none",
        "--append",
    ];
    assert!(run(&args).status.success());
    assert!(run(&args).status.success());
    assert_eq!(read_triples(&output).len(), 12);
}

#[test]
fn memory_graph_dry_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());

    let out = run(&[
        "--input-file",
        input.to_str().unwrap(),
        "--insert-into-graph",
        "--graph-backend",
        "memory",
        "--annotator",
        "none",
        "--batch-size",
        "2",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("triples to graph: 6"), "{stdout}");
}

#[test]
fn graph_ingestion_without_password_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());

    let out = run(&["--input-file", input.to_str().unwrap(), "--insert-into-graph"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("password"));
}

#[test]
fn no_operation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());

    let out = run(&["--input-file", input.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no operation specified"));
}

#[test]
fn unwritable_output_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("missing-dir/triples.jsonl");

    let out = run(&[
        "--input-file",
        input.to_str().unwrap(),
        "--output-file",
        output.to_str().unwrap(),
        "--output-to-file",
        "--annotator",
        "none",
    ]);
    assert!(!out.status.success());
}

#[test]
fn run_is_logged_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("triples.jsonl");

    let out = Command::new(viruskg_bin())
        .args([
            "--input-file",
            input.to_str().unwrap(),
            "--output-file",
            output.to_str().unwrap(),
            "--output-to-file",
            "--annotator",
            "none",
        ])
        .env_remove("NEO4J_PASSWORD")
        .env("RUST_LOG", "info")
        .output()
        .expect("run viruskg");
    assert!(out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("starting run"), "{stderr}");
    assert!(stderr.contains("run complete"), "{stderr}");
    // logs never go to stdout, which carries the summary
    assert!(!String::from_utf8_lossy(&out.stdout).contains("starting run"));
}
