//! Integration tests driving the pvalab binary end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pvalab() -> Command {
    Command::cargo_bin("pvalab").unwrap()
}

/// Recording with one breath answering each of two efforts plus a third
/// ventilator cycle in the pause between them: exactly one auto-trigger
/// event at sample 300.
fn auto_trigger_csv() -> String {
    let blocks: [(f64, usize); 7] = [
        (2.0, 94),
        (3.0, 16),
        (4.0, 190),
        (5.0, 40),
        (6.0, 154),
        (7.0, 16),
        (8.0, 190),
    ];
    let mut volume = Vec::new();
    for &(value, count) in &blocks {
        volume.extend(std::iter::repeat(value).take(count));
    }

    let mut pmus = vec![0.0; 700];
    for &at in &[100usize, 500] {
        let ramp = [0.2, 0.4, 0.6, 0.8];
        for (k, &fraction) in ramp.iter().enumerate() {
            pmus[at + k] = -2.0 * fraction;
            pmus[at + 27 - k] = -2.0 * fraction;
        }
        for k in 4..24 {
            pmus[at + k] = -2.0;
        }
    }

    let mut content = String::from("volume,pmus\n");
    for (v, p) in volume.iter().zip(pmus.iter()) {
        content.push_str(&format!("{:.1},{:.1}\n", v, p));
    }
    content
}

fn quiet_csv() -> String {
    let mut content = String::from("volume,pmus\n");
    for _ in 0..40 {
        content.push_str("0.0,0.0\n");
    }
    content
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    pvalab()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    pvalab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pvalab"));
}

#[test]
fn test_help_flag() {
    pvalab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("asynchron"));
}

#[test]
fn test_analyze_missing_file_arg() {
    pvalab()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--file"));
}

// =============================================================================
// TYPES
// =============================================================================

#[test]
fn test_types_lists_all_classes() {
    pvalab()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("Double trigger"))
        .stdout(predicate::str::contains("IEE"))
        .stdout(predicate::str::contains("Ineffective effort"));
}

#[test]
fn test_types_json_output() {
    let output = pvalab().args(["types", "--json"]).assert().success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 8);

    let abbrevs: Vec<&str> = rows
        .iter()
        .map(|row| row.get("abbreviation").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(
        abbrevs,
        vec!["DT", "RTs", "RTd", "LC", "DTR", "ATT", "EC", "IEE"]
    );
}

// =============================================================================
// VALIDATE
// =============================================================================

#[test]
fn test_validate_good_recording() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "good.csv", "time,volume,pmus\n0.00,0.0,0.0\n0.01,0.0,0.0\n");

    pvalab()
        .args(["validate", "--file", &path, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"))
        .stdout(predicate::str::contains("\"sample_count\": 2"));
}

#[test]
fn test_validate_missing_file() {
    pvalab()
        .args(["validate", "--file", "/no/such/recording.csv", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"valid\": false"));
}

#[test]
fn test_validate_reports_missing_column() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "partial.csv", "time,volume\n0.00,0.0\n");

    pvalab()
        .args(["validate", "--file", &path, "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("pmus"));
}

// =============================================================================
// ANALYZE
// =============================================================================

#[test]
fn test_analyze_missing_file() {
    pvalab()
        .args(["analyze", "--file", "/no/such/recording.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_analyze_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.edf", "binary");

    pvalab()
        .args(["analyze", "--file", &path])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_analyze_detects_auto_trigger() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());

    pvalab()
        .args(["analyze", "--file", &path, "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"auto_trigger\""))
        .stdout(predicate::str::contains("\"sample_index\": 300"))
        .stdout(predicate::str::contains("\"event_count\": 1"));
}

#[test]
fn test_analyze_types_filter_excludes_other_classes() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());

    pvalab()
        .args(["analyze", "--file", &path, "--quiet", "--types", "DT", "IEE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"event_count\": 0"));
}

#[test]
fn test_analyze_rejects_unknown_type_abbreviation() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());

    pvalab()
        .args(["analyze", "--file", &path, "--types", "XY"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown asynchrony type 'XY'"))
        .stderr(predicate::str::contains("RTs"));
}

#[test]
fn test_analyze_quiet_recording_warns_and_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flat.csv", &quiet_csv());

    pvalab()
        .args(["analyze", "--file", &path, "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"event_count\": 0"))
        .stderr(predicate::str::contains("Nothing to classify"));
}

#[test]
fn test_analyze_env_sample_rate() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());

    pvalab()
        .env("PVALAB_SAMPLE_RATE", "250")
        .args(["analyze", "--file", &path, "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sample_rate\": 250.0"));
}

#[test]
fn test_analyze_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());
    let out = dir.path().join("result.json");

    pvalab()
        .args([
            "analyze",
            "--file",
            &path,
            "--quiet",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("\"auto_trigger\""));
    assert!(written.contains("\"created_at\""));
}

#[test]
fn test_analyze_compact_output_is_single_line() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());
    let out = dir.path().join("result.json");

    pvalab()
        .args([
            "analyze",
            "--file",
            &path,
            "--quiet",
            "--compact",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(!written.contains('\n'));
}

// =============================================================================
// MARKS
// =============================================================================

#[test]
fn test_marks_reports_cycles_and_efforts() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recording.csv", &auto_trigger_csv());

    pvalab()
        .args(["marks", "--file", &path, "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"breath_count\": 3"))
        .stdout(predicate::str::contains("\"effort_count\": 2"))
        .stdout(predicate::str::contains("\"inspiration\": 300"));
}

// =============================================================================
// BATCH
// =============================================================================

#[test]
fn test_batch_dry_run_lists_files() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.csv", &quiet_csv());
    write_file(&dir, "b.csv", &quiet_csv());
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args(["batch", "--pattern", &pattern, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.csv"))
        .stdout(predicate::str::contains("b.csv"));
}

#[test]
fn test_batch_no_matching_files() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args(["batch", "--pattern", &pattern])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No files match"));
}

#[test]
fn test_batch_writes_per_file_outputs() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.csv", &auto_trigger_csv());
    write_file(&dir, "b.csv", &quiet_csv());
    let out_dir = dir.path().join("out");
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args([
            "batch",
            "--pattern",
            &pattern,
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--quiet",
        ])
        .assert()
        .success();

    let a_result = std::fs::read_to_string(out_dir.join("a_pva.json")).unwrap();
    assert!(a_result.contains("\"auto_trigger\""));
    let b_result = std::fs::read_to_string(out_dir.join("b_pva.json")).unwrap();
    assert!(b_result.contains("\"event_count\": 0"));
}

#[test]
fn test_batch_streams_json_lines_without_output_dir() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "a.csv", &auto_trigger_csv());
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args(["batch", "--pattern", &pattern, "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"event_count\":1"))
        .stdout(predicate::str::starts_with("{\"id\""));
}

#[test]
fn test_batch_partial_failure() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "good.csv", &auto_trigger_csv());
    write_file(&dir, "bad.csv", "time,volume\n0.00,0.0\n");
    let out_dir = dir.path().join("out");
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args([
            "batch",
            "--pattern",
            &pattern,
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--quiet",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("bad.csv"));

    assert!(out_dir.join("good_pva.json").exists());
    assert!(!out_dir.join("bad_pva.json").exists());
}

#[test]
fn test_batch_all_failures() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "bad.csv", "time,volume\n0.00,0.0\n");
    let pattern = format!("{}/*.csv", dir.path().display());

    pvalab()
        .args(["batch", "--pattern", &pattern, "--quiet"])
        .assert()
        .code(2);
}
