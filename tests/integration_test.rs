use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DetectionRecord {
    text: String,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Outcome {
    records: Vec<DetectionRecord>,
    strategy: Option<String>,
    polygon_count: Option<usize>,
    diagnostics: Vec<serde_json::Value>,
    failure: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Transcript {
    accepted: Vec<DetectionRecord>,
    combined: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ExtractionResponse {
    source: String,
    engine: Option<String>,
    outcome: Outcome,
    transcript: Transcript,
    substantial: bool,
    artifact: Option<String>,
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        self.write(name, &value.to_string())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ocr-probe"))
        .args(["--log-level", "warn"])
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OCR_PROBE_FORMAT")
        .output()
        .expect("Failed to run ocr-probe")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("Non UTF-8 temp path")
}

fn normalize_json(input: &Path, extra: &[&str]) -> ExtractionResponse {
    let mut args = vec!["--format", "json", "normalize", "--input", arg(input)];
    args.extend_from_slice(extra);
    let output = run(&args);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    serde_json::from_slice(&output.stdout).expect("Failed to parse report")
}

#[test]
fn test_normalize_mapping_dump() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({
            "rec_texts": ["Carpal tunnel, palmar view", "X", "Median nerve"],
            "rec_scores": [0.96, 0.99, 0.91],
            "dt_polys": [[], [], []],
        }),
    );

    let output = run(&["normalize", "--input", arg(&input)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Strategy: mapping (3 records)"), "{}", text);
    assert!(text.contains("Polygons: 3"));
    assert!(text.contains("Extracted 2 valid texts"));
    assert!(text.contains("Sample: Carpal tunnel, palmar view Median nerve"));
}

#[test]
fn test_normalize_length_mismatch_truncates() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({
            "rec_texts": ["Pisiform", "Ulna", "Radius"],
            "rec_scores": [0.8, 0.7],
        }),
    );

    let report = normalize_json(&input, &[]);

    assert_eq!(report.outcome.records.len(), 2);
    assert_eq!(report.outcome.strategy.as_deref(), Some("mapping"));
    assert!(report
        .outcome
        .diagnostics
        .iter()
        .any(|d| d["kind"] == "length_mismatch"));
}

#[test]
fn test_normalize_attribute_dump() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({
            "res": {
                "rec_texts": ["Transverse carpal", "ligament"],
                "rec_scores": [0.9, 0.8],
            }
        }),
    );

    let report = normalize_json(&input, &[]);

    assert_eq!(report.outcome.strategy.as_deref(), Some("attributes"));
    assert_eq!(report.transcript.combined, "Transverse carpal ligament");
}

#[test]
fn test_normalize_selects_page_of_detection_list() {
    let ws = Workspace::new();
    let bbox = json!([[0, 0], [120, 0], [120, 20], [0, 20]]);
    let input = ws.write_json(
        "result.json",
        &json!([[
            [bbox, ["Explanation", 0.98]],
            [bbox, [["Trapezium", 0.87]]],
            [bbox, "broken"],
        ]]),
    );

    let report = normalize_json(&input, &["--page", "0"]);

    assert_eq!(
        report.outcome.strategy.as_deref(),
        Some("pairwise_iteration")
    );
    let texts: Vec<&str> = report
        .outcome
        .records
        .iter()
        .map(|r| r.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Explanation", "Trapezium"]);
    assert!(report
        .outcome
        .diagnostics
        .iter()
        .any(|d| d["kind"] == "entry_skipped" && d["index"] == 2));
}

#[test]
fn test_normalize_page_out_of_range_fails() {
    let ws = Workspace::new();
    let input = ws.write_json("result.json", &json!([[]]));

    let output = run(&["normalize", "--input", arg(&input), "--page", "3"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("out of range"), "{}", stderr(&output));
}

#[test]
fn test_normalize_unrecognized_is_reported_not_fatal() {
    let ws = Workspace::new();
    let input = ws.write_json("result.json", &json!({ "boxes": [1, 2], "version": 3 }));

    let output = run(&["normalize", "--input", arg(&input)]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("No usable text recovered"), "{}", text);
    assert!(text.contains("keys: boxes, version"));

    let report = normalize_json(&input, &[]);
    assert!(report.outcome.records.is_empty());
    assert!(report.outcome.strategy.is_none());
    assert!(report.outcome.failure.is_some());
}

#[test]
fn test_normalize_writes_substantial_transcript() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({
            "rec_texts": [
                "Carpal tunnel syndrome (CTS) is a peripheral mononeuropathy",
                "caused by median nerve compression at the transverse carpal",
            ],
            "rec_scores": [0.95, 0.93],
        }),
    );
    let output_path = ws.path("extracted_sample.txt");

    let report = normalize_json(&input, &["--output", arg(&output_path)]);

    assert!(report.substantial);
    assert!(report.artifact.is_some());
    assert_eq!(
        fs::read_to_string(&output_path).expect("Transcript not written"),
        report.transcript.combined
    );
}

#[test]
fn test_normalize_skips_limited_transcript() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({ "rec_texts": ["Ulna"], "rec_scores": [0.9] }),
    );
    let output_path = ws.path("extracted_sample.txt");

    let report = normalize_json(&input, &["--output", arg(&output_path)]);

    assert!(!report.substantial);
    assert!(report.artifact.is_none());
    assert!(!output_path.exists());
}

#[test]
fn test_normalize_custom_hints_and_policy() {
    let ws = Workspace::new();
    let input = ws.write_json(
        "result.json",
        &json!({ "texts": ["Subject", "Topic"], "scores": [0.45, 0.6] }),
    );

    let report = normalize_json(
        &input,
        &[
            "--text-field",
            "texts",
            "--score-field",
            "scores",
            "--min-confidence",
            "0.5",
        ],
    );

    assert_eq!(report.outcome.records.len(), 2);
    assert_eq!(report.transcript.combined, "Topic");
}

#[test]
fn test_normalize_missing_input_fails() {
    let ws = Workspace::new();
    let output = run(&["normalize", "--input", arg(&ws.path("absent.json"))]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("absent.json"), "{}", stderr(&output));
}

#[test]
fn test_probe_describes_dump() {
    let ws = Workspace::new();
    let bbox = json!([[0, 0], [1, 1]]);
    let input = ws.write_json(
        "result.json",
        &json!([
            [bbox, ["a", 0.5]],
            [bbox, ["b", 0.5]],
            [bbox, ["c", 0.5]],
            [bbox, ["d", 0.5]],
        ]),
    );

    let output = run(&["probe", "--input", arg(&input), "--preview", "2"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Type: array"), "{}", text);
    assert!(text.contains("Length: 4"));
    assert!(text.contains("[1] (array, 2)"));
    assert!(!text.contains("[2]"));
}

#[test]
fn test_search_reports_matches_and_window() {
    let ws = Workspace::new();
    let blocks = ws.write_json(
        "blocks.json",
        &json!([
            "Symptoms and signs of CTS often occur bilaterally (in up to",
            "motor weakness during thumb abduction/opposition and thenar",
            "predominantly affects young boys and presents with proximal",
            "Educational objective:",
            "caused by median nerve compression at the transverse carpal",
            "References",
        ]),
    );
    let keywords = ws.write("keywords.txt", "thumb abduction\n\nopposition\n");

    let output = run(&[
        "search",
        "--blocks",
        arg(&blocks),
        "--keywords-file",
        arg(&keywords),
        "--keyword",
        "Median Nerve",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Total matches found: 3"), "{}", text);
    assert!(text.contains("--> Contains: 'Median Nerve'"));
    assert!(text.contains("Anchor at block 3"));
    assert!(text.contains(" -->      Block  3: 'Educational objective:'"));
    assert!(text.contains("      *** Block  4:"));
}

#[test]
fn test_search_json_anchor_not_found() {
    let ws = Workspace::new();
    let blocks = ws.write("blocks.txt", "Nervous System\nPathology\nMedian nerve injury\n");

    let output = run(&[
        "--format",
        "json",
        "search",
        "--blocks",
        arg(&blocks),
        "--keyword",
        "median nerve",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Failed to parse report");
    assert_eq!(report["matches"]["total"], 1);
    assert_eq!(report["matches"]["matches"][0]["block_index"], 2);
    assert_eq!(report["window"]["status"], "not_found");
}

#[test]
fn test_extract_missing_image_fails_before_engine_setup() {
    let ws = Workspace::new();

    let output = run(&["extract", "--image", arg(&ws.path("test_image.png"))]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Failed to load image"), "{}", err);
    assert!(!ws.path("extracted_sample.txt").exists());
}
