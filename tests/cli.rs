// tests/cli.rs
// End-to-end runs of the command line over temporary log files

use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use rstest::rstest;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use spore_stats::cli::{self, Cli};
use spore_stats::AnalysisError;

fn write_log(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn write_gz_log(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();
    path
}

fn run<P: AsRef<Path>>(args: &[&str], files: &[P]) -> Result<String, AnalysisError> {
    let mut argv: Vec<String> = std::iter::once("spore_stats")
        .chain(args.iter().copied())
        .map(String::from)
        .collect();
    argv.extend(files.iter().map(|p| p.as_ref().display().to_string()));
    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    cli::run(&cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

const HEATMAP_LOG: &str = "1 10 m 2 3, 11 b 0 0, 12 y 2 3\n2 10 m 0 0, 13 w 1 4\n";

#[rstest]
#[case("heatmap")]
#[case("3")]
fn experiment_by_name_or_number(#[case] experiment: &str) {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "heat.log", HEATMAP_LOG);
    let text = run(&[experiment], &[&log]).unwrap();
    assert_eq!(text, "2 3 2\n0 0 2\n1 4 1\n");
}

#[test]
fn gzip_and_plain_inputs_are_concatenated() {
    let dir = TempDir::new().unwrap();
    let first = write_gz_log(&dir, "a.log.gz", "0: 0.5 1.2\n");
    let second = write_log(&dir, "b.log", "0: 1.7 2.9\n");
    let text = run(&["occupancy", "--header"], &[&first, &second]).unwrap();
    assert_eq!(text, "# class t0\n0 0.25\n1 0.5\n2 0.25\n");
}

#[test]
fn missing_file_is_reported_before_reading() {
    let dir = TempDir::new().unwrap();
    let present = write_log(&dir, "heat.log", HEATMAP_LOG);
    let absent = dir.path().join("absent.log");
    let err = run(&["heatmap"], &[&present, &absent]).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingFile(ref p) if *p == absent));
    assert!(err.to_string().starts_with("no file: "), "{err}");
}

#[test]
fn csv_has_a_header_and_summary_notes() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "heat.log", HEATMAP_LOG);
    let text = run(&["heatmap", "--format", "csv", "--summary"], &[&log]).unwrap();
    assert_eq!(
        text,
        "left,right,count\n2,3,2\n0,0,2\n1,4,1\n# hottest 2:3 with 2 of 5 particles\n"
    );
}

#[test]
fn json_rows_keep_column_order() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "heat.log", HEATMAP_LOG);
    let text = run(&["heatmap", "--format", "json"], &[&log]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let rows = parsed.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["left", "right", "count"]);
    assert_eq!(rows[2]["right"], serde_json::json!(4));
}

#[test]
fn headed_files_are_grouped_by_their_first_line() {
    let dir = TempDir::new().unwrap();
    let a = write_log(&dir, "a.log", "graphical\n1: 30.0\n2: 20.0\n");
    let b = write_log(&dir, "b.log", "headless\n1: 90.0\n");
    let c = write_log(&dir, "c.log", "graphical\n1: 50.0\n");
    let text = run(&["7", "base_time"], &[&a, &b, &c]).unwrap();
    assert_eq!(text, "graphical 1 40.0\ngraphical 2 20.0\nheadless 1 90.0\n");
}

#[test]
fn empty_headed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let empty = write_log(&dir, "empty.log", "");
    let err = run(&["perf", "grid"], &[&empty]).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingHeader(_)), "{err}");
}

#[test]
fn parse_errors_name_the_file_and_line() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "bad.log", "1 10 m 2 3\n\n2 10 m x 0\n");
    let err = run(&["heatmap"], &[&log]).unwrap_err();
    assert!(err.to_string().contains("bad.log:3:"), "{err}");
}

#[test]
fn malformed_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "heat.log", HEATMAP_LOG);
    let config = write_log(&dir, "bad.toml", "avg_cell_size = \"big\"\n");
    let config_arg = config.display().to_string();
    let err = run(&["heatmap", "--config", &config_arg], &[&log]).unwrap_err();
    assert!(matches!(err, AnalysisError::Config { .. }), "{err}");
}
