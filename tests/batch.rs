use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tradebias::mock::{generate_mock_trades, to_csv, MockProfile};
use tradebias::runner::{analyze_input, analyze_path, batch_line, run_batch, Input};
use tradebias::BiasEngine;

fn fixture_dir() -> (TempDir, Vec<String>) {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("overtrader.csv");
    let csv = to_csv(&generate_mock_trades(MockProfile::Overtrader, 80, 2)).unwrap();
    fs::write(&good, csv).unwrap();
    let scalar = dir.path().join("scalar.json");
    fs::write(&scalar, "42").unwrap();
    let list = dir.path().join("list.json");
    fs::write(
        &list,
        r#"[{"Timestamp": "2024-02-01 09:30:00", "P/L": 5}, {"Timestamp": "2024-02-01 11:00:00", "P/L": -2}]"#,
    )
    .unwrap();
    let missing = dir.path().join("missing.csv");

    let paths = [good, missing, scalar, list]
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    (dir, paths)
}

#[test]
fn batch_keeps_argument_order_and_reports_failures_inline() {
    let (_dir, paths) = fixture_dir();
    for threads in [1, 3, 16] {
        let out = run_batch(BiasEngine::new(), paths.clone(), threads).unwrap();
        assert_eq!(out.lines.len(), 4);
        assert_eq!(out.failed, 2, "threads {}", threads);

        for (line, path) in out.lines.iter().zip(&paths) {
            assert_eq!(line["path"], path.as_str());
        }
        assert_eq!(out.lines[0]["report"]["statistics"]["total_trades"], 80);
        assert_eq!(out.lines[0]["report"]["overtrading"]["detected"], true);

        let missing = out.lines[1]["error"].as_str().unwrap();
        assert!(missing.contains("failed to read"), "{}", missing);
        assert!(out.lines[1].get("report").is_none());

        let scalar = out.lines[2]["error"].as_str().unwrap();
        assert!(scalar.contains("expected a list"), "{}", scalar);

        assert_eq!(out.lines[3]["report"]["statistics"]["total_trades"], 2);
    }
}

#[test]
fn batch_line_matches_single_file_analysis() {
    let (_dir, paths) = fixture_dir();
    let engine = BiasEngine::new();
    let single = analyze_path(engine, Path::new(&paths[0])).unwrap();
    assert_eq!(single.manifest.row_count, 80);
    assert_eq!(single.manifest.hash_sha256.len(), 64);

    let line = batch_line(engine, &paths[0]);
    assert_eq!(line["report"], serde_json::to_value(&single.report).unwrap());
}

#[test]
fn cli_file_input_analyzes_the_file() {
    let (_dir, paths) = fixture_dir();
    let cfg = tradebias::config::Config::default();
    let engine = BiasEngine::new();

    let input = Input::from_args(&[paths[3].clone()], &cfg).unwrap();
    let report = analyze_input(engine, &input).unwrap();
    assert_eq!(report.statistics.total_trades, 2);
    assert_eq!(report.statistics.total_pnl, 3.0);

    let input = Input::from_args(&[paths[1].clone()], &cfg).unwrap();
    assert!(analyze_input(engine, &input).is_err());
}
