use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tradebias::data::{file_sha256, load_trades};
use tradebias::mock::{generate_mock_trades, to_csv, MockProfile};
use tradebias::BiasEngine;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

#[test]
fn csv_with_broker_headers_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broker.csv");
    write_csv(
        &path,
        &["Timestamp (UTC)", "Side", "Symbol", "Realized PnL ($)"],
        &[
            "2024-02-01 09:31:00,Buy,ES,\"1,250.00\"",
            "2024-02-01 09:45:00,Sell,ES,-$300",
            "not a date,Buy,ES,10",
        ],
    );
    let loaded = load_trades(&path).unwrap();
    assert_eq!(loaded.records.len(), 3);
    assert_eq!(loaded.manifest.row_count, 3);
    let resolved = loaded.manifest.resolved.as_ref().unwrap();
    assert_eq!(resolved.pnl, "Realized PnL ($)");
    assert_eq!(resolved.action.as_deref(), Some("Side"));
    assert_eq!(resolved.asset.as_deref(), Some("Symbol"));

    let report = BiasEngine::new().analyze(&loaded.records);
    assert_eq!(report.statistics.total_trades, 2);
    assert_eq!(report.statistics.total_pnl, 950.0);
    assert_eq!(report.statistics.unique_assets, 1);
}

#[test]
fn csv_quoted_multiline_note_stays_one_trade() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.csv");
    write_csv(
        &path,
        &["Timestamp", "Asset", "P/L", "Notes"],
        &[
            "2024-02-01 09:31:00,ES,25,\"stopped out\nre-entered later\"",
            "2024-02-01 10:02:00,ES,-10,",
        ],
    );
    let loaded = load_trades(&path).unwrap();
    assert_eq!(loaded.records.len(), 2);
    let report = BiasEngine::new().analyze(&loaded.records);
    assert_eq!(report.statistics.total_trades, 2);
    assert_eq!(report.statistics.total_pnl, 15.0);
}

#[test]
fn csv_with_separate_date_and_time_columns_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("split.csv");
    write_csv(
        &path,
        &["Date", "Time", "Symbol", "P/L"],
        &["2024-02-01,09:31:00,ES,5", "2024-02-02,14:00:00,NQ,-2"],
    );
    let loaded = load_trades(&path).unwrap();
    let report = BiasEngine::new().analyze(&loaded.records);
    assert_eq!(report.statistics.total_trades, 2);
    assert_eq!(report.statistics.trading_days, 2);
}

#[test]
fn csv_without_pnl_column_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    write_csv(&path, &["Timestamp", "Asset"], &["2024-02-01,ES"]);
    let err = load_trades(&path).unwrap_err();
    assert!(err.to_string().contains("P/L"));
}

#[test]
fn json_list_and_wrapper_load() {
    let dir = TempDir::new().unwrap();
    let list = dir.path().join("list.json");
    fs::write(
        &list,
        r#"[{"timestamp": 1706780000, "pnl": 12.5}, {"timestamp": 1706780600000, "pnl": "-4"}]"#,
    )
    .unwrap();
    let loaded = load_trades(&list).unwrap();
    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.manifest.resolved.is_none());
    let report = BiasEngine::new().analyze(&loaded.records);
    assert_eq!(report.statistics.total_trades, 2);
    assert_eq!(report.statistics.trading_days, 1);

    let wrapped = dir.path().join("wrapped.JSON");
    fs::write(&wrapped, r#"{"trades": []}"#).unwrap();
    assert!(load_trades(&wrapped).unwrap().records.is_empty());

    let scalar = dir.path().join("scalar.json");
    fs::write(&scalar, "42").unwrap();
    assert!(load_trades(&scalar).is_err());
}

#[test]
fn manifest_hash_matches_file_and_changes_with_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mock.csv");
    fs::write(&path, to_csv(&generate_mock_trades(MockProfile::Revenge, 30, 5)).unwrap()).unwrap();
    let first = load_trades(&path).unwrap();
    assert_eq!(first.manifest.hash_sha256, file_sha256(&path).unwrap());
    assert_eq!(first.manifest.hash_sha256.len(), 64);

    fs::write(&path, to_csv(&generate_mock_trades(MockProfile::Revenge, 30, 6)).unwrap()).unwrap();
    let second = load_trades(&path).unwrap();
    assert_ne!(first.manifest.hash_sha256, second.manifest.hash_sha256);
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(load_trades(&dir.path().join("absent.csv")).is_err());
}
