//! Running analyses over inputs named on the command line: one file or mock
//! history for `tradebias`, many files in parallel for `bias_batch`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use crate::analysis::{AnalysisReport, BiasEngine};
use crate::config::Config;
use crate::data::{fingerprint, load_trades, InputManifest};
use crate::logging::{self, log, obj, v_num, v_str, Domain, Level};
use crate::mock::{generate_mock_trades, MockProfile};

pub const USAGE: &str = "usage: tradebias <trades.csv|trades.json> \
                         | tradebias --mock [disciplined|overtrader|loss_averse|revenge|mixed]";

/// What a single `tradebias` run analyzes.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    File(PathBuf),
    Mock {
        profile: MockProfile,
        trades: usize,
        seed: u64,
    },
}

impl Input {
    /// Interpret CLI arguments (program name excluded). Mock size and seed
    /// come from `cfg`.
    pub fn from_args(args: &[String], cfg: &Config) -> Result<Self> {
        match args.first().map(String::as_str) {
            Some("--mock") => {
                let profile = match args.get(1) {
                    Some(name) => MockProfile::parse(name)
                        .ok_or_else(|| anyhow!("unknown mock profile {:?}\n{}", name, USAGE))?,
                    None => cfg.mock_profile,
                };
                Ok(Input::Mock {
                    profile,
                    trades: cfg.mock_trades,
                    seed: cfg.seed_or_now(),
                })
            }
            Some("-h") | Some("--help") | None => bail!(USAGE),
            Some(path) => Ok(Input::File(PathBuf::from(path))),
        }
    }
}

/// A report together with the manifest of the file it was built from.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub report: AnalysisReport,
    pub manifest: InputManifest,
}

/// Load and analyze one file, recording the input and output hashes.
pub fn analyze_path(engine: BiasEngine, path: &Path) -> Result<FileAnalysis> {
    let loaded = load_trades(path)?;
    log(
        Level::Info,
        Domain::Ingest,
        "input_loaded",
        obj(&[
            ("path", v_str(&loaded.manifest.path)),
            ("rows", v_num(loaded.manifest.row_count as f64)),
            ("sha256", v_str(&loaded.manifest.hash_sha256)),
        ]),
    );
    let report = engine.analyze(&loaded.records);
    logging::log_audit(
        "analysis",
        &loaded.manifest.path,
        &loaded.manifest.hash_sha256,
        &fingerprint(&report)?,
    );
    Ok(FileAnalysis {
        report,
        manifest: loaded.manifest,
    })
}

pub fn analyze_input(engine: BiasEngine, input: &Input) -> Result<AnalysisReport> {
    match input {
        Input::File(path) => analyze_path(engine, path).map(|fa| fa.report),
        Input::Mock {
            profile,
            trades,
            seed,
        } => {
            let records = generate_mock_trades(*profile, *trades, *seed);
            let report = engine.analyze(&records);
            logging::log_audit(
                "analysis",
                &format!("mock:{}:{}", profile.as_str(), seed),
                &fingerprint(&records)?,
                &fingerprint(&report)?,
            );
            Ok(report)
        }
    }
}

/// `{"path", "report"}` on success, `{"path", "error"}` otherwise.
pub fn batch_line(engine: BiasEngine, path: &str) -> Value {
    let analyzed = analyze_path(engine, Path::new(path))
        .and_then(|fa| Ok(serde_json::to_value(&fa.report)?));
    match analyzed {
        Ok(report) => json!({ "path": path, "report": report }),
        Err(err) => json!({ "path": path, "error": format!("{:#}", err) }),
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One line per input path, in input order.
    pub lines: Vec<Value>,
    pub failed: u64,
}

/// Analyze `paths` on up to `threads` workers. A failing file becomes an
/// error line; it never aborts the batch.
pub fn run_batch(engine: BiasEngine, paths: Vec<String>, threads: usize) -> Result<BatchOutcome> {
    let n_threads = threads.clamp(1, paths.len().max(1));
    let n_paths = paths.len();
    let paths = Arc::new(paths);
    let next = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicU64::new(0));
    let results: Arc<Mutex<Vec<Option<Value>>>> = Arc::new(Mutex::new(vec![None; n_paths]));

    let start = Instant::now();
    let mut handles = vec![];
    for _ in 0..n_threads {
        let paths = Arc::clone(&paths);
        let next = Arc::clone(&next);
        let failures = Arc::clone(&failures);
        let results = Arc::clone(&results);

        handles.push(thread::spawn(move || loop {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let Some(path) = paths.get(i) else { break };
            let line = batch_line(engine, path);
            if line.get("error").is_some() {
                failures.fetch_add(1, Ordering::Relaxed);
            }
            if let Ok(mut slots) = results.lock() {
                slots[i] = Some(line);
            }
        }));
    }
    for h in handles {
        if h.join().is_err() {
            bail!("batch worker panicked");
        }
    }

    let lines: Vec<Value> = match results.lock() {
        Ok(mut slots) => std::mem::take(&mut *slots).into_iter().flatten().collect(),
        Err(_) => bail!("batch results poisoned"),
    };
    let failed = failures.load(Ordering::Relaxed);
    log(
        Level::Info,
        Domain::System,
        "batch_complete",
        obj(&[
            ("files", v_num(n_paths as f64)),
            ("failed", v_num(failed as f64)),
            ("threads", v_num(n_threads as f64)),
            ("elapsed_ms", v_num(start.elapsed().as_secs_f64() * 1000.0)),
        ]),
    );
    Ok(BatchOutcome { lines, failed })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_args_file_and_mock() {
        let cfg = Config {
            mock_seed: Some(11),
            mock_trades: 40,
            ..Config::default()
        };
        assert_eq!(
            Input::from_args(&args(&["trades.csv"]), &cfg).unwrap(),
            Input::File(PathBuf::from("trades.csv"))
        );
        assert_eq!(
            Input::from_args(&args(&["--mock", "revenge"]), &cfg).unwrap(),
            Input::Mock {
                profile: MockProfile::Revenge,
                trades: 40,
                seed: 11
            }
        );
        let Input::Mock { profile, .. } = Input::from_args(&args(&["--mock"]), &cfg).unwrap()
        else {
            panic!("expected mock input");
        };
        assert_eq!(profile, cfg.mock_profile);
    }

    #[test]
    fn test_from_args_usage_errors() {
        let cfg = Config::default();
        let err = Input::from_args(&[], &cfg).unwrap_err();
        assert!(err.to_string().starts_with("usage:"));
        assert!(Input::from_args(&args(&["--help"]), &cfg).is_err());
        let err = Input::from_args(&args(&["--mock", "yolo"]), &cfg).unwrap_err();
        assert!(err.to_string().contains("unknown mock profile"));
    }

    #[test]
    fn test_mock_input_is_seeded() {
        let input = Input::Mock {
            profile: MockProfile::Overtrader,
            trades: 60,
            seed: 3,
        };
        let engine = BiasEngine::new();
        let a = analyze_input(engine, &input).unwrap();
        let b = analyze_input(engine, &input).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.statistics.total_trades, 60);
        assert!(a.overtrading.detected);
    }

    #[test]
    fn test_empty_batch() {
        let out = run_batch(BiasEngine::new(), Vec::new(), 4).unwrap();
        assert!(out.lines.is_empty());
        assert_eq!(out.failed, 0);
    }
}
