//! Analyze many trade files in parallel.
//!
//! Prints one JSON line per input file, in argument order:
//!   {"path": ..., "report": {...}}   or   {"path": ..., "error": "..."}
//!
//! Run with: cargo run --bin bias_batch -- a.csv b.json ...

use anyhow::{bail, Result};
use tradebias::config::Config;
use tradebias::runner::run_batch;
use tradebias::BiasEngine;

fn main() -> Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: bias_batch <file>...");
    }

    let cfg = Config::from_env();
    let outcome = run_batch(BiasEngine::new(), paths, cfg.batch_threads)?;
    for line in &outcome.lines {
        println!("{}", line);
    }
    Ok(())
}
