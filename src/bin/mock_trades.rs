//! Write a mock trade history as CSV to stdout.
//!
//! Run with: cargo run --bin mock_trades -- [profile] [n] [seed]
//! Missing arguments fall back to MOCK_PROFILE, MOCK_TRADES and MOCK_SEED.

use anyhow::{anyhow, Result};
use std::io::Write;
use tradebias::config::Config;
use tradebias::mock::{generate_mock_trades, to_csv, MockProfile};

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let mut args = std::env::args().skip(1);

    let profile = match args.next() {
        Some(name) => {
            MockProfile::parse(&name).ok_or_else(|| anyhow!("unknown profile {:?}", name))?
        }
        None => cfg.mock_profile,
    };
    let n = match args.next() {
        Some(v) => v.parse::<usize>().map_err(|e| anyhow!("bad trade count {:?}: {}", v, e))?,
        None => cfg.mock_trades,
    };
    let seed = match args.next() {
        Some(v) => v.parse::<u64>().map_err(|e| anyhow!("bad seed {:?}: {}", v, e))?,
        None => cfg.seed_or_now(),
    };

    let records = generate_mock_trades(profile, n, seed);
    let mut out = std::io::stdout().lock();
    out.write_all(to_csv(&records)?.as_bytes())?;
    Ok(())
}
