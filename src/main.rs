//! Analyze one trade history and print the bias report as JSON.
//!
//! Usage:
//!   tradebias <trades.csv|trades.json>
//!   tradebias --mock [profile]

use anyhow::Result;
use tradebias::config::Config;
use tradebias::runner::{analyze_input, Input};
use tradebias::BiasEngine;

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = Input::from_args(&args, &cfg)?;

    let report = analyze_input(BiasEngine::new(), &input)?;
    let output = if cfg.pretty_json {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    println!("{}", output);
    Ok(())
}
