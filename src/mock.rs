//! Deterministic mock trade histories for demos and tests.
//!
//! Each profile is shaped so that its namesake bias is triggered regardless of
//! the random draws; randomness only varies sizes, assets and small timing
//! jitter.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::trade::RawTradeRecord;

const ASSETS: [&str; 6] = ["AAPL", "TSLA", "NVDA", "BTC-USD", "ETH-USD", "EUR/USD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockProfile {
    /// A few well-spaced trades a day with asymmetric winners.
    Disciplined,
    /// Dozens of trades a day, minutes apart.
    Overtrader,
    /// Frequent small wins, rare large losses.
    LossAverse,
    /// Losses followed within minutes by larger losing re-entries.
    Revenge,
    /// Cycles through the other profiles day by day.
    Mixed,
}

impl MockProfile {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "disciplined" => Some(MockProfile::Disciplined),
            "overtrader" | "overtrading" => Some(MockProfile::Overtrader),
            "loss_averse" | "loss_aversion" => Some(MockProfile::LossAverse),
            "revenge" | "revenge_trading" => Some(MockProfile::Revenge),
            "mixed" => Some(MockProfile::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MockProfile::Disciplined => "disciplined",
            MockProfile::Overtrader => "overtrader",
            MockProfile::LossAverse => "loss_averse",
            MockProfile::Revenge => "revenge",
            MockProfile::Mixed => "mixed",
        }
    }
}

fn start_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 14, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

struct Generator {
    rng: StdRng,
    ts: DateTime<Utc>,
    out: Vec<RawTradeRecord>,
}

impl Generator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ts: start_ts(),
            out: Vec::new(),
        }
    }

    /// Move the clock forward by a random number of minutes in `range`.
    fn advance(&mut self, range: std::ops::RangeInclusive<i64>) {
        let minutes = self.rng.gen_range(range);
        self.ts += Duration::minutes(minutes);
    }

    fn next_day(&mut self) {
        let day = self.ts.date_naive() + Duration::days(1);
        if let Some(open) = day.and_hms_opt(14, 30, 0) {
            self.ts = Utc.from_utc_datetime(&open);
        }
    }

    fn push(&mut self, pnl: f64) {
        let side = if self.rng.gen_bool(0.5) { "Buy" } else { "Sell" };
        let asset = ASSETS[self.rng.gen_range(0..ASSETS.len())];
        let mut map = Map::new();
        map.insert(
            "Timestamp".to_string(),
            json!(self.ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        );
        map.insert("Buy/sell".to_string(), json!(side));
        map.insert("Asset".to_string(), json!(asset));
        map.insert("P/L".to_string(), Value::from((pnl * 100.0).round() / 100.0));
        self.out.push(RawTradeRecord::from_map(map));
    }

    fn disciplined_day(&mut self, budget: usize) -> usize {
        // win/loss pairs, so the day closes on a loss and the overnight pause
        // lands in the after-loss bucket
        let pairs = if self.rng.gen_bool(0.5) { 1 } else { 2 };
        let n = budget.min(pairs * 2);
        for i in 0..n {
            let pnl = if i % 2 == 0 {
                self.rng.gen_range(40.0..80.0)
            } else {
                -self.rng.gen_range(10.0..20.0)
            };
            self.push(pnl);
            self.advance(90..=150);
        }
        n
    }

    fn overtrader_day(&mut self, budget: usize) -> usize {
        let n = budget.min(self.rng.gen_range(30..=40));
        for _ in 0..n {
            let pnl = self.rng.gen_range(-25.0..25.0);
            self.push(pnl);
            self.advance(1..=4);
        }
        n
    }

    fn loss_averse_day(&mut self, budget: usize) -> usize {
        let n = budget.min(self.rng.gen_range(4..=6));
        for i in 0..n {
            let pnl = if i == n - 1 {
                -self.rng.gen_range(60.0..90.0)
            } else {
                self.rng.gen_range(5.0..12.0)
            };
            self.push(pnl);
            self.advance(60..=100);
        }
        n
    }

    fn revenge_day(&mut self, budget: usize) -> usize {
        let n = budget.min(6);
        for i in 0..n {
            match i {
                // calm win, then a loss chased by three rushed, larger losers
                0 => {
                    let pnl = self.rng.gen_range(10.0..20.0);
                    self.push(pnl);
                    self.advance(120..=180);
                }
                5 => {
                    let pnl = self.rng.gen_range(10.0..20.0);
                    self.push(pnl);
                    self.advance(120..=180);
                }
                _ => {
                    let pnl = -self.rng.gen_range(20.0..60.0) * i as f64;
                    self.push(pnl);
                    self.advance(1..=10);
                }
            }
        }
        n
    }
}

/// Generate `n` raw records for `profile`, deterministic for a given `seed`.
pub fn generate_mock_trades(profile: MockProfile, n: usize, seed: u64) -> Vec<RawTradeRecord> {
    let mut g = Generator::new(seed);
    let mut remaining = n;
    let mut day = 0usize;
    while remaining > 0 {
        let today = match profile {
            MockProfile::Mixed => match day % 4 {
                0 => MockProfile::Disciplined,
                1 => MockProfile::Overtrader,
                2 => MockProfile::LossAverse,
                _ => MockProfile::Revenge,
            },
            p => p,
        };
        let used = match today {
            MockProfile::Overtrader => g.overtrader_day(remaining),
            MockProfile::LossAverse => g.loss_averse_day(remaining),
            MockProfile::Revenge => g.revenge_day(remaining),
            _ => g.disciplined_day(remaining),
        };
        remaining -= used;
        day += 1;
        g.next_day();
    }
    g.out
}

/// Render records as CSV with the canonical `Timestamp,Buy/sell,Asset,P/L` header.
pub fn to_csv(records: &[RawTradeRecord]) -> Result<String> {
    const COLUMNS: [&str; 4] = ["Timestamp", "Buy/sell", "Asset", "P/L"];
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for r in records {
        writer.write_record(COLUMNS.map(|c| match r.as_map().get(c) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }))?;
    }
    let bytes = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}
