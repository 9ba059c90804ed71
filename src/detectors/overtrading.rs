//! Overtrading: too many trades per day, too close together.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::BiasDetector;
use crate::bias::{BiasKind, BiasResult, Metrics, Severity};
use crate::logging;
use crate::stats::{mean, pct};
use crate::trade::TradeSet;

pub const AVG_TRADES_PER_DAY_THRESHOLD: f64 = 10.0;
pub const MAX_TRADES_PER_DAY_THRESHOLD: f64 = 20.0;
pub const RAPID_TRADE_PCT_THRESHOLD: f64 = 30.0;
/// A trade within this many minutes of the previous one is "rapid".
pub const RAPID_TRADE_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct OvertradingDetector;

impl BiasDetector for OvertradingDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::Overtrading
    }

    fn detect(&self, trades: &TradeSet) -> BiasResult {
        if trades.len() < 2 {
            return BiasResult::insufficient_data(self.kind());
        }

        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for t in trades {
            *per_day.entry(t.date()).or_default() += 1;
        }
        let avg_per_day = mean(per_day.values().map(|&c| c as f64));
        let max_per_day = per_day.values().copied().max().unwrap_or(0) as f64;

        let gaps: Vec<f64> = trades.gaps_minutes().collect();
        // duplicate timestamps still count as rapid but not toward the average gap
        let avg_gap = mean(gaps.iter().copied().filter(|g| *g > 0.0));
        let rapid = gaps.iter().filter(|g| **g < RAPID_TRADE_MINUTES).count();
        let rapid_pct = pct(rapid, trades.len());
        let win_rate = pct(trades.win_count(), trades.len());

        let mut score = 0.0;
        if avg_per_day > AVG_TRADES_PER_DAY_THRESHOLD {
            score += (avg_per_day / AVG_TRADES_PER_DAY_THRESHOLD * 20.0).min(40.0);
        }
        if max_per_day > MAX_TRADES_PER_DAY_THRESHOLD {
            score += (max_per_day / MAX_TRADES_PER_DAY_THRESHOLD * 15.0).min(30.0);
        }
        if rapid_pct > RAPID_TRADE_PCT_THRESHOLD {
            score += (rapid_pct / RAPID_TRADE_PCT_THRESHOLD * 15.0).min(30.0);
        }

        let mut metrics = Metrics::new();
        metrics
            .push("avg_trades_per_day", avg_per_day, 2)
            .push("max_trades_per_day", max_per_day, 0)
            .push("rapid_trade_percentage", rapid_pct, 1)
            .push("avg_minutes_between_trades", avg_gap, 1)
            .push("win_rate", win_rate, 1);

        let result = BiasResult::scored(score, metrics, |severity| {
            describe(severity, avg_per_day, rapid_pct)
        });
        logging::log_detection(
            self.kind().key(),
            result.detected,
            result.severity.as_str(),
            result.score,
        );
        result
    }
}

fn describe(severity: Severity, avg_per_day: f64, rapid_pct: f64) -> String {
    match severity {
        Severity::High => format!(
            "You're averaging {:.1} trades per day with {:.1}% occurring within 5 minutes of each other. \
             This suggests impulsive, strategy-less trading that increases transaction costs and emotional stress.",
            avg_per_day, rapid_pct
        ),
        Severity::Moderate => format!(
            "Your trading frequency ({:.1} trades/day) is elevated. \
             Consider whether each trade aligns with your strategy before executing.",
            avg_per_day
        ),
        Severity::Low => {
            "Your trading frequency appears reasonable, but monitor for impulsive trades.".to_string()
        }
    }
}
