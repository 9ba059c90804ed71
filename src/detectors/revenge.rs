//! Revenge trading: rushing back in, bigger, right after a loss.
//!
//! Every trade after the first is bucketed by the outcome of the trade before
//! it. Breakeven predecessors count toward the after-win bucket.

use super::BiasDetector;
use crate::bias::{BiasKind, BiasResult, Metrics, Severity};
use crate::logging;
use crate::stats::{mean, pct};
use crate::trade::{Trade, TradeSet};

/// A trade within this many minutes after a loss is "rapid".
pub const RAPID_AFTER_LOSS_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct RevengeTradingDetector;

/// Follow-up trades grouped by what preceded them.
#[derive(Debug, Default)]
struct Buckets<'a> {
    after_loss: Vec<(&'a Trade, f64)>,
    after_win: Vec<(&'a Trade, f64)>,
}

impl<'a> Buckets<'a> {
    fn build(trades: &'a TradeSet) -> Self {
        let mut b = Buckets::default();
        for pair in trades.as_slice().windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let entry = (curr, curr.minutes_since(prev));
            if prev.is_loss() {
                b.after_loss.push(entry);
            } else {
                b.after_win.push(entry);
            }
        }
        b
    }
}

/// Mean of `f` over `bucket`, or `fallback` when the bucket is empty.
fn bucket_mean(bucket: &[(&Trade, f64)], fallback: f64, f: impl Fn(&(&Trade, f64)) -> f64) -> f64 {
    if bucket.is_empty() {
        fallback
    } else {
        mean(bucket.iter().map(f))
    }
}

impl BiasDetector for RevengeTradingDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::RevengeTrading
    }

    fn detect(&self, trades: &TradeSet) -> BiasResult {
        if trades.len() < 2 {
            return BiasResult::insufficient_data(self.kind());
        }
        let buckets = Buckets::build(trades);
        if buckets.after_loss.is_empty() {
            return BiasResult::not_detected("No consecutive loss patterns detected.");
        }
        let after_loss = &buckets.after_loss;

        let gap = |e: &(&Trade, f64)| e.1;
        let abs_pnl = |e: &(&Trade, f64)| e.0.pnl.abs();

        let avg_time_after_loss = mean(after_loss.iter().map(gap));
        let avg_time_after_win = bucket_mean(&buckets.after_win, avg_time_after_loss, gap);
        let rapid = after_loss
            .iter()
            .filter(|e| e.1 < RAPID_AFTER_LOSS_MINUTES)
            .count();
        let rapid_pct = pct(rapid, after_loss.len());
        let abs_pl_after_loss = mean(after_loss.iter().map(abs_pnl));
        let abs_pl_after_win = bucket_mean(&buckets.after_win, abs_pl_after_loss, abs_pnl);
        let wins_after_loss = after_loss.iter().filter(|e| e.0.is_win()).count();
        let win_rate_after_loss = pct(wins_after_loss, after_loss.len());

        let mut score = 0.0;
        if avg_time_after_loss < avg_time_after_win * 0.5 {
            score += 40.0;
        }
        if rapid_pct > 50.0 {
            score += 30.0;
        }
        // P/L magnitude stands in for position size
        if abs_pl_after_loss > abs_pl_after_win * 1.3 {
            score += 20.0;
        }
        if win_rate_after_loss < 40.0 {
            score += 20.0;
        }

        let mut metrics = Metrics::new();
        metrics
            .push("avg_minutes_after_loss", avg_time_after_loss, 1)
            .push("avg_minutes_after_win", avg_time_after_win, 1)
            .push("rapid_trade_after_loss_pct", rapid_pct, 1)
            .push("win_rate_after_loss", win_rate_after_loss, 1)
            .push("avg_abs_pl_after_loss", abs_pl_after_loss, 2)
            .push("avg_abs_pl_after_win", abs_pl_after_win, 2);

        let result = BiasResult::scored(score, metrics, |severity| {
            describe(severity, rapid_pct, win_rate_after_loss)
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

fn describe(severity: Severity, rapid_pct: f64, win_rate: f64) -> String {
    match severity {
        Severity::High => format!(
            "You're trading {:.1}% of the time within 30 minutes after losses, with only {:.1}% win rate \
             in those trades. This suggests emotional, revenge-driven trading.",
            rapid_pct, win_rate
        ),
        Severity::Moderate => format!(
            "You show some tendency to trade quickly after losses ({:.1}%). \
             Take breaks after losses to avoid emotional decisions.",
            rapid_pct
        ),
        Severity::Low => {
            "You're managing emotions well after losses. Continue this discipline.".to_string()
        }
    }
}
