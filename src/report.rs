//! Summary, statistics and recommendations derived from detector results.
//!
//! Generators take already-computed [`BiasResult`]s by reference; detectors
//! are never re-run here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bias::{BiasKind, BiasResult, Severity};
use crate::stats::{pct, round_dp};
use crate::trade::TradeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    fn for_severity(severity: Severity) -> Self {
        if severity == Severity::High {
            Priority::High
        } else {
            Priority::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub bias: String,
    pub recommendation: String,
    pub priority: Priority,
}

impl Recommendation {
    fn new(bias: &str, text: impl Into<String>, priority: Priority) -> Self {
        Self {
            bias: bias.to_string(),
            recommendation: text.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub biases_detected: Vec<String>,
    pub bias_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub win_rate: f64,
    pub trading_days: usize,
    pub unique_assets: usize,
}

/// Detector results in report order.
pub type BiasResults<'a> = [(BiasKind, &'a BiasResult); 3];

fn total_pnl(trades: &TradeSet) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

pub fn summarize(trades: &TradeSet, results: &BiasResults<'_>) -> Summary {
    let biases_detected: Vec<String> = results
        .iter()
        .filter(|(_, r)| r.detected)
        .map(|(kind, _)| kind.display_name().to_string())
        .collect();
    Summary {
        total_trades: trades.len(),
        total_pnl: round_dp(total_pnl(trades), 2),
        win_rate: round_dp(pct(trades.win_count(), trades.len()), 1),
        bias_count: biases_detected.len(),
        biases_detected,
    }
}

pub fn statistics(trades: &TradeSet) -> Statistics {
    let total = total_pnl(trades);
    let avg = if trades.is_empty() { 0.0 } else { total / trades.len() as f64 };
    let largest_win = trades.iter().map(|t| t.pnl).reduce(f64::max).unwrap_or(0.0);
    let largest_loss = trades.iter().map(|t| t.pnl).reduce(f64::min).unwrap_or(0.0);
    let days: HashSet<_> = trades.iter().map(|t| t.date()).collect();
    let assets: HashSet<&str> = trades.iter().map(|t| t.asset.as_str()).collect();

    Statistics {
        total_trades: trades.len(),
        winning_trades: trades.win_count(),
        losing_trades: trades.loss_count(),
        total_pnl: round_dp(total, 2),
        avg_pnl: round_dp(avg, 2),
        largest_win: round_dp(largest_win, 2),
        largest_loss: round_dp(largest_loss, 2),
        win_rate: round_dp(pct(trades.win_count(), trades.len()), 1),
        trading_days: days.len(),
        unique_assets: assets.len(),
    }
}

fn recommend_for(kind: BiasKind, result: &BiasResult) -> [Recommendation; 2] {
    let name = kind.display_name();
    let lead = Priority::for_severity(result.severity);
    match kind {
        BiasKind::Overtrading => {
            let avg = result.metrics.get("avg_trades_per_day").unwrap_or(0.0);
            let limit = ((avg * 0.5).floor() as i64).max(5);
            [
                Recommendation::new(
                    name,
                    format!("Set a daily trade limit of {} trades per day", limit),
                    lead,
                ),
                Recommendation::new(
                    name,
                    "Implement a mandatory 30-minute cooldown period between trades",
                    Priority::Medium,
                ),
            ]
        }
        BiasKind::LossAversion => {
            let ratio = result.metrics.get("risk_reward_ratio").unwrap_or(0.0);
            let take_profit = ((ratio * 2.0).floor() as i64).max(3);
            [
                Recommendation::new(
                    name,
                    format!(
                        "Set stop-loss orders at 2% and take-profit at {}% to improve risk-reward ratio",
                        take_profit
                    ),
                    lead,
                ),
                Recommendation::new(
                    name,
                    "Use trailing stop-losses to let winners run while protecting gains",
                    Priority::Medium,
                ),
            ]
        }
        BiasKind::RevengeTrading => [
            Recommendation::new(
                name,
                "Implement a mandatory 2-hour break after any losing trade",
                lead,
            ),
            Recommendation::new(
                name,
                "Reduce position size by 50% for the next 3 trades after a loss",
                Priority::Medium,
            ),
        ],
    }
}

pub fn recommendations(results: &BiasResults<'_>) -> Vec<Recommendation> {
    let mut recs: Vec<Recommendation> = results
        .iter()
        .filter(|(_, r)| r.detected)
        .flat_map(|(kind, r)| recommend_for(*kind, r))
        .collect();
    if recs.is_empty() {
        recs.push(Recommendation::new(
            "General",
            "Maintain a trading journal to track emotions and decisions",
            Priority::Low,
        ));
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::Metrics;
    use crate::detectors::fixtures::trades_at;

    fn detected(severity: Severity, metrics: Metrics) -> BiasResult {
        let score = match severity {
            Severity::Low => 26.0,
            Severity::Moderate => 45.0,
            Severity::High => 80.0,
        };
        BiasResult::scored(score, metrics, |_| String::new())
    }

    fn quiet() -> BiasResult {
        BiasResult::not_detected("quiet")
    }

    #[test]
    fn test_statistics_empty_is_zeroed() {
        let s = statistics(&TradeSet::default());
        assert_eq!(s.total_trades, 0);
        assert_eq!(s.avg_pnl, 0.0);
        assert_eq!(s.largest_win, 0.0);
        assert_eq!(s.largest_loss, 0.0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.trading_days, 0);
    }

    #[test]
    fn test_statistics_counts() {
        // 2024-05-06 09:00 + offsets; 1500 min crosses into the next day
        let trades = trades_at(&[(0, 12.3456), (30, -4.0), (60, 0.0), (1500, 7.0)]);
        let s = statistics(&trades);
        assert_eq!(s.total_trades, 4);
        assert_eq!(s.winning_trades, 2);
        assert_eq!(s.losing_trades, 1);
        assert_eq!(s.total_pnl, 15.35);
        assert_eq!(s.avg_pnl, 3.84);
        assert_eq!(s.largest_win, 12.35);
        assert_eq!(s.largest_loss, -4.0);
        assert_eq!(s.win_rate, 50.0);
        assert_eq!(s.trading_days, 2);
        assert_eq!(s.unique_assets, 1);
    }

    #[test]
    fn test_summary_lists_detected_in_fixed_order() {
        let trades = trades_at(&[(0, 1.0), (5, -1.0), (10, 2.0)]);
        let over = detected(Severity::High, Metrics::new());
        let loss = quiet();
        let revenge = detected(Severity::Moderate, Metrics::new());
        let results = [
            (BiasKind::Overtrading, &over),
            (BiasKind::LossAversion, &loss),
            (BiasKind::RevengeTrading, &revenge),
        ];
        let s = summarize(&trades, &results);
        assert_eq!(s.biases_detected, vec!["Overtrading", "Revenge Trading"]);
        assert_eq!(s.bias_count, 2);
        assert_eq!(s.win_rate, 66.7);
        assert_eq!(s.total_pnl, 2.0);
    }

    #[test]
    fn test_recommendations_fallback() {
        let (a, b, c) = (quiet(), quiet(), quiet());
        let recs = recommendations(&[
            (BiasKind::Overtrading, &a),
            (BiasKind::LossAversion, &b),
            (BiasKind::RevengeTrading, &c),
        ]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].bias, "General");
        assert_eq!(recs[0].priority, Priority::Low);
    }

    #[test]
    fn test_recommendations_use_metrics_and_severity() {
        let mut m = Metrics::new();
        m.push("avg_trades_per_day", 25.0, 2);
        let over = detected(Severity::High, m);
        let mut m = Metrics::new();
        m.push("risk_reward_ratio", 0.25, 2);
        let loss = detected(Severity::Moderate, m);
        let revenge = quiet();
        let recs = recommendations(&[
            (BiasKind::Overtrading, &over),
            (BiasKind::LossAversion, &loss),
            (BiasKind::RevengeTrading, &revenge),
        ]);
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].recommendation, "Set a daily trade limit of 12 trades per day");
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[1].priority, Priority::Medium);
        assert!(recs[2].recommendation.contains("take-profit at 3%"));
        assert_eq!(recs[2].priority, Priority::Medium);
        assert_eq!(recs[3].bias, "Loss Aversion");
    }

    #[test]
    fn test_daily_limit_floor() {
        let mut m = Metrics::new();
        m.push("avg_trades_per_day", 11.0, 2);
        let over = detected(Severity::Moderate, m);
        let (b, c) = (quiet(), quiet());
        let recs = recommendations(&[
            (BiasKind::Overtrading, &over),
            (BiasKind::LossAversion, &b),
            (BiasKind::RevengeTrading, &c),
        ]);
        assert_eq!(recs[0].recommendation, "Set a daily trade limit of 5 trades per day");
    }
}
