//! Loss aversion: cutting winners short while letting losers run.

use super::BiasDetector;
use crate::bias::{BiasKind, BiasResult, Metrics, Severity};
use crate::logging;
use crate::stats::{mean, pct};
use crate::trade::TradeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct LossAversionDetector;

impl BiasDetector for LossAversionDetector {
    fn kind(&self) -> BiasKind {
        BiasKind::LossAversion
    }

    fn detect(&self, trades: &TradeSet) -> BiasResult {
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect();
        if wins.is_empty() || losses.is_empty() {
            return BiasResult::insufficient_data(self.kind());
        }

        let avg_win = mean(wins.iter().copied());
        let avg_loss = mean(losses.iter().copied()).abs();
        let ratio = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };
        let win_rate = pct(wins.len(), trades.len());
        let largest_win = wins.iter().copied().fold(f64::MIN, f64::max);
        let largest_loss = losses.iter().copied().fold(f64::MAX, f64::min).abs();

        let mut score = 0.0;
        if ratio < 1.0 {
            score += 40.0;
        } else if ratio < 1.5 {
            score += 20.0;
        }
        // high hit rate with small wins: taking profit too early
        if win_rate > 60.0 && ratio < 1.2 {
            score += 30.0;
        }
        // outsized worst loss: holding losers
        if largest_loss > largest_win * 2.0 {
            score += 30.0;
        }

        let mut metrics = Metrics::new();
        metrics
            .push("risk_reward_ratio", ratio, 2)
            .push("avg_win", avg_win, 2)
            .push("avg_loss", avg_loss, 2)
            .push("win_rate", win_rate, 1)
            .push("largest_win", largest_win, 2)
            .push("largest_loss", largest_loss, 2);

        let result =
            BiasResult::scored(score, metrics, |severity| describe(severity, ratio, win_rate));
        logging::log_detection(
            self.kind().key(),
            result.detected,
            result.severity.as_str(),
            result.score,
        );
        result
    }
}

fn describe(severity: Severity, ratio: f64, win_rate: f64) -> String {
    match severity {
        Severity::High => format!(
            "Your risk-reward ratio ({:.2}) suggests you're cutting winners short while holding losers. \
             With a {:.1}% win rate, you need larger wins to offset losses.",
            ratio, win_rate
        ),
        Severity::Moderate => format!(
            "Your risk-reward ratio ({:.2}) could be improved. \
             Consider letting winners run longer and cutting losses faster.",
            ratio
        ),
        Severity::Low => "Your risk-reward management appears balanced.".to_string(),
    }
}
