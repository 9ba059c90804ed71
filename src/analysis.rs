//! The bias engine: normalize once, detect once, report.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::bias::{BiasKind, BiasResult};
use crate::data::parse_json_value;
use crate::detectors::detector_for;
use crate::logging::{self, ProfileScope};
use crate::report::{self, Recommendation, Statistics, Summary};
use crate::trade::{RawTradeRecord, TradeSet};

/// Aggregate output of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub overtrading: BiasResult,
    pub loss_aversion: BiasResult,
    pub revenge_trading: BiasResult,
    pub summary: Summary,
    pub recommendations: Vec<Recommendation>,
    pub statistics: Statistics,
}

impl AnalysisReport {
    pub fn bias(&self, kind: BiasKind) -> &BiasResult {
        match kind {
            BiasKind::Overtrading => &self.overtrading,
            BiasKind::LossAversion => &self.loss_aversion,
            BiasKind::RevengeTrading => &self.revenge_trading,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize analysis report")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize analysis report")
    }
}

/// Stateless analyzer. Cheap to copy and safe to share across threads; every
/// call works only on the input it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasEngine;

impl BiasEngine {
    pub fn new() -> Self {
        Self
    }

    /// Normalize raw records and analyze them.
    pub fn analyze(&self, records: &[RawTradeRecord]) -> AnalysisReport {
        let trades = TradeSet::from_raw(records);
        self.analyze_trades(&trades)
    }

    /// Analyze a JSON payload: an array of records, or an object with a
    /// `trades` array. Any other shape is an error.
    pub fn analyze_json(&self, payload: &Value) -> Result<AnalysisReport> {
        let records = parse_json_value(payload)?;
        Ok(self.analyze(&records))
    }

    pub fn analyze_trades(&self, trades: &TradeSet) -> AnalysisReport {
        let _profile = ProfileScope::with_context(
            "analyze_trades",
            &[("trades", serde_json::json!(trades.len()))],
        );

        let [overtrading, loss_aversion, revenge_trading] =
            BiasKind::ALL.map(|kind| detector_for(kind).detect(trades));

        let results = [
            (BiasKind::Overtrading, &overtrading),
            (BiasKind::LossAversion, &loss_aversion),
            (BiasKind::RevengeTrading, &revenge_trading),
        ];
        let summary = report::summarize(trades, &results);
        let recommendations = report::recommendations(&results);
        let statistics = report::statistics(trades);

        let names: Vec<&str> = summary.biases_detected.iter().map(|s| s.as_str()).collect();
        logging::log_analysis(trades.len(), summary.total_pnl, &names, recommendations.len());

        AnalysisReport {
            overtrading,
            loss_aversion,
            revenge_trading,
            summary,
            recommendations,
            statistics,
        }
    }
}
