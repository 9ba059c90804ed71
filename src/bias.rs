//! Bias classification types shared by every detector.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::stats::round_dp;

/// Scores strictly above this are reported as detected.
pub const DETECTION_THRESHOLD: f64 = 25.0;
pub const MAX_SCORE: f64 = 100.0;

/// Severity tier derived from a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Severity::Low
        } else if score < 60.0 {
            Severity::Moderate
        } else {
            Severity::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }
}

/// The behavioral patterns the engine looks for, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Overtrading,
    LossAversion,
    RevengeTrading,
}

impl BiasKind {
    pub const ALL: [BiasKind; 3] = [
        BiasKind::Overtrading,
        BiasKind::LossAversion,
        BiasKind::RevengeTrading,
    ];

    /// Human-readable name used in summaries and recommendations
    pub fn display_name(&self) -> &'static str {
        match self {
            BiasKind::Overtrading => "Overtrading",
            BiasKind::LossAversion => "Loss Aversion",
            BiasKind::RevengeTrading => "Revenge Trading",
        }
    }

    /// Key of this bias in the serialized report
    pub fn key(&self) -> &'static str {
        match self {
            BiasKind::Overtrading => "overtrading",
            BiasKind::LossAversion => "loss_aversion",
            BiasKind::RevengeTrading => "revenge_trading",
        }
    }
}

/// Named metric values in insertion order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics(Vec<(&'static str, f64)>);

impl Metrics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert `value` rounded to `places` decimals.
    pub fn push(&mut self, name: &'static str, value: f64, places: u32) -> &mut Self {
        self.0.push((name, round_dp(value, places)));
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Outcome of one detector over one trade set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasResult {
    pub detected: bool,
    pub severity: Severity,
    pub score: f64,
    pub metrics: Metrics,
    pub description: String,
}

impl BiasResult {
    /// Build a result from a raw additive score.
    ///
    /// The score is capped at [`MAX_SCORE`] and rounded to one decimal before
    /// severity and detection are derived, so the reported score always agrees
    /// with the reported tier.
    pub fn scored(
        raw_score: f64,
        metrics: Metrics,
        describe: impl FnOnce(Severity) -> String,
    ) -> Self {
        let score = round_dp(raw_score.clamp(0.0, MAX_SCORE), 1);
        let severity = Severity::from_score(score);
        Self {
            detected: score > DETECTION_THRESHOLD,
            severity,
            score,
            metrics,
            description: describe(severity),
        }
    }

    /// Not-detected result for sparse input. Always score 0 with no metrics.
    pub fn not_detected(description: impl Into<String>) -> Self {
        Self {
            detected: false,
            severity: Severity::Low,
            score: 0.0,
            metrics: Metrics::new(),
            description: description.into(),
        }
    }

    pub fn insufficient_data(kind: BiasKind) -> Self {
        Self::not_detected(format!(
            "Insufficient data to detect {} patterns.",
            kind.display_name().to_lowercase()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_tiers() {
        assert_eq!(Severity::from_score(0.0), Severity::Low);
        assert_eq!(Severity::from_score(29.9), Severity::Low);
        assert_eq!(Severity::from_score(30.0), Severity::Moderate);
        assert_eq!(Severity::from_score(59.9), Severity::Moderate);
        assert_eq!(Severity::from_score(60.0), Severity::High);
        assert_eq!(Severity::from_score(100.0), Severity::High);
    }

    #[test]
    fn test_scored_caps_and_rounds() {
        let r = BiasResult::scored(110.0, Metrics::new(), |s| s.as_str().to_string());
        assert_eq!(r.score, 100.0);
        assert_eq!(r.severity, Severity::High);
        assert!(r.detected);
        assert_eq!(r.description, "High");

        let r = BiasResult::scored(25.04, Metrics::new(), |_| String::new());
        assert_eq!(r.score, 25.0);
        assert!(!r.detected);
        assert_eq!(r.severity, Severity::Low);
    }

    #[test]
    fn test_detected_iff_above_threshold() {
        for raw in [0.0, 20.0, 25.0, 25.1, 26.0, 40.0, 75.0] {
            let r = BiasResult::scored(raw, Metrics::new(), |_| String::new());
            assert_eq!(r.detected, r.score > DETECTION_THRESHOLD, "raw {}", raw);
        }
    }

    #[test]
    fn test_insufficient_data_description() {
        let r = BiasResult::insufficient_data(BiasKind::LossAversion);
        assert!(!r.detected);
        assert_eq!(r.score, 0.0);
        assert!(r.metrics.is_empty());
        assert_eq!(r.description, "Insufficient data to detect loss aversion patterns.");
    }

    #[test]
    fn test_metrics_serialize_in_insertion_order() {
        let mut m = Metrics::new();
        m.push("zeta", 1.234, 2).push("alpha", 9.87, 1);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"zeta":1.23,"alpha":9.9}"#);
        assert_eq!(m.get("alpha"), Some(9.9));
        assert_eq!(m.get("missing"), None);
    }
}
