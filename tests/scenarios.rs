use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tradebias::mock::{generate_mock_trades, MockProfile};
use tradebias::{BiasEngine, BiasKind, Priority, RawTradeRecord, Severity, TradeSet};

/// Records at 2024-03-04 09:30 UTC + offset minutes.
fn records(layout: &[(i64, f64)]) -> Vec<RawTradeRecord> {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
    layout
        .iter()
        .map(|(m, pnl)| {
            let ts = (t0 + Duration::minutes(*m)).format("%Y-%m-%d %H:%M:%S").to_string();
            let pnl = pnl.to_string();
            RawTradeRecord::from_pairs(&[
                ("Timestamp", ts.as_str()),
                ("Buy/sell", "Buy"),
                ("Asset", "AAPL"),
                ("P/L", pnl.as_str()),
            ])
        })
        .collect()
}

#[test]
fn empty_history_is_a_valid_report() {
    let report = BiasEngine::new().analyze(&[]);
    assert_eq!(report.statistics.total_trades, 0);
    assert_eq!(report.summary.bias_count, 0);
    assert!(report.summary.biases_detected.is_empty());
    for kind in BiasKind::ALL {
        assert!(!report.bias(kind).detected);
    }
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].priority, Priority::Low);
}

#[test]
fn heavy_same_day_trading_is_high_overtrading() {
    let layout: Vec<(i64, f64)> = (0..25)
        .map(|i| (i * 2, if i % 2 == 0 { 10.0 } else { -10.0 }))
        .collect();
    let report = BiasEngine::new().analyze(&records(&layout));
    assert!(report.overtrading.detected);
    assert_eq!(report.overtrading.severity, Severity::High);
    assert_eq!(report.summary.biases_detected[0], "Overtrading");
    assert_eq!(
        report.recommendations[0].recommendation,
        "Set a daily trade limit of 12 trades per day"
    );
    assert_eq!(report.recommendations[0].priority, Priority::High);
}

#[test]
fn small_wins_big_losses_is_loss_aversion() {
    let layout: Vec<(i64, f64)> = (0..20)
        .map(|i| (i * 60, if i % 2 == 0 { 5.0 } else { -20.0 }))
        .collect();
    let report = BiasEngine::new().analyze(&records(&layout));
    assert!(report.loss_aversion.detected);
    assert!(report.loss_aversion.severity >= Severity::Moderate);
    assert_eq!(report.loss_aversion.metrics.get("risk_reward_ratio"), Some(0.25));
}

#[test]
fn rapid_losing_reentries_is_revenge_trading() {
    let mut layout = vec![(0, -20.0)];
    layout.extend((1..=10).map(|i| (i, -50.0)));
    layout.extend((1..=10).map(|k| (10 + 120 * k, 30.0)));
    let report = BiasEngine::new().analyze(&records(&layout));
    assert!(report.revenge_trading.detected);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.recommendation == "Implement a mandatory 2-hour break after any losing trade"));
}

#[test]
fn single_trade_is_insufficient_everywhere() {
    let report = BiasEngine::new().analyze(&records(&[(0, 42.0)]));
    for kind in BiasKind::ALL {
        let r = report.bias(kind);
        assert!(!r.detected);
        assert_eq!(r.score, 0.0);
        assert!(r.description.starts_with("Insufficient data"), "{}", r.description);
    }
    assert_eq!(report.statistics.total_trades, 1);
    assert_eq!(report.summary.win_rate, 100.0);

    let report = BiasEngine::new().analyze(&records(&[(0, -1.0)]));
    assert_eq!(report.summary.win_rate, 0.0);
}

#[test]
fn malformed_rows_are_dropped_and_rest_sorted() {
    let mut raw = records(&[(30, 1.0), (0, 2.0), (15, -3.0)]);
    raw.push(RawTradeRecord::from_pairs(&[("Timestamp", "yesterday"), ("P/L", "5")]));
    raw.push(RawTradeRecord::from_pairs(&[("Timestamp", "2024-03-04 10:00:00"), ("P/L", "n/a")]));
    raw.push(RawTradeRecord::from_pairs(&[("Timestamp", "2024-03-04 10:00:00")]));

    let set = TradeSet::from_raw(&raw);
    assert_eq!(set.len(), 3);
    assert_eq!(set.dropped(), 3);
    let pnls: Vec<f64> = set.iter().map(|t| t.pnl).collect();
    assert_eq!(pnls, vec![2.0, -3.0, 1.0]);
    assert!(set.as_slice().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn input_order_does_not_change_the_report() {
    let layout: Vec<(i64, f64)> = (0..30)
        .map(|i| (i * 7, if i % 3 == 0 { -12.0 } else { 4.5 }))
        .collect();
    let forward = records(&layout);
    let mut reversed = forward.clone();
    reversed.reverse();

    let engine = BiasEngine::new();
    let a = engine.analyze(&forward);
    let b = engine.analyze(&reversed);
    assert_eq!(a, b);
    assert_eq!(a.to_json().unwrap(), engine.analyze(&forward).to_json().unwrap());
}

#[test]
fn scores_are_bounded_and_drive_detection() {
    let engine = BiasEngine::new();
    for profile in [
        MockProfile::Disciplined,
        MockProfile::Overtrader,
        MockProfile::LossAverse,
        MockProfile::Revenge,
        MockProfile::Mixed,
    ] {
        for seed in 0..3 {
            let report = engine.analyze(&generate_mock_trades(profile, 150, seed));
            for kind in BiasKind::ALL {
                let r = report.bias(kind);
                assert!((0.0..=100.0).contains(&r.score));
                assert_eq!(r.detected, r.score > 25.0);
                assert_eq!(r.severity, Severity::from_score(r.score));
            }
            assert_eq!(report.summary.bias_count, report.summary.biases_detected.len());
        }
    }
}

#[test]
fn severity_is_monotonic_in_score() {
    let mut last = Severity::Low;
    for tenths in 0..=1000 {
        let s = Severity::from_score(tenths as f64 / 10.0);
        assert!(s >= last);
        last = s;
    }
    assert_eq!(Severity::from_score(29.9), Severity::Low);
    assert_eq!(Severity::from_score(30.0), Severity::Moderate);
    assert_eq!(Severity::from_score(60.0), Severity::High);
}

#[test]
fn report_json_has_no_non_finite_numbers() {
    let report = BiasEngine::new().analyze(&generate_mock_trades(MockProfile::Mixed, 200, 9));
    let v: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    fn walk(v: &Value) {
        match v {
            Value::Number(n) => assert!(n.as_f64().map(f64::is_finite).unwrap_or(true)),
            Value::Array(items) => items.iter().for_each(walk),
            Value::Object(map) => map.values().for_each(walk),
            _ => {}
        }
    }
    walk(&v);
    assert_eq!(v["summary"]["total_trades"], json!(200));
}
