//! Raw trade records and their normalized, time-ordered form.
//!
//! Input records come from heterogeneous sources (CSV exports, scraped tables,
//! JSON payloads) and spell their keys differently. Keys are resolved against
//! ordered [`FieldMatcher`] lists; a record whose timestamp or P/L cannot be
//! parsed is dropped whole.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logging;

pub const DEFAULT_ACTION: &str = "Buy";
pub const DEFAULT_ASSET: &str = "Unknown";

/// Epoch numbers below this are seconds, at or above it milliseconds.
const EPOCH_MILLIS_CUTOFF: f64 = 1e11;

// =============================================================================
// Field resolution
// =============================================================================

/// A matcher evaluated against a case-folded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatcher {
    Exact(&'static str),
    Contains(&'static str),
}

impl FieldMatcher {
    pub fn matches(&self, folded_key: &str) -> bool {
        match self {
            FieldMatcher::Exact(name) => folded_key == *name,
            FieldMatcher::Contains(part) => folded_key.contains(part),
        }
    }
}

use FieldMatcher::{Contains, Exact};

pub const TIMESTAMP_FIELDS: &[FieldMatcher] = &[
    Exact("timestamp"),
    Exact("time"),
    Exact("date"),
    Exact("datetime"),
    Contains("timestamp"),
];

/// Columns that already hold a full date and time.
const COMBINED_TIMESTAMP_FIELDS: &[FieldMatcher] = &[
    Exact("timestamp"),
    Exact("datetime"),
    Contains("timestamp"),
];

pub const PNL_FIELDS: &[FieldMatcher] = &[
    Exact("pl"),
    Exact("p/l"),
    Exact("pnl"),
    Exact("profit"),
    Exact("p&l"),
    Contains("p/l"),
    Contains("pnl"),
    Contains("profit"),
];

pub const ACTION_FIELDS: &[FieldMatcher] = &[
    Exact("buy/sell"),
    Exact("action"),
    Exact("side"),
    Exact("type"),
    Contains("buy"),
    Contains("sell"),
];

pub const ASSET_FIELDS: &[FieldMatcher] = &[
    Exact("asset"),
    Exact("symbol"),
    Contains("asset"),
    Contains("symbol"),
];

/// Index of the first key matched by the earliest candidate.
///
/// Candidates are tried in order, so an exact match listed first beats a
/// substring match listed later even if the substring key comes first.
pub fn resolve_field<S: AsRef<str>>(candidates: &[FieldMatcher], keys: &[S]) -> Option<usize> {
    let folded: Vec<String> = keys
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .collect();
    candidates
        .iter()
        .find_map(|m| folded.iter().position(|k| m.matches(k)))
}

// =============================================================================
// Raw records
// =============================================================================

/// One trade-like record exactly as supplied by a collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTradeRecord(Map<String, Value>);

impl RawTradeRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Convenience constructor for string-valued records (CSV rows, tests).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        Self(map)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Value of the field resolved by `candidates`, if any.
    pub fn field(&self, candidates: &[FieldMatcher]) -> Option<&Value> {
        let keys = self.keys();
        resolve_field(candidates, &keys).and_then(|idx| self.0.get(keys[idx]))
    }

    /// The timestamp field. A record with separate `date` and `time` columns
    /// and no combined timestamp column gets them joined as `"<date> <time>"`.
    pub fn timestamp_value(&self) -> Option<Cow<'_, Value>> {
        let keys = self.keys();
        if resolve_field(COMBINED_TIMESTAMP_FIELDS, &keys).is_none() {
            let date = resolve_field(&[Exact("date")], &keys).and_then(|i| self.0.get(keys[i]));
            let time = resolve_field(&[Exact("time")], &keys).and_then(|i| self.0.get(keys[i]));
            if let (Some(Value::String(date)), Some(Value::String(time))) = (date, time) {
                let joined = format!("{} {}", date.trim(), time.trim());
                return Some(Cow::Owned(Value::String(joined)));
            }
        }
        self.field(TIMESTAMP_FIELDS).map(Cow::Borrowed)
    }
}

// =============================================================================
// Value parsing
// =============================================================================

/// Parse a P/L value. Absent, empty, garbled and non-finite values are `None`,
/// never zero.
pub fn parse_pnl(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            let cleaned = cleaned.trim();
            let cleaned = cleaned.strip_prefix('+').unwrap_or(cleaned);
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// All-digit forms tried before the epoch fallback, keyed by length.
fn parse_compact(s: &str) -> Option<DateTime<Utc>> {
    let naive = match s.len() {
        8 => NaiveDate::parse_from_str(s, "%Y%m%d").ok()?.and_hms_opt(0, 0, 0)?,
        14 => NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S").ok()?,
        _ => return None,
    };
    Some(Utc.from_utc_datetime(&naive))
}

fn from_epoch(v: f64) -> Option<DateTime<Utc>> {
    if !v.is_finite() {
        return None;
    }
    let millis = if v.abs() < EPOCH_MILLIS_CUTOFF {
        (v * 1000.0).round()
    } else {
        v.round()
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Parse a timestamp. Naive date-times are read as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = match value {
        Value::Number(n) => return n.as_f64().and_then(from_epoch),
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return parse_compact(s).or_else(|| s.parse::<f64>().ok().and_then(from_epoch));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn parse_text(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

// =============================================================================
// Normalized trades
// =============================================================================

/// A validated trade. Win/loss flags and the calendar date are derived from
/// `pnl` and `timestamp`, so they can never disagree with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub pnl: f64,
    pub action: String,
    pub asset: String,
}

impl Trade {
    pub fn new(
        timestamp: DateTime<Utc>,
        pnl: f64,
        action: impl Into<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            pnl,
            action: action.into(),
            asset: asset.into(),
        }
    }

    /// Normalize one raw record; `None` when timestamp or P/L is unusable.
    pub fn from_raw(raw: &RawTradeRecord) -> Option<Self> {
        let timestamp = raw.timestamp_value().and_then(|v| parse_timestamp(&v))?;
        let pnl = raw.field(PNL_FIELDS).and_then(parse_pnl)?;
        Some(Self {
            timestamp,
            pnl,
            action: parse_text(raw.field(ACTION_FIELDS), DEFAULT_ACTION),
            asset: parse_text(raw.field(ASSET_FIELDS), DEFAULT_ASSET),
        })
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }

    /// UTC calendar day, used for daily grouping.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Minutes elapsed since `earlier`.
    pub fn minutes_since(&self, earlier: &Trade) -> f64 {
        (self.timestamp - earlier.timestamp).num_milliseconds() as f64 / 60_000.0
    }
}

/// Immutable, ascending-by-time list of trades for one analysis.
#[derive(Debug, Clone, Default)]
pub struct TradeSet {
    trades: Vec<Trade>,
    dropped: usize,
}

impl TradeSet {
    /// Normalize raw records, dropping invalid rows and sorting stably.
    pub fn from_raw(records: &[RawTradeRecord]) -> Self {
        let trades: Vec<Trade> = records.iter().filter_map(Trade::from_raw).collect();
        let dropped = records.len() - trades.len();
        logging::log_ingest(records.len(), trades.len(), dropped);
        let mut set = Self::from_trades(trades);
        set.dropped = dropped;
        set
    }

    pub fn from_trades(mut trades: Vec<Trade>) -> Self {
        // sort_by_key is stable: equal timestamps keep input order
        trades.sort_by_key(|t| t.timestamp);
        Self { trades, dropped: 0 }
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Raw records rejected during normalization.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn win_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_win()).count()
    }

    pub fn loss_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_loss()).count()
    }

    /// Minutes between each pair of consecutive trades (`len - 1` values).
    pub fn gaps_minutes(&self) -> impl Iterator<Item = f64> + '_ {
        self.trades.windows(2).map(|w| w[1].minutes_since(&w[0]))
    }
}

impl<'a> IntoIterator for &'a TradeSet {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}
