//! Loading raw trade records from CSV and JSON, plus input fingerprints for
//! the audit log.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::trade::{
    resolve_field, RawTradeRecord, ACTION_FIELDS, ASSET_FIELDS, PNL_FIELDS, TIMESTAMP_FIELDS,
};

/// Header columns resolved for each trade field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumns {
    pub timestamp: String,
    pub pnl: String,
    pub action: Option<String>,
    pub asset: Option<String>,
}

impl ResolvedColumns {
    /// Resolve a header row. Timestamp and P/L columns are required.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let pick = |idx: Option<usize>| idx.map(|i| header[i].clone());
        let timestamp = pick(resolve_field(TIMESTAMP_FIELDS, header))
            .ok_or_else(|| anyhow!("missing timestamp column in header {:?}", header))?;
        let pnl = pick(resolve_field(PNL_FIELDS, header))
            .ok_or_else(|| anyhow!("missing P/L column in header {:?}", header))?;
        Ok(Self {
            timestamp,
            pnl,
            action: pick(resolve_field(ACTION_FIELDS, header)),
            asset: pick(resolve_field(ASSET_FIELDS, header)),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub columns: Vec<String>,
    pub resolved: Option<ResolvedColumns>,
}

/// Records loaded from one file.
#[derive(Debug, Clone)]
pub struct LoadedTrades {
    pub records: Vec<RawTradeRecord>,
    pub manifest: InputManifest,
}

// =============================================================================
// CSV
// =============================================================================

/// Parse CSV text into raw records keyed by header name.
///
/// `#` starts a comment line and blank lines are skipped. Quoted fields may
/// span lines. Short rows yield records with missing fields, which
/// normalization drops.
pub fn parse_csv_str(text: &str) -> Result<(Vec<RawTradeRecord>, Vec<String>, ResolvedColumns)> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() {
        bail!("empty CSV input");
    }
    let resolved = ResolvedColumns::from_header(&header)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("malformed CSV record {}", i + 1))?;
        let map: Map<String, Value> = header
            .iter()
            .cloned()
            .zip(row.iter().map(|v| Value::String(v.to_string())))
            .collect();
        records.push(RawTradeRecord::from_map(map));
    }
    Ok((records, header, resolved))
}

// =============================================================================
// JSON
// =============================================================================

/// Accept a top-level array, or an object carrying a `trades` array.
/// Non-object array elements become empty records and are dropped later.
pub fn parse_json_value(payload: &Value) -> Result<Vec<RawTradeRecord>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("trades") {
            Some(Value::Array(items)) => items,
            Some(other) => bail!("`trades` must be a list, got {}", json_type(other)),
            None => bail!("expected a list of trade records or an object with `trades`"),
        },
        other => bail!("expected a list of trade records, got {}", json_type(other)),
    };
    Ok(items
        .iter()
        .map(|item| match item {
            Value::Object(map) => RawTradeRecord::from_map(map.clone()),
            _ => RawTradeRecord::new(),
        })
        .collect())
}

pub fn parse_json_str(text: &str) -> Result<Vec<RawTradeRecord>> {
    let payload: Value = serde_json::from_str(text)?;
    parse_json_value(&payload)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Files
// =============================================================================

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Load records from `path`: `.json` files as JSON, anything else as CSV.
pub fn load_trades(path: &Path) -> Result<LoadedTrades> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?;
    let (records, columns, resolved) = if is_json_path(path) {
        (parse_json_str(&text)?, Vec::new(), None)
    } else {
        let (records, header, resolved) = parse_csv_str(&text)?;
        (records, header, Some(resolved))
    };
    let manifest = InputManifest {
        path: path.display().to_string(),
        hash_sha256: file_sha256(path)?,
        row_count: records.len() as u64,
        columns,
        resolved,
    };
    Ok(LoadedTrades { records, manifest })
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over the canonical JSON of `value`.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value).context("failed to serialize for fingerprint")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
