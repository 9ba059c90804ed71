//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a monotonic sequence number, a level and a
//! domain so that runs can be filtered and replayed. Records are written to
//! stderr (stdout is reserved for reports) and, when `LOG_DIR` is set, to
//! `<LOG_DIR>/<run_id>/{events,trace}.jsonl`.
//!
//! Environment:
//! - `LOG_LEVEL`: trace, debug, info (default), warn, error
//! - `LOG_DOMAINS`: comma-separated domain names, or `all` (default)
//! - `PROFILE_SAMPLE`: fraction of [`ProfileScope`]s that emit, default 1
//! - `LOG_FLUSH_SECS`: aggregator flush interval, default 300

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Levels and domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    const ALL: [Level; 5] = [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error];

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|l| l.as_str().eq_ignore_ascii_case(s))
    }

    /// Minimum level from `LOG_LEVEL`, read once per process.
    pub fn threshold() -> Self {
        static THRESHOLD: OnceLock<Level> = OnceLock::new();
        *THRESHOLD.get_or_init(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|v| Level::parse(&v))
                .unwrap_or(Level::Info)
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Ingest,  // loading and normalizing raw records
    Detect,  // per-detector scoring
    Report,  // summary, statistics, recommendations
    Server,  // HTTP service
    System,  // startup, batch runs, aggregated counters
    Profile, // timing
    Audit,   // input/output fingerprints
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ingest => "ingest",
            Domain::Detect => "detect",
            Domain::Report => "report",
            Domain::Server => "server",
            Domain::System => "system",
            Domain::Profile => "profile",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        domain_filter_allows(domain_filter(), self.as_str())
    }
}

/// `None` means every domain is enabled.
fn domain_filter() -> Option<&'static [String]> {
    static FILTER: OnceLock<Option<Vec<String>>> = OnceLock::new();
    FILTER
        .get_or_init(|| parse_domain_filter(std::env::var("LOG_DOMAINS").ok().as_deref()))
        .as_deref()
}

fn parse_domain_filter(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return None;
    }
    Some(raw.split(',').map(|d| d.trim().to_lowercase()).collect())
}

fn domain_filter_allows(filter: Option<&[String]>, domain: &str) -> bool {
    filter.map_or(true, |names| names.iter().any(|n| n == domain))
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

type LogFile = Mutex<BufWriter<File>>;

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<LogFile>,
    trace: Option<LogFile>,
}

impl RunContext {
    fn from_env() -> Self {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        match std::env::var("LOG_DIR") {
            Ok(base) => Self::with_files(run_id, PathBuf::from(base)),
            Err(_) => Self {
                run_id,
                events: None,
                trace: None,
            },
        }
    }

    fn with_files(run_id: String, base: PathBuf) -> Self {
        let run_dir = base.join(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] cannot create {}: {}", run_dir.display(), err);
        }
        let manifest = json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        });
        if let Err(err) = std::fs::write(run_dir.join("manifest.json"), manifest.to_string()) {
            eprintln!("[log] cannot write manifest: {}", err);
        }
        Self {
            events: open_log(run_dir.join("events.jsonl")),
            trace: open_log(run_dir.join("trace.jsonl")),
            run_id,
        }
    }

    /// Debug and trace records go to the trace file, the rest to events.
    fn file_for(&self, level: Level) -> Option<&LogFile> {
        if level <= Level::Debug {
            self.trace.as_ref()
        } else {
            self.events.as_ref()
        }
    }
}

fn open_log(path: PathBuf) -> Option<LogFile> {
    File::create(&path)
        .map(|f| Mutex::new(BufWriter::new(f)))
        .map_err(|err| eprintln!("[log] cannot create {}: {}", path.display(), err))
        .ok()
}

fn run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(RunContext::from_env)
}

/// Keys promoted from `data` to the top level of a record.
const CORRELATION_KEYS: [&str; 4] = ["request_id", "path", "bias", "msg"];

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let top = CORRELATION_KEYS
        .iter()
        .filter_map(|k| fields.remove(*k).map(|v| (k.to_string(), v)))
        .collect();
    (top, fields)
}

// =============================================================================
// Emitting
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn enabled(level: Level, domain: Domain) -> bool {
    level >= Level::threshold() && domain.is_enabled()
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if enabled(level, domain) {
        emit(level, domain, event, fields);
    }
}

fn build_record(
    run_id: &str,
    seq: u64,
    level: Level,
    domain: Domain,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let (mut top, data) = split_fields(fields);
    let mut entry = Map::new();
    entry.insert("ts".into(), json!(ts_now()));
    entry.insert("run_id".into(), json!(run_id));
    entry.insert("seq".into(), json!(seq));
    entry.insert("lvl".into(), json!(level.as_str().to_uppercase()));
    entry.insert("component".into(), json!(domain.as_str()));
    entry.insert("event".into(), json!(event));
    entry.insert("msg".into(), top.remove("msg").unwrap_or_else(|| json!("")));
    entry.extend(top);
    entry.insert("data".into(), Value::Object(data));
    Value::Object(entry)
}

fn emit(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = run_context();
    let line = build_record(&ctx.run_id, next_seq(), level, domain, event, fields).to_string();
    if let Some(Ok(mut w)) = ctx.file_for(level).map(|f| f.lock()) {
        let _ = writeln!(w, "{}", line).and_then(|_| w.flush());
    }
    eprintln!("{}", line);
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_ingest(records: usize, accepted: usize, dropped: usize) {
    log(
        Level::Debug,
        Domain::Ingest,
        "normalized",
        obj(&[
            ("records", json!(records)),
            ("accepted", json!(accepted)),
            ("dropped", json!(dropped)),
        ]),
    );
}

pub fn log_detection(bias: &str, detected: bool, severity: &str, score: f64) {
    log(
        Level::Debug,
        Domain::Detect,
        "bias_scored",
        obj(&[
            ("bias", v_str(bias)),
            ("detected", json!(detected)),
            ("severity", v_str(severity)),
            ("score", v_num(score)),
        ]),
    );
}

pub fn log_analysis(total_trades: usize, total_pnl: f64, biases: &[&str], recommendations: usize) {
    log(
        Level::Debug,
        Domain::Report,
        "analysis_complete",
        obj(&[
            ("total_trades", json!(total_trades)),
            ("total_pnl", v_num(total_pnl)),
            ("biases", json!(biases)),
            ("recommendations", json!(recommendations)),
        ]),
    );
}

/// Tie an input fingerprint to the fingerprint of the report built from it.
pub fn log_audit(event_type: &str, source: &str, input_hash: &str, output_hash: &str) {
    log(
        Level::Info,
        Domain::Audit,
        event_type,
        obj(&[
            ("source", v_str(source)),
            ("input_hash", v_str(input_hash)),
            ("output_hash", v_str(output_hash)),
        ]),
    );
}

pub fn log_request(request_id: u64, method: &str, path: &str, status: u16, elapsed_ms: f64) {
    log(
        Level::Info,
        Domain::Server,
        "request",
        obj(&[
            ("request_id", json!(request_id)),
            ("method", v_str(method)),
            ("path", v_str(path)),
            ("status", json!(status)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling
// =============================================================================

/// Emits a trace-level `profile` record with the elapsed time on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        let sampled = enabled(Level::Trace, Domain::Profile) && sample_profile();
        Self {
            label,
            context: sampled.then(|| obj(fields)),
            started: Instant::now(),
        }
    }
}

/// Deterministic sampling: with rate `p`, emit every scope whose sequence
/// number falls in the first `p` of each block of 1000.
fn sample_profile() -> bool {
    static RATE: OnceLock<f64> = OnceLock::new();
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let rate = *RATE.get_or_init(|| {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(1.0, |p| p.clamp(0.0, 1.0))
    });
    sampled_at(rate, SEQ.fetch_add(1, Ordering::Relaxed))
}

fn sampled_at(rate: f64, seq: u64) -> bool {
    ((seq % 1000) as f64) < rate * 1000.0
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let Some(mut fields) = self.context.take() else {
            return;
        };
        fields.insert("label".into(), v_str(self.label));
        fields.insert(
            "elapsed_ms".into(),
            v_num(self.started.elapsed().as_secs_f64() * 1000.0),
        );
        emit(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Periodic counters
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatedCounts {
    pub analyses: u64,
    pub trades: u64,
    pub rejected: u64,
    pub errors: u64,
}

impl AggregatedCounts {
    fn add(&mut self, event: &str, by: u64) {
        let slot = match event {
            "analysis" => &mut self.analyses,
            "trades" => &mut self.trades,
            "rejected" => &mut self.rejected,
            "error" => &mut self.errors,
            _ => return,
        };
        *slot += by;
    }
}

/// Counters accumulated between flushes.
struct Window {
    counts: AggregatedCounts,
    opened: Instant,
}

fn window() -> &'static Mutex<Window> {
    static WINDOW: OnceLock<Mutex<Window>> = OnceLock::new();
    WINDOW.get_or_init(|| {
        Mutex::new(Window {
            counts: AggregatedCounts::default(),
            opened: Instant::now(),
        })
    })
}

fn flush_interval_secs() -> u64 {
    static SECS: OnceLock<u64> = OnceLock::new();
    *SECS.get_or_init(|| {
        std::env::var("LOG_FLUSH_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300)
    })
}

/// Take the window's counts if it is at least `interval_secs` old.
fn take_if_due(w: &mut Window, interval_secs: u64) -> Option<AggregatedCounts> {
    if w.opened.elapsed().as_secs() < interval_secs {
        return None;
    }
    w.opened = Instant::now();
    Some(std::mem::take(&mut w.counts))
}

/// Emit the aggregated counters when the flush interval has passed.
pub fn tick_aggregator() {
    let due = window()
        .lock()
        .ok()
        .and_then(|mut w| take_if_due(&mut w, flush_interval_secs()));
    if let Some(c) = due {
        log(
            Level::Info,
            Domain::System,
            "aggregated_stats",
            obj(&[
                ("analyses", json!(c.analyses)),
                ("trades", json!(c.trades)),
                ("rejected", json!(c.rejected)),
                ("errors", json!(c.errors)),
            ]),
        );
    }
}

/// Add `by` to one of the `analysis`, `trades`, `rejected`, `error` counters.
pub fn agg_increment(event: &str, by: u64) {
    if let Ok(mut w) = window().lock() {
        w.counts.add(event, by);
    }
}
