//! Behavioral bias detection over a trader's executed-trade history.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Raw records  │────►│  TradeSet    │────►│  Detectors   │
//! │ (CSV / JSON) │     │ (normalized) │     │  (pure fns)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                                           ┌──────────────┐
//!                                           │AnalysisReport│
//!                                           └──────────────┘
//! ```

pub mod analysis;
pub mod bias;
pub mod config;
pub mod data;
pub mod detectors;
pub mod logging;
pub mod mock;
pub mod report;
pub mod runner;
pub mod server;
pub mod stats;
pub mod trade;

pub use analysis::{AnalysisReport, BiasEngine};
pub use bias::{BiasKind, BiasResult, Metrics, Severity};
pub use report::{Priority, Recommendation, Statistics, Summary};
pub use trade::{RawTradeRecord, Trade, TradeSet};
