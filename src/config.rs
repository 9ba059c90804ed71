//! Process settings read from the environment.
//!
//! Every field has a default; unparseable values fall back to it.

use crate::mock::MockProfile;

/// Runtime settings for the binaries. Scoring thresholds are constants in the
/// detectors and never read from here.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub max_body_bytes: usize,
    pub request_timeout_ms: u64,
    pub batch_threads: usize,
    pub mock_trades: usize,
    pub mock_seed: Option<u64>,
    pub mock_profile: MockProfile,
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5001".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout_ms: 10_000,
            batch_threads: default_threads(),
            mock_trades: 200,
            mock_seed: None,
            mock_profile: MockProfile::Mixed,
            pretty_json: false,
        }
    }
}

fn default_threads() -> usize {
    num_cpus::get().clamp(1, 8)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            server_addr: std::env::var("BIAS_SERVER_ADDR").unwrap_or(d.server_addr),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(d.max_body_bytes),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(d.request_timeout_ms),
            batch_threads: env_parse("BATCH_THREADS")
                .filter(|n| *n > 0)
                .unwrap_or(d.batch_threads),
            mock_trades: env_parse("MOCK_TRADES").unwrap_or(d.mock_trades),
            mock_seed: env_parse("MOCK_SEED"),
            mock_profile: std::env::var("MOCK_PROFILE")
                .ok()
                .and_then(|v| MockProfile::parse(&v))
                .unwrap_or(d.mock_profile),
            pretty_json: env_flag("PRETTY_JSON"),
        }
    }

    /// Seed to use for mock data: `MOCK_SEED` if set, otherwise the clock.
    pub fn seed_or_now(&self) -> u64 {
        self.mock_seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server_addr, "127.0.0.1:5001");
        assert_eq!(cfg.max_body_bytes, 1_048_576);
        assert_eq!(cfg.request_timeout_ms, 10_000);
        assert!(cfg.batch_threads >= 1 && cfg.batch_threads <= 8);
        assert_eq!(cfg.mock_trades, 200);
        assert_eq!(cfg.mock_profile, MockProfile::Mixed);
        assert!(!cfg.pretty_json);
    }

    #[test]
    fn test_fixed_seed_wins() {
        let cfg = Config {
            mock_seed: Some(42),
            ..Config::default()
        };
        assert_eq!(cfg.seed_or_now(), 42);
    }
}
