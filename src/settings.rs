//! Environment-overridable defaults for the ingestion pipeline. CLI flags
//! (none currently exposed for these knobs) would take precedence over
//! these, which take precedence over the hard-coded fallback.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub page_size: usize,
    pub request_timeout: Duration,
    pub keep_alive: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: env_parse("SCAN_PAGE_SIZE", 10_000),
            request_timeout: Duration::from_secs(env_parse("SCAN_REQUEST_TIMEOUT_SECS", 300)),
            keep_alive: Duration::from_secs(env_parse("SCAN_KEEP_ALIVE_SECS", 300)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub workers: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            workers: env_parse("INGEST_WORKER_COUNT", 4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub correlation_threshold: f64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            correlation_threshold: env_parse("ANALYZER_CORRELATION_THRESHOLD", 0.1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
