//! CLI surface. This module is the thin, testable seam that turns raw flags
//! into the validated `Config` the core actually runs on.

use std::path::PathBuf;

use clap::Parser;

use crate::duration::{resolve_window, Window};
use crate::error::ConfigError;

const DEFAULT_DATABASE_PATH: &str = "./kuzu-db";
const DEFAULT_INDEX_PATTERN: &str = ".ds-traces*";
const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.1;

#[derive(Parser, Debug)]
#[command(name = "regression-locator", about = "Locate latency regressions between two trace windows")]
pub struct Args {
    /// Single Elasticsearch-compatible endpoint used for both baseline and mutant ingestion.
    #[arg(long)]
    pub elastic: Option<String>,

    /// Elasticsearch-compatible endpoint for the baseline ingestion pass.
    #[arg(long)]
    pub baseline_elastic: Option<String>,

    /// Elasticsearch-compatible endpoint for the mutant ingestion pass.
    #[arg(long)]
    pub mutant_elastic: Option<String>,

    /// Path to an already-populated graph store; skips ingestion entirely.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Filters ingested documents by `service.name`.
    #[arg(long)]
    pub service_name: Option<String>,

    /// Root span of the analysis tree.
    #[arg(long)]
    pub span_name: String,

    #[arg(long)]
    pub baseline_start: String,
    #[arg(long)]
    pub baseline_end: Option<String>,
    #[arg(long)]
    pub baseline_duration: Option<String>,

    #[arg(long)]
    pub mutant_start: String,
    #[arg(long)]
    pub mutant_end: Option<String>,
    #[arg(long)]
    pub mutant_duration: Option<String>,

    /// Default window length applied when neither `--baseline-end`/
    /// `--baseline-duration` nor `--mutant-end`/`--mutant-duration` is given.
    #[arg(long)]
    pub duration: Option<String>,

    /// Minimum |r| at which two samples are considered different.
    #[arg(long, default_value_t = DEFAULT_CORRELATION_THRESHOLD)]
    pub threshold: f64,

    /// Index pattern to scan on the trace backend.
    #[arg(long, default_value = DEFAULT_INDEX_PATTERN)]
    pub index_pattern: String,

    /// Raise the default log verbosity by one level.
    #[arg(short, long)]
    pub verbose: bool,
}

pub enum SourceSelection {
    Single(String),
    Dual { baseline: String, mutant: String },
    PrePopulated(PathBuf),
}

pub struct Config {
    pub source: SourceSelection,
    pub database_path: PathBuf,
    pub service_name: Option<String>,
    pub span_name: String,
    pub baseline_window: Window,
    pub mutant_window: Window,
    pub threshold: f64,
    pub index_pattern: String,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let source = resolve_source(&self)?;

        let database_path = match &source {
            SourceSelection::PrePopulated(path) => path.clone(),
            _ => PathBuf::from(DEFAULT_DATABASE_PATH),
        };

        if self.baseline_end.is_some() && self.baseline_duration.is_some() {
            return Err(ConfigError::ConflictingBaselineWindow);
        }
        if self.mutant_end.is_some() && self.mutant_duration.is_some() {
            return Err(ConfigError::ConflictingMutantWindow);
        }

        let baseline_window = resolve_window(
            &self.baseline_start,
            self.baseline_end.as_deref(),
            self.baseline_duration.as_deref(),
            self.duration.as_deref(),
            ConfigError::MissingBaselineWindow,
        )?;
        let mutant_window = resolve_window(
            &self.mutant_start,
            self.mutant_end.as_deref(),
            self.mutant_duration.as_deref(),
            self.duration.as_deref(),
            ConfigError::MissingMutantWindow,
        )?;

        Ok(Config {
            source,
            database_path,
            service_name: self.service_name,
            span_name: self.span_name,
            baseline_window,
            mutant_window,
            threshold: self.threshold,
            index_pattern: self.index_pattern,
        })
    }
}

fn resolve_source(args: &Args) -> Result<SourceSelection, ConfigError> {
    let has_single = args.elastic.is_some();
    let has_dual = args.baseline_elastic.is_some() || args.mutant_elastic.is_some();
    let has_database = args.database.is_some();

    if has_database && (has_single || has_dual) {
        return Err(ConfigError::ConflictingSource);
    }

    match (&args.elastic, &args.baseline_elastic, &args.mutant_elastic, &args.database) {
        (Some(url), None, None, None) => Ok(SourceSelection::Single(url.clone())),
        (None, Some(baseline), Some(mutant), None) => Ok(SourceSelection::Dual {
            baseline: baseline.clone(),
            mutant: mutant.clone(),
        }),
        (None, Some(_), None, None) | (None, None, Some(_), None) => Err(ConfigError::IncompleteDualSource),
        (None, None, None, Some(path)) => Ok(SourceSelection::PrePopulated(path.clone())),
        (None, None, None, None) => Err(ConfigError::NoSourceSelected),
        _ => Err(ConfigError::ConflictingSource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            elastic: None,
            baseline_elastic: None,
            mutant_elastic: None,
            database: None,
            service_name: None,
            span_name: "root".to_string(),
            baseline_start: "2025-01-01T00:00:00Z".to_string(),
            baseline_end: None,
            baseline_duration: None,
            mutant_start: "2025-01-02T00:00:00Z".to_string(),
            mutant_end: None,
            mutant_duration: None,
            duration: Some("15m".to_string()),
            threshold: 0.1,
            index_pattern: DEFAULT_INDEX_PATTERN.to_string(),
            verbose: false,
        }
    }

    #[test]
    fn single_elastic_source_resolves() {
        let mut args = base_args();
        args.elastic = Some("http://localhost:9201".to_string());
        let config = args.into_config().unwrap();
        assert!(matches!(config.source, SourceSelection::Single(_)));
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
    }

    #[test]
    fn dual_elastic_source_resolves() {
        let mut args = base_args();
        args.baseline_elastic = Some("http://b:9201".to_string());
        args.mutant_elastic = Some("http://m:9201".to_string());
        let config = args.into_config().unwrap();
        assert!(matches!(config.source, SourceSelection::Dual { .. }));
    }

    #[test]
    fn incomplete_dual_source_is_an_error() {
        let mut args = base_args();
        args.baseline_elastic = Some("http://b:9201".to_string());
        assert!(matches!(
            args.into_config(),
            Err(ConfigError::IncompleteDualSource)
        ));
    }

    #[test]
    fn database_cannot_combine_with_elastic() {
        let mut args = base_args();
        args.elastic = Some("http://localhost:9201".to_string());
        args.database = Some(PathBuf::from("./db"));
        assert!(matches!(args.into_config(), Err(ConfigError::ConflictingSource)));
    }

    #[test]
    fn no_source_selected_is_an_error() {
        let args = base_args();
        assert!(matches!(args.into_config(), Err(ConfigError::NoSourceSelected)));
    }

    #[test]
    fn database_only_skips_ingestion_and_uses_its_own_path() {
        let mut args = base_args();
        args.database = Some(PathBuf::from("/tmp/existing-db"));
        let config = args.into_config().unwrap();
        assert!(matches!(config.source, SourceSelection::PrePopulated(_)));
        assert_eq!(config.database_path, PathBuf::from("/tmp/existing-db"));
    }

    #[test]
    fn conflicting_baseline_window_is_an_error() {
        let mut args = base_args();
        args.elastic = Some("http://localhost:9201".to_string());
        args.baseline_end = Some("2025-01-01T01:00:00Z".to_string());
        args.baseline_duration = Some("15m".to_string());
        assert!(matches!(
            args.into_config(),
            Err(ConfigError::ConflictingBaselineWindow)
        ));
    }
}
