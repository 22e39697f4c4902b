//! Per-module error enums, one per component boundary. The CLI binary
//! itself deals in `anyhow::Result`; these enums are the concrete error
//! types that get wrapped at that boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("exactly one of --elastic, --baseline-elastic/--mutant-elastic, or --database must be given")]
    NoSourceSelected,

    #[error("--database cannot be combined with --elastic or --baseline-elastic/--mutant-elastic")]
    ConflictingSource,

    #[error("--baseline-elastic and --mutant-elastic must both be given, or neither")]
    IncompleteDualSource,

    #[error("--baseline-end and --baseline-duration are mutually exclusive")]
    ConflictingBaselineWindow,

    #[error("--mutant-end and --mutant-duration are mutually exclusive")]
    ConflictingMutantWindow,

    #[error("no end or duration given for the baseline window (pass --baseline-end, --baseline-duration, or --duration)")]
    MissingBaselineWindow,

    #[error("no end or duration given for the mutant window (pass --mutant-end, --mutant-duration, or --duration)")]
    MissingMutantWindow,

    #[error("invalid duration '{0}': expected `N` followed by one of s, m, h")]
    InvalidDuration(String),

    #[error("invalid timestamp '{0}': {1}")]
    InvalidTimestamp(String, String),
}

#[derive(Error, Debug)]
pub enum TraceSourceError {
    #[error("trace backend at {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to trace backend failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response shape from trace backend: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("document missing required field '{0}'")]
    MalformedDocument(&'static str),

    #[error("ingestion worker panicked: {0}")]
    WorkerPanicked(String),

    #[error(transparent)]
    Source(#[from] TraceSourceError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph store error: {0}")]
    Storage(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("empty duration sample for path {path} on the {side} side")]
    EmptySample { path: String, side: &'static str },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
