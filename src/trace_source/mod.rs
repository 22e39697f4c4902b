//! Trace Source Client contract: ping, open/close snapshot, and paginated
//! search against a remote trace search backend. Concrete implementation
//! lives in [`elasticsearch`]; tests use [`fixture`].

pub mod elasticsearch;
pub mod fixture;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TraceSourceError;

/// `{id, max}` slice of a sliced, paginated scan. Omitting it requests the
/// full (unsliced) result set.
#[derive(Debug, Clone, Copy)]
pub struct SliceSpec {
    pub id: u32,
    pub max: u32,
}

/// One page of raw, undecoded trace documents.
pub type Page = Vec<Value>;

/// The sort key of the last hit of a page, used as the next `search_after`
/// cursor. `None` means "start from the beginning".
pub type SortKey = Option<Value>;

pub struct SearchResponse {
    pub hits: Page,
    pub next_sort_key: SortKey,
    pub refreshed_snapshot_id: String,
}

#[async_trait]
pub trait TraceSource: Send + Sync {
    /// Fails fast if the backend is unreachable; unreachability is fatal.
    async fn ping(&self) -> Result<(), TraceSourceError>;

    /// Opens a consistent, immutable read view over `index_pattern`, kept
    /// alive for `keep_alive`.
    async fn open_snapshot(
        &self,
        index_pattern: &str,
        keep_alive: std::time::Duration,
    ) -> Result<String, TraceSourceError>;

    async fn close_snapshot(&self, snapshot_id: &str) -> Result<(), TraceSourceError>;

    /// Returns the number of data nodes backing the cluster, used by the
    /// Parallel Scan Coordinator to pick the slice count.
    async fn node_count(&self) -> Result<u32, TraceSourceError>;

    #[allow(clippy::too_many_arguments)]
    async fn search(
        &self,
        snapshot_id: &str,
        query: &Value,
        slice_spec: Option<SliceSpec>,
        page_size: usize,
        search_after: SortKey,
        timeout: std::time::Duration,
        keep_alive: std::time::Duration,
    ) -> Result<SearchResponse, TraceSourceError>;
}
