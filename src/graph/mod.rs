//! Graph Store Adapter contract: the single place that knows the underlying
//! query language. [`sqlite`] is the persisted implementation; [`memory`] is
//! an in-memory implementation for tests.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::GraphError;
use crate::span::{Span, SpanPath};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Idempotently declares the Span node table and HasChild edge table.
    async fn create_schema(&self) -> Result<(), GraphError>;

    /// `true` if the store already holds at least one Span, used to decide
    /// whether a `--database`-selected store should skip ingestion.
    async fn is_populated(&self) -> Result<bool, GraphError>;

    /// Create-or-update a Span by id. `fields` may be a placeholder (all
    /// `None` besides `id`).
    async fn upsert_span(&self, span: &Span) -> Result<(), GraphError>;

    /// Ensures a Span row exists for `id`, creating an empty-attribute
    /// placeholder if absent. Unlike [`GraphStore::upsert_span`], this never
    /// overwrites an existing row's fields: it's a no-op when the id already
    /// has real data, so a child document arriving after its parent can
    /// never clobber the parent's fields.
    async fn ensure_span_placeholder(&self, id: &str) -> Result<(), GraphError>;

    /// Unconditionally creates a directed HasChild edge. Not idempotent —
    /// re-ingesting the same document creates a duplicate edge.
    async fn add_child_edge(&self, parent_id: &str, child_id: &str) -> Result<(), GraphError>;

    /// Names `n_{k+1}` reachable from `path` whose terminal span's
    /// timestamp falls in `[t_start_us, t_end_us]`.
    async fn distinct_child_names(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<BTreeSet<String>, GraphError>;

    /// Terminal-span durations for every chain matching `path` whose
    /// timestamp falls in `[t_start_us, t_end_us]`.
    async fn durations(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<Vec<i64>, GraphError>;
}
