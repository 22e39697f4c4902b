//! An in-memory `TraceSource` fixture used by scan-coordinator tests so the
//! pipeline can be exercised without a live Elasticsearch-compatible
//! backend.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{SearchResponse, SliceSpec, SortKey, TraceSource};
use crate::error::TraceSourceError;

/// Serves a fixed corpus of documents, partitioned across slices by
/// `doc_index % max == id`, matching how a real backend's `slice` parameter
/// partitions a result set (round-robin over a stable hash of the document).
pub struct FixtureSource {
    docs: Vec<Value>,
    node_count: u32,
    page_size_override: Mutex<Option<usize>>,
}

impl FixtureSource {
    pub fn new(docs: Vec<Value>) -> Self {
        Self {
            docs,
            node_count: 1,
            page_size_override: Mutex::new(None),
        }
    }

    pub fn with_node_count(docs: Vec<Value>, node_count: u32) -> Self {
        Self {
            docs,
            node_count,
            page_size_override: Mutex::new(None),
        }
    }

    pub fn with_page_size(docs: Vec<Value>, node_count: u32, page_size: usize) -> Self {
        Self {
            docs,
            node_count,
            page_size_override: Mutex::new(Some(page_size)),
        }
    }
}

#[async_trait]
impl TraceSource for FixtureSource {
    async fn ping(&self) -> Result<(), TraceSourceError> {
        Ok(())
    }

    async fn open_snapshot(&self, _index_pattern: &str, _keep_alive: Duration) -> Result<String, TraceSourceError> {
        Ok("fixture-pit".to_string())
    }

    async fn close_snapshot(&self, _snapshot_id: &str) -> Result<(), TraceSourceError> {
        Ok(())
    }

    async fn node_count(&self) -> Result<u32, TraceSourceError> {
        Ok(self.node_count)
    }

    async fn search(
        &self,
        snapshot_id: &str,
        _query: &Value,
        slice_spec: Option<SliceSpec>,
        page_size: usize,
        search_after: SortKey,
        _timeout: Duration,
        _keep_alive: Duration,
    ) -> Result<SearchResponse, TraceSourceError> {
        let page_size = self.page_size_override.lock().unwrap().unwrap_or(page_size);

        let matching: Vec<&Value> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(i, _)| match slice_spec {
                Some(spec) => (*i as u32) % spec.max == spec.id,
                None => true,
            })
            .map(|(_, doc)| doc)
            .collect();

        let start = match &search_after {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
            _ => 0,
        };

        let page: Vec<Value> = matching
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        let next_sort_key = Some(Value::from((start + page.len()) as u64));

        Ok(SearchResponse {
            hits: page,
            next_sort_key,
            refreshed_snapshot_id: snapshot_id.to_string(),
        })
    }
}
