//! In-memory `GraphStore`, used by unit and integration tests so the
//! analyzer and ingestor can be exercised without touching SQLite.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use super::GraphStore;
use crate::error::GraphError;
use crate::span::{Span, SpanPath};

#[derive(Default)]
struct Inner {
    spans: HashMap<String, Span>,
    // parent_id -> child_ids, in insertion order, duplicates allowed (edges
    // are not idempotent, matching the SQLite adapter).
    children: HashMap<String, Vec<String>>,
}

#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: Mutex<Inner>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Span ids whose name-chain matches `names` exactly, i.e. the set of
    /// `s_{n-1}` such that a chain `s_0 -> s_1 -> ... -> s_{n-1}` exists
    /// with `s_i.name == names[i]` for every `i`.
    fn matching_chain_tails(inner: &Inner, names: &[String]) -> Vec<String> {
        let mut candidates: Vec<String> = inner
            .spans
            .values()
            .filter(|s| s.name.as_deref() == Some(names[0].as_str()))
            .map(|s| s.id.clone())
            .collect();

        for name in &names[1..] {
            let mut next = Vec::new();
            for parent in &candidates {
                if let Some(kids) = inner.children.get(parent) {
                    for kid in kids {
                        if inner.spans.get(kid).and_then(|s| s.name.as_deref()) == Some(name.as_str()) {
                            next.push(kid.clone());
                        }
                    }
                }
            }
            candidates = next;
        }
        candidates
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn create_schema(&self) -> Result<(), GraphError> {
        Ok(())
    }

    async fn is_populated(&self) -> Result<bool, GraphError> {
        Ok(!self.inner.lock().unwrap().spans.is_empty())
    }

    async fn upsert_span(&self, span: &Span) -> Result<(), GraphError> {
        self.inner.lock().unwrap().spans.insert(span.id.clone(), span.clone());
        Ok(())
    }

    async fn ensure_span_placeholder(&self, id: &str) -> Result<(), GraphError> {
        self.inner
            .lock()
            .unwrap()
            .spans
            .entry(id.to_string())
            .or_insert_with(|| Span::placeholder(id));
        Ok(())
    }

    async fn add_child_edge(&self, parent_id: &str, child_id: &str) -> Result<(), GraphError> {
        self.inner
            .lock()
            .unwrap()
            .children
            .entry(parent_id.to_string())
            .or_default()
            .push(child_id.to_string());
        Ok(())
    }

    async fn distinct_child_names(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<BTreeSet<String>, GraphError> {
        let inner = self.inner.lock().unwrap();
        let tails = Self::matching_chain_tails(&inner, path.names());

        let mut names = BTreeSet::new();
        for tail in tails {
            if let Some(kids) = inner.children.get(&tail) {
                for kid in kids {
                    if let Some(span) = inner.spans.get(kid) {
                        if let (Some(name), Some(ts)) = (&span.name, span.timestamp_us) {
                            if ts >= t_start_us && ts <= t_end_us {
                                names.insert(name.clone());
                            }
                        }
                    }
                }
            }
        }
        Ok(names)
    }

    async fn durations(
        &self,
        path: &SpanPath,
        t_start_us: i64,
        t_end_us: i64,
    ) -> Result<Vec<i64>, GraphError> {
        let inner = self.inner.lock().unwrap();
        let tails = Self::matching_chain_tails(&inner, path.names());

        let mut out = Vec::new();
        for tail in tails {
            if let Some(span) = inner.spans.get(&tail) {
                if let (Some(ts), Some(dur)) = (span.timestamp_us, span.duration_us) {
                    if ts >= t_start_us && ts <= t_end_us {
                        out.push(dur);
                    }
                }
            }
        }
        Ok(out)
    }
}
