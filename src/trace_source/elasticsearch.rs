//! Concrete `TraceSource` backed by an Elasticsearch-compatible search API:
//! `POST _pit` / `POST _search` with `pit`/`query`/`sort`/`size`/
//! `search_after`/`slice`/`timeout`/`allow_partial_search_results=false` /
//! `DELETE _pit`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{SearchResponse, SliceSpec, SortKey, TraceSource};
use crate::error::TraceSourceError;

pub struct ElasticsearchSource {
    base_url: String,
    client: reqwest::Client,
}

impl ElasticsearchSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TraceSource for ElasticsearchSource {
    async fn ping(&self) -> Result<(), TraceSourceError> {
        let resp = self
            .client
            .get(self.url(""))
            .send()
            .await
            .map_err(|source| TraceSourceError::Unreachable {
                url: self.base_url.clone(),
                source,
            })?;
        resp.error_for_status()
            .map_err(|source| TraceSourceError::Unreachable {
                url: self.base_url.clone(),
                source,
            })?;
        Ok(())
    }

    async fn open_snapshot(
        &self,
        index_pattern: &str,
        keep_alive: Duration,
    ) -> Result<String, TraceSourceError> {
        let resp: Value = self
            .client
            .post(self.url(&format!("{}/_pit", index_pattern)))
            .query(&[("keep_alive", format!("{}s", keep_alive.as_secs()))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| TraceSourceError::MalformedResponse("missing 'id' in _pit response".into()))
    }

    async fn close_snapshot(&self, snapshot_id: &str) -> Result<(), TraceSourceError> {
        self.client
            .delete(self.url("_pit"))
            .json(&json!({ "id": snapshot_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn node_count(&self) -> Result<u32, TraceSourceError> {
        let resp: Value = self
            .client
            .get(self.url("_nodes/stats/nothing"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let nodes = resp
            .get("nodes")
            .and_then(Value::as_object)
            .ok_or_else(|| TraceSourceError::MalformedResponse("missing 'nodes' in _nodes response".into()))?;
        Ok(nodes.len() as u32)
    }

    async fn search(
        &self,
        snapshot_id: &str,
        query: &Value,
        slice_spec: Option<SliceSpec>,
        page_size: usize,
        search_after: SortKey,
        timeout: Duration,
        keep_alive: Duration,
    ) -> Result<SearchResponse, TraceSourceError> {
        let mut body = json!({
            "pit": { "id": snapshot_id, "keep_alive": format!("{}s", keep_alive.as_secs()) },
            "allow_partial_search_results": false,
            "query": query,
            "timeout": format!("{}s", timeout.as_secs()),
            "size": page_size,
            "sort": {
                "@timestamp": {
                    "order": "asc",
                    "format": "strict_date_optional_time_nanos",
                    "numeric_type": "date_nanos",
                }
            },
        });

        if let Some(slice) = slice_spec {
            body["slice"] = json!({ "id": slice.id, "max": slice.max });
        }
        if let Some(sort_key) = search_after {
            body["search_after"] = sort_key;
        }

        debug!(?slice_spec, "issuing _search request");

        let resp: Value = self
            .client
            .post(self.url("_search"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let raw_hits = resp
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| TraceSourceError::MalformedResponse("missing 'hits.hits' in _search response".into()))?;

        let next_sort_key = raw_hits.last().and_then(|h| h.get("sort")).cloned();

        let hits = raw_hits
            .iter()
            .map(|hit| {
                hit.get("_source")
                    .cloned()
                    .ok_or_else(|| TraceSourceError::MalformedResponse("hit missing '_source'".into()))
            })
            .collect::<Result<Vec<Value>, TraceSourceError>>()?;

        let refreshed_snapshot_id = resp
            .get("pit_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| snapshot_id.to_string());

        Ok(SearchResponse {
            hits,
            next_sort_key,
            refreshed_snapshot_id,
        })
    }
}
