//! Span Ingestor: decodes raw trace documents and writes them into the
//! Graph Store. Decoding rejects anything missing a required field with a
//! typed `Result` rather than panicking, so a malformed document degrades
//! to a reported error instead of taking the whole pipeline down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::graph::GraphStore;
use crate::span::Span;
use crate::trace_source::Page;

/// The canonical fields every document must carry, regardless of whether it
/// is a trace root (`transaction`) or a non-root span.
struct DecodedDocument {
    span_id: String,
    trace_id: String,
    name: String,
    timestamp_us: i64,
    duration_us: i64,
    parent_id: Option<String>,
}

fn get_str<'a>(doc: &'a Value, pointer: &str, field: &'static str) -> Result<&'a str, IngestError> {
    doc.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(IngestError::MalformedDocument(field))
}

fn get_i64(doc: &Value, pointer: &str, field: &'static str) -> Result<i64, IngestError> {
    doc.pointer(pointer)
        .and_then(Value::as_i64)
        .ok_or(IngestError::MalformedDocument(field))
}

/// A document is a trace root iff it has a `transaction` field. Timestamps
/// are decoded from the ISO8601 `@timestamp` field into microseconds since
/// the epoch, matching the graph store's `timestamp_us` column.
fn decode(doc: &Value) -> Result<DecodedDocument, IngestError> {
    let timestamp_str = get_str(doc, "/@timestamp", "@timestamp")?;
    let timestamp_us = DateTime::parse_from_rfc3339(timestamp_str)
        .map(|dt| dt.with_timezone(&Utc).timestamp_micros())
        .map_err(|_| IngestError::MalformedDocument("@timestamp"))?;

    let trace_id = get_str(doc, "/trace/id", "trace.id")?.to_string();
    let span_id = get_str(doc, "/span/id", "span.id")?.to_string();

    let is_root = doc.get("transaction").is_some();
    let (name, duration_us, parent_id) = if is_root {
        (
            get_str(doc, "/transaction/name", "transaction.name")?.to_string(),
            get_i64(doc, "/transaction/duration/us", "transaction.duration.us")?,
            None,
        )
    } else {
        let parent_id = get_str(doc, "/parent/id", "parent.id")?.to_string();
        (
            get_str(doc, "/span/name", "span.name")?.to_string(),
            get_i64(doc, "/span/duration/us", "span.duration.us")?,
            Some(parent_id),
        )
    };

    Ok(DecodedDocument {
        span_id,
        trace_id,
        name,
        timestamp_us,
        duration_us,
        parent_id,
    })
}

/// Writes one decoded document: upsert the span unconditionally, then (if
/// it has a parent) ensure a placeholder exists for the parent and create
/// the edge.
async fn ingest_document(store: &dyn GraphStore, doc: &Value) -> Result<(), IngestError> {
    let decoded = decode(doc)?;

    store
        .upsert_span(&Span {
            id: decoded.span_id.clone(),
            trace_id: Some(decoded.trace_id),
            name: Some(decoded.name),
            timestamp_us: Some(decoded.timestamp_us),
            duration_us: Some(decoded.duration_us),
        })
        .await?;

    if let Some(parent_id) = decoded.parent_id {
        store.ensure_span_placeholder(&parent_id).await?;
        store.add_child_edge(&parent_id, &decoded.span_id).await?;
    }

    Ok(())
}

/// Consumes pages from `pages` across `worker_count` concurrent workers,
/// writing every document to `store`. Workers race on the shared channel
/// receiver (wrapped behind a mutex) rather than splitting pages up front,
/// so a slow worker never starves a fast one of pages.
pub async fn run_ingestion(
    store: Arc<dyn GraphStore>,
    pages: mpsc::Receiver<Page>,
    worker_count: usize,
) -> Result<u64, IngestError> {
    let pages = Arc::new(tokio::sync::Mutex::new(pages));
    let mut workers = Vec::with_capacity(worker_count);

    for worker_id in 0..worker_count {
        let store = store.clone();
        let pages = pages.clone();
        workers.push(tokio::spawn(async move {
            let mut ingested: u64 = 0;
            loop {
                let page = {
                    let mut guard = pages.lock().await;
                    guard.recv().await
                };
                let Some(page) = page else { break };
                debug!(worker_id, docs = page.len(), "ingesting page");
                for doc in &page {
                    ingest_document(store.as_ref(), doc).await?;
                    ingested += 1;
                }
            }
            Ok::<u64, IngestError>(ingested)
        }));
    }

    let mut total = 0;
    for worker in workers {
        total += worker
            .await
            .map_err(|e| IngestError::WorkerPanicked(e.to_string()))??;
    }
    Ok(total)
}
