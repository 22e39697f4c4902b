//! Slice Scanner: drives one slice of a sliced, paginated scan, pushing
//! pages onto a channel as they arrive. A bounded channel stands in for a
//! lazy page generator, and the coordinator (the channel's receiver side)
//! is the consumer driving it forward.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::error::TraceSourceError;
use crate::trace_source::{Page, SliceSpec, SortKey, TraceSource};

pub struct SliceScannerConfig {
    pub page_size: usize,
    pub request_timeout: Duration,
    pub keep_alive: Duration,
}

/// Runs one slice to completion, emitting pages on `tx`. Returns once the
/// slice drains, the channel closes (coordinator gave up), or cancellation
/// is signalled. Not restartable — reopening would require a new snapshot.
pub async fn scan_slice(
    source: Arc<dyn TraceSource>,
    query: Value,
    mut snapshot_id: String,
    slice: Option<SliceSpec>,
    config: SliceScannerConfig,
    tx: mpsc::Sender<Page>,
    mut cancelled: watch::Receiver<bool>,
) -> Result<(), TraceSourceError> {
    let mut search_after: SortKey = None;
    let mut slice_hits: u64 = 0;
    let slice_label = slice.map(|s| s.id as i64).unwrap_or(-1);

    loop {
        if *cancelled.borrow() {
            debug!(slice = slice_label, "slice cancelled");
            return Ok(());
        }

        let response = source
            .search(
                &snapshot_id,
                &query,
                slice,
                config.page_size,
                search_after.clone(),
                config.request_timeout,
                config.keep_alive,
            )
            .await?;

        let page_len = response.hits.len();
        if page_len == 0 {
            break;
        }
        slice_hits += page_len as u64;

        debug!(slice = slice_label, hits = page_len, "fetched page");

        if tx.send(response.hits).await.is_err() {
            // Coordinator dropped its receiver (cancellation or shutdown).
            return Ok(());
        }

        snapshot_id = response.refreshed_snapshot_id;
        search_after = response.next_sort_key;

        if page_len < config.page_size {
            break;
        }
    }

    info!(slice = slice_label, hits = slice_hits, "slice drained");
    Ok(())
}
