//! Parallel Scan Coordinator: fans out one Slice Scanner per partition and
//! merges their page outputs into a single unordered stream. The merge is a
//! plain `tokio::mpsc` fan-in — every slice task holds a clone of the same
//! `Sender`, so pages interleave fairly in arrival order across slices
//! without any extra scheduling logic.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use super::slice_scanner::{scan_slice, SliceScannerConfig};
use crate::error::TraceSourceError;
use crate::settings::ScanSettings;
use crate::trace_source::{Page, SliceSpec, TraceSource};

pub struct ScanCoordinator {
    source: Arc<dyn TraceSource>,
    settings: ScanSettings,
}

/// A running scan: pages arrive on `pages`; once it closes, `await`ing
/// `outcome` reports whether every slice drained cleanly or the scan was
/// aborted by a fatal slice error (in which case the remaining slices were
/// already cancelled).
pub struct Scan {
    pub pages: mpsc::Receiver<Page>,
    pub outcome: JoinHandle<Result<(), TraceSourceError>>,
}

impl ScanCoordinator {
    pub fn new(source: Arc<dyn TraceSource>, settings: ScanSettings) -> Self {
        Self { source, settings }
    }

    /// Scans `query` against `snapshot_id`. Spawns `M` slice tasks, where
    /// `M` is the backend's data-node count (`M == 1` runs a single
    /// unsliced scan). If any slice fails fatally, cancels the rest; the
    /// error surfaces through `Scan::outcome`.
    pub async fn scan(&self, query: Value, snapshot_id: String) -> Result<Scan, TraceSourceError> {
        let node_count = self.source.node_count().await?;
        let slice_count = node_count.max(1);

        // Bound in-flight pages to a small constant multiple of slice count
        // so a slow graph-store write applies back-pressure to the scan.
        let (tx, rx) = mpsc::channel::<Page>(slice_count as usize * 4);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let mut tasks = JoinSet::new();
        let specs: Vec<Option<SliceSpec>> = if slice_count == 1 {
            vec![None]
        } else {
            (0..slice_count)
                .map(|id| Some(SliceSpec { id, max: slice_count }))
                .collect()
        };

        info!(slice_count, "starting parallel scan");

        for spec in specs {
            let source = self.source.clone();
            let query = query.clone();
            let snapshot_id = snapshot_id.clone();
            let tx = tx.clone();
            let cancel_rx = cancel_rx.clone();
            let config = SliceScannerConfig {
                page_size: self.settings.page_size,
                request_timeout: self.settings.request_timeout,
                keep_alive: self.settings.keep_alive,
            };
            tasks.spawn(scan_slice(source, query, snapshot_id, spec, config, tx, cancel_rx));
        }
        // Drop our own sender so the channel closes once every slice task's
        // clone has been dropped (i.e. when all slices finish).
        drop(tx);

        let outcome = tokio::spawn(async move {
            let mut first_error = None;
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(error = %e, "slice scanner failed, cancelling siblings");
                        let _ = cancel_tx.send(true);
                        first_error.get_or_insert(e);
                    }
                    Err(join_err) => {
                        error!(error = %join_err, "slice task panicked, cancelling siblings");
                        let _ = cancel_tx.send(true);
                        first_error.get_or_insert(TraceSourceError::MalformedResponse(join_err.to_string()));
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        Ok(Scan { pages: rx, outcome })
    }
}
