//! Wires the leaf components into one ingestion pass: open a snapshot,
//! fan out the parallel scan, ingest every page, close the snapshot. One
//! call of `ingest_window` corresponds to one {baseline, mutant} pass.

use std::sync::Arc;

use tracing::{error, info};

use crate::duration::Window;
use crate::error::IngestError;
use crate::es_query::build_query;
use crate::graph::GraphStore;
use crate::ingest::run_ingestion;
use crate::scan::ScanCoordinator;
use crate::settings::{IngestSettings, ScanSettings};
use crate::trace_source::TraceSource;

pub async fn ingest_window(
    source: Arc<dyn TraceSource>,
    store: Arc<dyn GraphStore>,
    index_pattern: &str,
    service_name: Option<&str>,
    window: Window,
    scan_settings: ScanSettings,
    ingest_settings: IngestSettings,
) -> Result<u64, IngestError> {
    source.ping().await?;

    let snapshot_id = source
        .open_snapshot(index_pattern, scan_settings.keep_alive)
        .await?;

    let query = build_query(service_name, window);

    let scan_result = async {
        let scan = ScanCoordinator::new(source.clone(), scan_settings.clone())
            .scan(query, snapshot_id.clone())
            .await?;

        let ingested = run_ingestion(store.clone(), scan.pages, ingest_settings.workers).await?;

        scan.outcome
            .await
            .map_err(|e| IngestError::WorkerPanicked(e.to_string()))??;

        Ok::<u64, IngestError>(ingested)
    }
    .await;

    // Snapshot close is best-effort: a failed ingestion pass must not leak
    // the snapshot, but a close failure shouldn't mask the real error.
    if let Err(e) = source.close_snapshot(&snapshot_id).await {
        error!(error = %e, "failed to close snapshot");
    }

    match &scan_result {
        Ok(count) => info!(ingested = count, "ingestion pass complete"),
        Err(e) => error!(error = %e, "ingestion pass failed"),
    }

    scan_result
}
