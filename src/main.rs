use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regression_locator::analyzer;
use regression_locator::cli::{Args, Config, SourceSelection};
use regression_locator::graph::sqlite::SqliteGraphStore;
use regression_locator::graph::GraphStore;
use regression_locator::pipeline::ingest_window;
use regression_locator::report;
use regression_locator::settings::{IngestSettings, ScanSettings};
use regression_locator::span::SpanPath;
use regression_locator::trace_source::elasticsearch::ElasticsearchSource;
use regression_locator::trace_source::TraceSource;

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "regression_locator=trace"
    } else {
        "regression_locator=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("{e:?}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::open(&config.database_path)?);
    store.create_schema().await?;

    let already_populated = store.is_populated().await?;

    match &config.source {
        SourceSelection::PrePopulated(path) => {
            info!(path = %path.display(), "analyzing pre-populated store, ingestion skipped");
        }
        _ if already_populated => {
            info!(path = %config.database_path.display(), "database already populated, ingestion skipped");
        }
        SourceSelection::Single(url) => {
            let source: Arc<dyn TraceSource> = Arc::new(ElasticsearchSource::new(url));
            ping_or_exit(source.as_ref(), url).await;
            run_both_windows(source.clone(), source, store.clone(), &config).await?;
        }
        SourceSelection::Dual { baseline, mutant } => {
            let baseline_source: Arc<dyn TraceSource> = Arc::new(ElasticsearchSource::new(baseline));
            let mutant_source: Arc<dyn TraceSource> = Arc::new(ElasticsearchSource::new(mutant));
            ping_or_exit(baseline_source.as_ref(), baseline).await;
            ping_or_exit(mutant_source.as_ref(), mutant).await;
            run_both_windows(baseline_source, mutant_source, store.clone(), &config).await?;
        }
    }

    let results = analyzer::analyze(
        store,
        SpanPath::root(config.span_name.clone()),
        config.baseline_window,
        config.mutant_window,
        config.threshold,
    )
    .await?;

    print!("{}", report::render(&results));

    Ok(())
}

/// Runs the baseline ingestion pass against `baseline_source` and the
/// mutant pass against `mutant_source` (the same instance, for
/// `--elastic`; two distinct instances for `--baseline-elastic`/
/// `--mutant-elastic`). Sequential, not concurrent: analysis only needs
/// both passes done, not overlapping, and running them one after another
/// keeps each pass's own slice-level parallelism the only concurrency in
/// play.
async fn run_both_windows(
    baseline_source: Arc<dyn TraceSource>,
    mutant_source: Arc<dyn TraceSource>,
    store: Arc<dyn GraphStore>,
    config: &Config,
) -> anyhow::Result<()> {
    ingest_window(
        baseline_source,
        store.clone(),
        &config.index_pattern,
        config.service_name.as_deref(),
        config.baseline_window,
        ScanSettings::default(),
        IngestSettings::default(),
    )
    .await?;
    ingest_window(
        mutant_source,
        store,
        &config.index_pattern,
        config.service_name.as_deref(),
        config.mutant_window,
        ScanSettings::default(),
        IngestSettings::default(),
    )
    .await?;
    Ok(())
}

async fn ping_or_exit(source: &dyn TraceSource, url: &str) {
    if let Err(e) = source.ping().await {
        eprintln!("Call to trace backend failed. Are you sure it is running at {url}?\n{e}");
        std::process::exit(1);
    }
}
