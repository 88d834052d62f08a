mod job;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finisher_core::{
    load_config, validate_config, Config, HttpCoverFetcher, ItemStatus, PlaylistCompletionCache,
    PlaylistManifestWriter, PostProcessor, ProcessExecutor, SharedQueue,
};

use job::{load_job, FailedItem, Summary};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, env = "FINISHER_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write manifests for playlists a previous run finished but never wrote
    Recover,

    /// Post-process every item listed in a JSON job file
    Process {
        /// Path to the job file
        job: PathBuf,

        /// Print a Prometheus metrics snapshot to stderr when done
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Tool: {:?}", config.tool.path);
    info!("Playlist cache: {:?}", config.playlist.cache_dir);

    match args.command {
        Command::Recover => recover(&config).await,
        Command::Process { job, metrics } => {
            process(&config, &job).await?;
            if metrics {
                let text = finisher_core::metrics::encode_metrics()
                    .context("Failed to encode metrics")?;
                eprint!("{}", text);
            }
            Ok(())
        }
    }
}

async fn recover(config: &Config) -> Result<()> {
    let cache = Arc::new(PlaylistCompletionCache::from_config(&config.playlist));
    let writer = PlaylistManifestWriter::new(config.playlist.clone(), cache);

    // Nothing is queued in a fresh process, so only records whose expected
    // total is met can be written.
    let written = writer.recover_all(&SharedQueue::new()).await;
    for key in &written {
        info!("Recovered manifest for playlist {}", key);
    }
    info!("Recovery finished, {} manifest(s) written", written.len());
    Ok(())
}

async fn process(config: &Config, job_path: &Path) -> Result<()> {
    let job = load_job(job_path)?;
    info!("Loaded {} item(s) from {:?}", job.items.len(), job_path);

    let queue = Arc::new(SharedQueue::new());
    let fetcher = HttpCoverFetcher::new(config.thumbnail.fetch_timeout_secs)
        .context("Failed to create cover fetcher")?;
    for warning in tag_library_warnings(config) {
        warn!("No tag library available, {}", warning);
    }

    let processor = Arc::new(PostProcessor::from_config(
        config,
        queue.clone(),
        Arc::new(ProcessExecutor::new()),
        Arc::new(fetcher),
        None,
    ));
    info!("Stages: {}", processor.stage_names().join(", "));

    // Enqueue everything first so playlist completion sees every member.
    let work: Vec<_> = job
        .items
        .into_iter()
        .map(|entry| {
            let mut item = entry.item;
            item.item_status = ItemStatus::PostProcessing;
            let local_id = queue.insert(item);
            (local_id, entry.metadata, entry.already_exists)
        })
        .collect();

    let semaphore = Arc::new(Semaphore::new(config.pipeline.max_parallel_workers));
    let tasks = work.into_iter().map(|(local_id, metadata, already_exists)| {
        let processor = Arc::clone(&processor);
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .context("Worker pool closed")?;
            let result = if already_exists {
                processor.mark_already_exists(&local_id, &metadata).await
            } else {
                processor.process(&local_id, &metadata).await
            };
            Ok::<_, anyhow::Error>((local_id, already_exists, result))
        }
    });

    let mut summary = Summary::default();
    for outcome in futures::future::join_all(tasks).await {
        let (local_id, already_exists, result) = outcome?;
        match result {
            Ok(outcome) => {
                if already_exists {
                    summary.already_existed += 1;
                } else {
                    summary.processed += 1;
                }
                if outcome.manifest_written {
                    summary.manifests_written += 1;
                }
            }
            Err(e) => {
                error!("Item {} failed: {}", local_id, e);
                summary.failed.push(FailedItem {
                    local_id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Processed {} item(s), {} already existed, {} failed, {} manifest(s) written",
        summary.processed,
        summary.already_existed,
        summary.failed.len(),
        summary.manifests_written
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );
    Ok(())
}

/// What the run loses because no tag library is linked into this binary.
fn tag_library_warnings(config: &Config) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.pipeline.raw_media_download {
        return warnings;
    }
    if config.thumbnail.compatibility_mode {
        warnings.push("compatibility mode falls back to the external tool");
    }
    if config.thumbnail.embed_cover {
        warnings.push("covers will not be embedded in .ogg files");
    }
    warnings.push("MP3 comment, URL, lyrics and compilation tags stay in TXXX frames");
    warnings
}
