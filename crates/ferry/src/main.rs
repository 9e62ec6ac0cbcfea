//! ferry — bulk upload local photos and videos to an Immich-style server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use ferry_core::config::FerryConfig;
use ferry_services::{
    scan_roots, ClientSettings, DedupRegistry, Dispatcher, ImmichClient, RemoteAssetService,
    RunSummary, UploadContext, WorkerPool,
};

/// Upload local media to the server, skipping what's already there.
#[derive(Parser, Debug)]
#[command(name = "ferry", version)]
struct Cli {
    /// Server address (http://<your-ip>:2283/api or https://<your-domain>/api)
    #[arg(long)]
    server: Option<String>,

    /// API key
    #[arg(long)]
    key: Option<String>,

    /// Explore sub-folders
    #[arg(long)]
    recursive: bool,

    /// Assume yes on all interactive prompts
    #[arg(long, action = clap::ArgAction::Set)]
    yes: Option<bool>,

    /// Number of concurrent upload workers (default: number of CPUs)
    #[arg(long)]
    threads: Option<u32>,

    /// Device id the server keys its inventory by (default: hostname)
    #[arg(long = "device-uuid")]
    device_uuid: Option<String>,

    /// Folders to upload
    paths: Vec<PathBuf>,
}

impl Cli {
    /// Flags win over env and file.
    fn apply(&self, config: &mut FerryConfig) {
        if let Some(server) = &self.server {
            config.server.endpoint = server.clone();
        }
        if let Some(key) = &self.key {
            config.server.api_key = key.clone();
        }
        if let Some(device) = &self.device_uuid {
            config.server.device_id = device.clone();
        }
        if let Some(threads) = self.threads {
            config.upload.workers = threads;
        }
        if let Some(yes) = self.yes {
            config.upload.assume_yes = yes;
        }
        if self.recursive {
            config.upload.recursive = true;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Err(e) = FerryConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });
    cli.apply(&mut config);
    config.validate(&cli.paths)?;

    if config.server.device_id.is_empty() {
        config.server.device_id = nix::unistd::gethostname()
            .context("can't determine hostname, pass --device-uuid")?
            .to_string_lossy()
            .into_owned();
    }

    let client = Arc::new(ImmichClient::new(
        &config.server.endpoint,
        &config.server.api_key,
        &config.server.device_id,
        ClientSettings::from(&config.upload),
    )?);

    client.ping().await.context("server is not reachable")?;
    tracing::info!("server status: OK");

    let user = client.validate_connection().await?;
    tracing::info!(user = %user.email, "connected");

    tracing::info!(device = %config.server.device_id, "indexing assets...");
    let known = client
        .list_known_fingerprints(&config.server.device_id)
        .await?;
    let registry = DedupRegistry::seeded(known);

    let candidates = scan_roots(&cli.paths, config.upload.recursive)?;
    let fresh = candidates
        .iter()
        .filter(|a| !registry.contains(&a.id))
        .count();
    if fresh == 0 {
        tracing::warn!("no new local assets found, exiting");
        return Ok(());
    }
    tracing::info!(count = fresh, "indexing complete, local assets to upload");

    if !config.upload.assume_yes && !confirm("Do you want to start upload now? (y/n) ").await? {
        anyhow::bail!("upload aborted");
    }

    let mut pool = WorkerPool::new(config.upload.effective_queue_capacity());
    pool.start(config.upload.effective_workers())?;

    let ctx = UploadContext::new(client, registry);
    let summary = Dispatcher::new(ctx, pool)
        .run(futures::stream::iter(candidates))
        .await?;

    report(&summary);
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read answer")?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

fn report(summary: &RunSummary) {
    let o = &summary.outcomes;
    println!("═══════════════════════════════════════");
    println!("  Upload Summary");
    println!("═══════════════════════════════════════");
    println!("  Uploaded            : {}", o.uploaded);
    println!("  Already on server   : {}", summary.skipped_known + o.skipped_claimed);
    println!("  Unsupported         : {}", o.skipped_unsupported);
    println!("  Failed              : {}", o.failed_other + o.failed_fatal);
    if summary.stopped_early {
        tracing::warn!(
            uploaded = o.uploaded,
            "too many server errors, run stopped early"
        );
    }
}
