//! registry-node: command-line front end for the vault registry
//!
//! Loads a YAML deployment config, deploys one network's registry
//! (restoring its snapshot when present) and runs a subcommand:
//! - `init` writes the initial snapshot
//! - `apply` submits a JSON batch of calls
//! - `show` prints the current state

mod report;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use registry_service::{parse_batch, Deployments, ServiceConfig, TracingSink};

#[derive(Parser)]
#[command(name = "registry-node")]
#[command(about = "Command-line front end for the vault registry")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "registry.yaml", env = "REGISTRY_CONFIG")]
    config: PathBuf,

    /// Network to operate on
    #[arg(short, long, default_value = "eth", env = "REGISTRY_NETWORK")]
    network: String,

    /// Snapshot directory (overrides config file)
    #[arg(long, env = "REGISTRY_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the network's registry and write its snapshot
    Init {
        /// Replace an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Submit a JSON array of calls
    Apply {
        /// Path to the calls file
        calls: PathBuf,
        /// Continue past rejected calls
        #[arg(long)]
        keep_going: bool,
    },
    /// Print the registry state as JSON
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registry_node=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(config = %cli.config.display(), network = %cli.network, "Starting registry-node");

    let mut config = ServiceConfig::from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = Some(state_dir);
    }

    match cli.command {
        Command::Init { force } => init(config, &cli.network, force).await,
        Command::Apply { calls, keep_going } => apply(config, &cli.network, calls, keep_going).await,
        Command::Show => show(config, &cli.network).await,
    }
}

async fn init(config: ServiceConfig, network: &str, force: bool) -> anyhow::Result<()> {
    match config.state_path(network) {
        Some(path) if path.exists() => {
            if !force {
                bail!("snapshot {} already exists; pass --force to replace it", path.display());
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("removing {}", path.display()))?;
            warn!(path = %path.display(), "Existing snapshot removed");
        }
        Some(_) => {}
        None => warn!("No state directory configured; nothing will be persisted"),
    }

    let deployments = Deployments::new(config);
    let service = deployments.deploy(network).await?;
    service.save().await?;

    let hash = service.state_hash().await?;
    info!(network, state_hash = %hash, "Registry initialized");
    println!("{hash}");
    Ok(())
}

async fn apply(
    config: ServiceConfig,
    network: &str,
    calls: PathBuf,
    keep_going: bool,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&calls)
        .with_context(|| format!("reading calls {}", calls.display()))?;
    let batch = parse_batch(&json).with_context(|| format!("parsing calls {}", calls.display()))?;

    let deployments = Deployments::new(config).with_sink(std::sync::Arc::new(TracingSink));
    let service = deployments.deploy(network).await?;

    let mut rejected = 0usize;
    for (index, request) in batch.into_iter().enumerate() {
        let op = request.call.name();
        let caller = request.caller;
        match service.submit_request(request).await {
            Ok(receipt) => println!("{}", report::receipt_line(index, op, &receipt)?),
            Err(e) => {
                println!("{}", report::rejection_line(index, op, &e)?);
                if !keep_going {
                    bail!("call {index} ({op}) from {caller} rejected: {e}");
                }
                rejected += 1;
            }
        }
    }

    info!(network, rejected, published = service.published(), "Batch applied");
    if rejected > 0 {
        bail!("{rejected} call(s) rejected");
    }
    let persistence = service.persistence().await;
    if persistence.failures > 0 {
        bail!(
            "{} snapshot write(s) failed; last error: {}",
            persistence.failures,
            persistence.last_error.unwrap_or_default()
        );
    }
    Ok(())
}

async fn show(config: ServiceConfig, network: &str) -> anyhow::Result<()> {
    let deployments = Deployments::new(config);
    let service = deployments.deploy(network).await?;
    let state_hash = service.state_hash().await?;

    let summary = service
        .query(|registry| report::summary(network, registry, &state_hash))
        .await;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
