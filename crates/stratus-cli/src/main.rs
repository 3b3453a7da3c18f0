//! Stratus command line interface
//!
//! Drives the full workflow against a workspace: ensure a compute pool,
//! submit a sweep, poll it to completion, report the best run, download its
//! outputs, and optionally tear the pool down.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stratus_auth::{CredentialManager, Workspace, WorkspaceProfile};
use stratus_client::{
    ComputeSpec, LocalPlatform, Platform, RestPlatform, StratusClient,
};
use stratus_config::{Config, ConfigLoader};
use stratus_core::run::{RunId, RunRecord, RunStatus};
use stratus_core::sweep::SweepSpec;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(version = stratus_client::VERSION)]
#[command(about = "Submit distributed training sweeps to a managed ML workspace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to .stratus/config.yaml, then ~/.stratus/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run against the in-memory platform instead of the workspace
    #[arg(long, global = true)]
    local: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a sweep described by a YAML file and drive it to completion
    Submit {
        /// Sweep description file
        sweep_file: PathBuf,

        /// VM size for the compute pool
        #[arg(long, default_value = "gpu-4x-v100")]
        vm_size: String,

        /// Minimum node count for the compute pool
        #[arg(long, default_value_t = 0)]
        min_nodes: u32,

        /// Maximum node count for the compute pool
        #[arg(long, default_value_t = 4)]
        max_nodes: u32,

        /// Directory to download the best run's outputs into
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Delete the compute pool after the sweep finishes
        #[arg(long)]
        down: bool,

        /// Validate and print the plan without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the status of a run
    Status {
        /// Run ID
        run_id: String,
    },

    /// List the child runs of a sweep
    Runs {
        /// Parent sweep run ID
        run_id: String,
    },

    /// Show the metrics recorded on a run
    Metrics {
        /// Run ID
        run_id: String,
    },

    /// Download a run's output files
    Download {
        /// Run ID
        run_id: String,

        /// Destination directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Cancel a run
    Cancel {
        /// Run ID
        run_id: String,
    },

    /// Delete a compute pool
    ComputeDown {
        /// Compute pool name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref()).await?;
    let client = build_client(&config, cli.local).await?;

    match cli.command {
        Commands::Submit {
            sweep_file,
            vm_size,
            min_nodes,
            max_nodes,
            out,
            down,
            dry_run,
        } => {
            let compute = ComputeSpec::new(vm_size, min_nodes, max_nodes);
            let out = out.unwrap_or_else(|| PathBuf::from(&config.settings.download_dir));
            submit(&client, &config, sweep_file, compute, out, down, dry_run).await?;
        }
        Commands::Status { run_id } => {
            let record = client.run(&RunId::new(run_id)).await?;
            print_run(&record);
        }
        Commands::Runs { run_id } => {
            let handle_id = RunId::new(run_id);
            let parent = client.run(&handle_id).await?;
            print_run(&parent);
            let children = client.platform().list_children(&handle_id).await?;
            print_children(&children);
        }
        Commands::Metrics { run_id } => {
            let metrics = client.metrics(&RunId::new(run_id)).await?;
            if metrics.is_empty() {
                println!("  {}", "no metrics recorded".yellow());
            }
            for (name, value) in metrics {
                println!("  {} {:.6}", name.bright_white(), value);
            }
        }
        Commands::Download { run_id, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(&config.settings.download_dir));
            let written = client.download_outputs(&RunId::new(run_id), &out).await?;
            for path in &written {
                println!("  {}", path.display());
            }
            println!(
                "{}",
                format!("Downloaded {} file(s) to {}", written.len(), out.display())
                    .bright_green()
            );
        }
        Commands::Cancel { run_id } => {
            client.cancel(&RunId::new(run_id)).await?;
            println!("{}", "Run cancelled".bright_yellow());
        }
        Commands::ComputeDown { name } => {
            client.delete_compute(&name).await?;
            println!("{}", format!("Compute pool '{}' deleted", name).bright_green());
        }
    }

    Ok(())
}

async fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .await
            .with_context(|| format!("loading config from {}", path.display())),
        None => ConfigLoader::load_default()
            .await
            .context("loading default config"),
    }
}

async fn build_client(config: &Config, local: bool) -> anyhow::Result<StratusClient> {
    let platform: Arc<dyn Platform> = if local {
        Arc::new(LocalPlatform::new())
    } else {
        let workspace = resolve_workspace(config).await?;
        info!(workspace = workspace.name(), "Workspace resolved");
        Arc::new(RestPlatform::new(&workspace)?)
    };

    Ok(StratusClient::new(platform).with_poll_interval(config.settings.poll_interval()))
}

async fn resolve_workspace(config: &Config) -> anyhow::Result<Workspace> {
    let Some(settings) = &config.workspace else {
        bail!("no workspace configured; add a 'workspace' section to .stratus/config.yaml");
    };

    let profile = WorkspaceProfile::new(
        &settings.name,
        &settings.subscription_id,
        &settings.resource_group,
        &settings.endpoint,
    );

    let credentials = CredentialManager::new()
        .get()
        .await
        .context("resolving credentials")?;

    Ok(Workspace::resolve(profile, credentials)?)
}

async fn submit(
    client: &StratusClient,
    config: &Config,
    sweep_file: PathBuf,
    compute: ComputeSpec,
    out: PathBuf,
    down: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let yaml = tokio::fs::read_to_string(&sweep_file)
        .await
        .with_context(|| format!("reading {}", sweep_file.display()))?;
    let sweep = SweepSpec::from_yaml(&yaml)?;
    sweep.validate()?;

    let compute_name = sweep.job.compute_target().to_string();

    println!("{}", "Sweep plan".bright_cyan().bold());
    println!("  {} {}", "Entry script:".bright_white(), sweep.job.entry_script());
    println!("  {} {}", "Compute pool:".bright_white(), compute_name);
    println!(
        "  {} {} node(s) x {} process(es), {}",
        "Topology:".bright_white(),
        sweep.job.node_count(),
        sweep.job.process_count_per_node(),
        sweep.job.distributed()
    );
    println!(
        "  {} {} ({:?} sampling)",
        "Planned runs:".bright_white(),
        sweep.planned_runs(),
        sweep.sampling
    );
    println!(
        "  {} {} ({:?})",
        "Primary metric:".bright_white(),
        sweep.primary_metric.name,
        sweep.primary_metric.goal
    );

    if dry_run {
        println!("{}", "Dry run: nothing submitted".bright_yellow());
        return Ok(());
    }

    client.ensure_compute(&compute_name, &compute).await?;
    client
        .wait_for_compute(&compute_name, config.settings.compute_timeout())
        .await?;

    let handle = client.submit(&sweep).await?;
    println!(
        "{} {}",
        "Submitted sweep".bright_green().bold(),
        handle.id().to_string().bright_yellow()
    );

    let parent = handle.wait(config.settings.run_timeout()).await?;
    if parent.status != RunStatus::Completed {
        bail!("sweep finished in state '{}'", parent.status);
    }

    let children = handle.children().await?;
    print_children(&children);

    let best = handle.best_run().await?;
    println!();
    println!(
        "{} {}",
        "Best run:".bright_cyan().bold(),
        best.id.to_string().bright_yellow()
    );
    print_run(&best);

    let written = client.download_outputs(&best.id, &out).await?;
    println!(
        "{}",
        format!("Downloaded {} file(s) to {}", written.len(), out.display()).bright_green()
    );

    if down {
        client.delete_compute(&compute_name).await?;
        println!(
            "{}",
            format!("Compute pool '{}' deleted", compute_name).bright_green()
        );
    }

    Ok(())
}

fn status_label(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Queued => "QUEUED".yellow(),
        RunStatus::Preparing => "PREPARING".yellow(),
        RunStatus::Running => "RUNNING".bright_cyan(),
        RunStatus::Completed => "COMPLETED".bright_green(),
        RunStatus::Failed => "FAILED".bright_red(),
        RunStatus::Canceled => "CANCELED".bright_black(),
    }
}

fn print_run(record: &RunRecord) {
    println!("  {} {}", record.id.to_string().bright_white(), status_label(record.status));
    if !record.hyperparameters.is_empty() {
        let params: Vec<String> = record
            .hyperparameters
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        println!("    {}", params.join(" "));
    }
    for (name, value) in &record.metrics {
        println!("    {} {:.6}", name, value);
    }
}

fn print_children(children: &[RunRecord]) {
    println!();
    println!("{}", format!("Child runs ({})", children.len()).bright_cyan().bold());
    for child in children {
        print_run(child);
    }
}
