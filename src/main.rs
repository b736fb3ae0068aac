//! Tally - Checklist Progress Tracking
//!
//! Command-line entry point: scaffolding, status reporting, manual
//! completion, snapshot recompute, and the long-running watch session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use tally::config::TrackerConfig;
use tally::gitlog::GitLogReader;
use tally::progress::{CompletedBy, ProgressData};
use tally::reconciler::Reconciler;
use tally::review::LoggingReview;
use tally::session::{SessionContext, TrackerSession};
use tally::store::{DocumentStore, FsDocumentStore, SnapshotStore};
use tally::sync::{HttpSyncEndpoint, SyncDispatcher, SyncEndpoint};

/// Starter checklist written by `tally init`.
const CHECKLIST_TEMPLATE: &str = "\
# Project Tasks

- [ ] 1 Describe the first task
  - Add detail bullets below a task line
  _Requirements: 1.1_
- [ ] 2 Describe the second task
";

#[derive(Parser)]
#[command(name = "tally")]
#[command(version = "0.1.0")]
#[command(about = "Checklist progress tracking with automatic completion detection", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter checklist document
    Init,

    /// Print the persisted progress snapshot
    Status,

    /// Recompute the snapshot from the current checklist
    Recompute,

    /// Mark a task complete by its identifier
    Complete {
        /// Task identifier, e.g. "3.2" or "task-7"
        task_id: String,
    },

    /// Watch the project and infer completions until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "tally=debug,info"
    } else {
        "tally=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let config = TrackerConfig::load(&project_path)?;
    let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(&project_path));

    match cli.command {
        Commands::Init => init(&config, store.as_ref()),
        Commands::Status => status(&config, store),
        Commands::Recompute => {
            let reconciler = build_reconciler(&config, &store);
            let snapshot = reconciler.recompute_and_persist().await?;
            print_snapshot(&snapshot);
            Ok(())
        }
        Commands::Complete { task_id } => complete(&config, store, task_id).await,
        Commands::Watch => watch(config, store, &project_path).await,
    }
}

fn build_reconciler(config: &TrackerConfig, store: &Arc<dyn DocumentStore>) -> Reconciler {
    Reconciler::new(
        Arc::clone(store),
        config.checklist_path.clone(),
        config.snapshot_path.clone(),
    )
}

fn init(config: &TrackerConfig, store: &dyn DocumentStore) -> anyhow::Result<()> {
    if store.read_text(&config.checklist_path).is_ok() {
        println!(
            "{} Checklist already exists: {}",
            "Skipped:".yellow().bold(),
            config.checklist_path.display()
        );
        return Ok(());
    }
    store.write_text(&config.checklist_path, CHECKLIST_TEMPLATE)?;
    println!(
        "{} Created {}",
        "Done:".green().bold(),
        config.checklist_path.display()
    );
    Ok(())
}

fn status(config: &TrackerConfig, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    let snapshots = SnapshotStore::new(store, config.snapshot_path.clone());
    match snapshots.load()? {
        Some(snapshot) => print_snapshot(&snapshot),
        None => println!(
            "{} No snapshot yet; run {} first",
            "Empty:".yellow().bold(),
            "tally recompute".bold()
        ),
    }
    Ok(())
}

async fn complete(
    config: &TrackerConfig,
    store: Arc<dyn DocumentStore>,
    task_id: String,
) -> anyhow::Result<()> {
    let text = store.read_text(&config.checklist_path)?;
    let tasks = tally::checklist::parse(&text);
    let title = tasks
        .iter()
        .find(|task| task.id == task_id)
        .map(|task| task.title.clone())
        .unwrap_or_else(|| task_id.clone());

    let reconciler = build_reconciler(config, &store);
    let snapshot = reconciler
        .apply_completion(&task_id, &title, CompletedBy::Manual)
        .await?;

    println!("{} Task {} marked complete", "Done:".green().bold(), task_id.bold());
    print_snapshot(&snapshot);
    Ok(())
}

async fn watch(
    config: TrackerConfig,
    store: Arc<dyn DocumentStore>,
    project_path: &Path,
) -> anyhow::Result<()> {
    let sync_endpoint: Option<Arc<dyn SyncEndpoint>> = match &config.sync_url {
        Some(url) => Some(Arc::new(HttpSyncEndpoint::new(url.clone())?)),
        None => None,
    };
    let reconciler = Arc::new(build_reconciler(&config, &store));
    let sync = Arc::new(SyncDispatcher::new(
        config.project_id.clone(),
        sync_endpoint,
    ));

    println!(
        "{} Watching {} (checklist: {})",
        "Tracking:".green().bold(),
        project_path.display(),
        config.checklist_path.display()
    );
    println!("Press Ctrl-C to stop.");

    let session = TrackerSession::start(SessionContext {
        store,
        reconciler,
        commit_log: Arc::new(GitLogReader::new(project_path)),
        review: Arc::new(LoggingReview),
        sync,
        config,
    });

    tokio::signal::ctrl_c().await?;
    println!("\n{} Stopping tracker", "Shutdown:".yellow().bold());
    session.stop().await;
    Ok(())
}

fn print_snapshot(snapshot: &ProgressData) {
    println!();
    println!(
        "  {} {}/{} tasks ({}%)",
        "Progress:".bold(),
        snapshot.completed_tasks,
        snapshot.total_tasks,
        snapshot.percentage
    );
    println!(
        "  {} {}",
        "Updated:".bold(),
        snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !snapshot.recent_activity.is_empty() {
        println!("  {}", "Recent activity:".bold());
        for item in &snapshot.recent_activity {
            let marker = match item.completed_by {
                CompletedBy::Manual => "manual".cyan(),
                CompletedBy::AutoDetection => "auto".green(),
            };
            println!(
                "    [{}] {} {} ({})",
                marker,
                item.task_id.bold(),
                item.title,
                item.completed_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    if !snapshot.milestones.is_empty() {
        println!("  {}", "Milestones:".bold());
        for milestone in &snapshot.milestones {
            println!(
                "    {} {}% (target {})",
                milestone.name.bold(),
                milestone.progress,
                milestone.target_date.format("%Y-%m-%d")
            );
        }
    }
    println!();
}
