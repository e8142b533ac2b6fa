use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use console::style;

use boardsync::client::{BoardApi, HttpBoardApi};
use boardsync::config::SyncConfig;
use boardsync::coordinator::{MoveOutcome, MutationCoordinator};
use boardsync::gate::ApprovalGate;
use boardsync::models::{CreateTaskRequest, Priority, TaskStatus, UpdateTaskRequest};
use boardsync::session::BoardSession;
use boardsync::store::BoardStore;

#[derive(Parser)]
#[command(name = "boardsync")]
#[command(version, about = "Task board sync client")]
struct Cli {
    /// Base URL of the board API (overrides BOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Push channel URL (overrides BOARD_WS_URL)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print the current board
    Board,
    /// Print the server-generated board summary
    Summary,
    /// Create a task
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "todo")]
        status: String,
        /// Assignee team-member id
        #[arg(long)]
        assignee: i64,
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due timestamp, RFC 3339 (e.g. 2026-09-01T17:00:00Z)
        #[arg(long)]
        due: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Update fields on an existing task
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long)]
        order: Option<i32>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Move a task to another column
    Move { id: i64, status: String },
    /// Queue a task deletion for approval
    Delete { id: i64 },
    /// List pending agent-proposed changes
    Pending,
    /// Approve pending changes by id
    Approve {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Run a live session: follow push updates until interrupted
    Watch,
}

struct Ctx {
    store: Arc<BoardStore>,
    coordinator: MutationCoordinator,
    gate: ApprovalGate,
}

impl Ctx {
    fn build(config: &SyncConfig) -> Result<Self> {
        let api: Arc<dyn BoardApi> = Arc::new(HttpBoardApi::new(config)?);
        let store = Arc::new(BoardStore::new());
        let coordinator = MutationCoordinator::new(api.clone(), store.clone());
        let gate = ApprovalGate::new(api);
        Ok(Self {
            store,
            coordinator,
            gate,
        })
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "boardsync=debug"
    } else {
        "boardsync=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    s.parse::<TaskStatus>().map_err(|e| anyhow!(e))
}

fn parse_priority(s: &str) -> Result<Priority> {
    s.parse::<Priority>().map_err(|e| anyhow!(e))
}

fn parse_due(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid due timestamp: {}", s))
}

fn print_board(store: &BoardStore) -> Result<()> {
    let columns = store.columns()?;
    for column in &columns {
        println!(
            "{} ({})",
            style(&column.title).bold(),
            column.tasks.len()
        );
        for task in &column.tasks {
            let due = task
                .due_date
                .map(|d| format!(" due {}", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            println!(
                "  #{:<4} {} [{}] @{}{}",
                task.id,
                task.title,
                task.priority,
                task.assignee.name,
                due
            );
        }
    }
    if let Some(synced) = store.last_synced()? {
        println!("{}", style(format!("synced {}", synced.format("%Y-%m-%d %H:%M:%S"))).dim());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = SyncConfig::resolve(cli.api_url.clone(), cli.ws_url.clone());

    match cli.command {
        Commands::Board => {
            let ctx = Ctx::build(&config)?;
            ctx.coordinator.refresh().await?;
            print_board(&ctx.store)?;
        }
        Commands::Summary => {
            let api = HttpBoardApi::new(&config)?;
            println!("{}", api.board_summary().await?);
        }
        Commands::Create {
            title,
            description,
            status,
            assignee,
            priority,
            due,
            tags,
        } => {
            let ctx = Ctx::build(&config)?;
            let req = CreateTaskRequest {
                title,
                description,
                status: parse_status(&status)?,
                assignee_id: assignee,
                due_date: due.as_deref().map(parse_due).transpose()?,
                priority: parse_priority(&priority)?,
                order: None,
                tags,
            };
            let created = ctx.coordinator.create_task(&req).await?;
            println!(
                "Created task #{} {} in {}",
                created.id,
                style(&created.title).bold(),
                created.status
            );
        }
        Commands::Update {
            id,
            title,
            description,
            status,
            priority,
            assignee,
            order,
            due,
        } => {
            let patch = UpdateTaskRequest {
                title,
                description,
                status: status.as_deref().map(parse_status).transpose()?,
                assignee_id: assignee,
                due_date: due.as_deref().map(parse_due).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                order,
                tags: None,
            };
            if patch.is_empty() {
                return Err(anyhow!("Nothing to update: pass at least one field flag"));
            }
            let ctx = Ctx::build(&config)?;
            ctx.coordinator.refresh().await?;
            let updated = ctx.coordinator.update_task(id, &patch).await?;
            println!("Updated task #{} {}", updated.id, style(&updated.title).bold());
        }
        Commands::Move { id, status } => {
            let target = parse_status(&status)?;
            let ctx = Ctx::build(&config)?;
            ctx.coordinator.refresh().await?;
            match ctx.coordinator.move_task(id, target).await? {
                MoveOutcome::Moved => println!("Moved task #{} to {}", id, target),
                MoveOutcome::AlreadyThere => {
                    println!("Task #{} is already in {}", id, target)
                }
            }
        }
        Commands::Delete { id } => {
            let ctx = Ctx::build(&config)?;
            ctx.coordinator.refresh().await?;
            let ack = ctx.coordinator.delete_task(id).await?;
            println!("{}", ack.message);
        }
        Commands::Pending => {
            let ctx = Ctx::build(&config)?;
            ctx.gate.refresh().await?;
            let pending = ctx.gate.pending()?;
            if pending.is_empty() {
                println!("No pending changes");
            } else {
                println!("{} pending change(s):", pending.len());
                for change in pending {
                    let task_ref = change
                        .task_id
                        .map(|id| format!(" task #{}", id))
                        .unwrap_or_default();
                    println!(
                        "  #{:<4} {}{} — {}",
                        change.id,
                        change.change_type,
                        task_ref,
                        change.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Commands::Approve { ids } => {
            let ctx = Ctx::build(&config)?;
            ctx.coordinator.refresh().await?;
            ctx.gate.refresh().await?;
            let ack = ctx.gate.approve(&ids, &ctx.coordinator).await?;
            println!("{}", ack.message);
            println!("{} change(s) still pending", ctx.gate.pending_count()?);
        }
        Commands::Watch => {
            let session = BoardSession::start(&config)
                .await
                .context("Failed to start board session")?;
            print_board(session.store())?;
            println!(
                "{}",
                style("Watching for updates (ctrl-c to stop)...").dim()
            );

            let mut printed_activity = 0usize;
            let mut last_synced = session.store().last_synced()?;
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        let total = session.activity().total();
                        if total > printed_activity {
                            for entry in session.activity().recent(total - printed_activity) {
                                println!("{} {}", style(entry.at.format("%H:%M:%S")).dim(), entry.message);
                            }
                            printed_activity = total;
                        }

                        let synced = session.store().last_synced()?;
                        if synced != last_synced {
                            last_synced = synced;
                            println!();
                            print_board(session.store())?;
                        }
                    }
                }
            }
            session.shutdown().await;
        }
    }

    Ok(())
}
