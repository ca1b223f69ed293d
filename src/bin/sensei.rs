//! sensei CLI — operator interface to the Sensei task core.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

use sensei_core::config::Config;
use sensei_core::model::{
    CanonicalId, CheckIn, CreationMethod, DomainId, MeasureType, NewTaskRequest, ProjectId,
    TaskId, TaskStatus,
};
use sensei_core::oracle::GeminiOracle;
use sensei_core::store::{PgStore, TaskStore};
use sensei_core::tasks::TaskService;
use sensei_core::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "sensei", about = "Canonical-task tracking core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Project operations
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Domain operations
    Domain {
        #[command(subcommand)]
        action: DomainAction,
    },
    /// Task operations
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Canonical task operations
    Canonical {
        #[command(subcommand)]
        action: CanonicalAction,
    },
    /// Link orphaned task instances to canonical tasks
    Repair {
        /// Project ID
        project: ProjectId,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List projects
    List,
}

#[derive(Subcommand)]
enum DomainAction {
    /// Create a domain in a project
    Add { project: ProjectId, name: String },
    /// List domains in a project
    List { project: ProjectId },
}

#[derive(Subcommand)]
enum CanonicalAction {
    /// Replace the notes on a canonical task (the only editable field)
    Notes {
        id: CanonicalId,
        /// New notes; omit to clear
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a canonical task, unlinking (not deleting) its instances
    Delete { id: CanonicalId },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Log a new task (linked to a canonical task when possible)
    Add {
        project: ProjectId,
        domain: DomainId,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Version label scoping canonical matching
        #[arg(long)]
        version: Option<String>,
        /// How progress is measured (unit | percentage | status | revisions)
        #[arg(long)]
        measure_type: Option<MeasureType>,
        #[arg(long)]
        measure_unit: Option<String>,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        timebox: Option<f64>,
        /// Timebox unit ("mins", "hrs")
        #[arg(long)]
        timebox_unit: Option<String>,
        /// Scheduled date (YYYY-MM-DD); omit for backlog
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List tasks in a project
    List {
        project: ProjectId,
        /// Only undated (backlog) tasks
        #[arg(long)]
        backlog: bool,
    },
    /// Show a task
    Show { id: TaskId },
    /// Move a task to a new status
    Status { id: TaskId, status: TaskStatus },
    /// Check a task in as completed
    Complete {
        id: TaskId,
        /// Actual time spent, in minutes
        #[arg(long)]
        minutes: Option<f64>,
        /// What actually got done
        #[arg(long)]
        work: Option<String>,
    },
    /// Delete a task (its canonical task stays)
    Delete { id: TaskId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "sensei".to_string(),
    })?;

    let store = Arc::new(PgStore::connect(config.database_url.expose_secret()).await?);
    store.migrate().await?;

    let oracle = Arc::new(GeminiOracle::new(
        &config.gemini_api_key,
        &config.oracle_model,
    )?);
    let service = TaskService::new(store.clone(), oracle);
    let owner = config.user_id;

    match cli.command {
        Command::Project { action } => match action {
            ProjectAction::Add { name, description } => {
                let project = store
                    .insert_project(owner, &name, description.as_deref())
                    .await?;
                println!("Created project {} ({})", project.name, project.id);
            }
            ProjectAction::List => {
                for p in store.list_projects(owner).await? {
                    println!(
                        "{}  {}  {}",
                        p.id,
                        p.name,
                        p.description.as_deref().unwrap_or("-")
                    );
                }
            }
        },
        Command::Domain { action } => match action {
            DomainAction::Add { project, name } => {
                let domain = store.insert_domain(owner, project, &name).await?;
                println!("Created domain {} ({})", domain.name, domain.id);
            }
            DomainAction::List { project } => {
                for d in store.list_domains(owner, project).await? {
                    println!("{}  {}", d.id, d.name);
                }
            }
        },
        Command::Task { action } => cmd_task(&service, &*store, owner, action).await?,
        Command::Canonical { action } => match action {
            CanonicalAction::Notes { id, notes } => {
                let canonical = store
                    .update_canonical_notes(owner, id, notes.as_deref())
                    .await?;
                println!(
                    "Updated notes on \"{}\" ({})",
                    canonical.name, canonical.id
                );
            }
            CanonicalAction::Delete { id } => {
                store.delete_canonical(owner, id).await?;
                println!("Deleted canonical task {id} (instances unlinked)");
            }
        },
        Command::Repair { project } => {
            let report = service.link_orphans(owner, project).await?;
            println!(
                "Repair complete: {} linked, {} canonical tasks created",
                report.linked, report.created
            );
        }
    }

    Ok(())
}

async fn cmd_task(
    service: &TaskService,
    store: &dyn TaskStore,
    owner: sensei_core::model::UserId,
    action: TaskAction,
) -> anyhow::Result<()> {
    match action {
        TaskAction::Add {
            project,
            domain,
            name,
            description,
            notes,
            version,
            measure_type,
            measure_unit,
            target,
            timebox,
            timebox_unit,
            date,
        } => {
            let mut request = NewTaskRequest::new(name, project, domain);
            if let Some(d) = description {
                request = request.description(d);
            }
            if let Some(n) = notes {
                request = request.notes(n);
            }
            if let Some(v) = version {
                request = request.version(v);
            }
            if let Some(m) = measure_type {
                request = request.measure(m, measure_unit);
            }
            if let Some(t) = target {
                request = request.target_value(t);
            }
            if let (Some(value), Some(unit)) = (timebox, timebox_unit) {
                request = request.timebox(value, unit);
            }
            if let Some(d) = date {
                request = request.scheduled_date(d);
            }

            let created = service.create_task(owner, request).await?;
            let task = &created.task;
            match (&created.method, &task.canonical) {
                (CreationMethod::Enriched, Some(canonical)) => println!(
                    "Created {} in {} -> canonical \"{}\" ({})",
                    task.task.id, task.domain_name, canonical.name, canonical.id
                ),
                _ => println!(
                    "Created {} in {} (no canonical link)",
                    task.task.id, task.domain_name
                ),
            }
        }
        TaskAction::List { project, backlog } => {
            let tasks = if backlog {
                store.list_backlog(owner, project).await?
            } else {
                store.list_instances(owner, project).await?
            };
            if tasks.is_empty() {
                println!("No tasks found.");
                return Ok(());
            }
            println!(
                "{:<38}  {:<12}  {:<10}  {:<10}  NAME",
                "ID", "STATUS", "DATE", "CANONICAL"
            );
            println!("{}", "-".repeat(100));
            for t in &tasks {
                let date = t
                    .scheduled_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "backlog".to_string());
                let linked = if t.canonical_task_id.is_some() {
                    "linked"
                } else {
                    "orphan"
                };
                println!("{:<38}  {:<12}  {:<10}  {:<10}  {}", t.id, t.status, date, linked, t.name);
            }
            println!("\n{} task(s)", tasks.len());
        }
        TaskAction::Show { id } => {
            let task = store.get_instance(owner, id).await?;
            println!("ID:          {}", task.id);
            println!("Name:        {}", task.name);
            println!("Status:      {}", task.status);
            println!(
                "Canonical:   {}",
                task.canonical_task_id
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "- (orphaned)".to_string())
            );
            println!("Version:     {}", task.version.as_deref().unwrap_or("-"));
            println!(
                "Scheduled:   {}",
                task.scheduled_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "backlog".to_string())
            );
            if let Some(ref d) = task.description {
                println!("Description: {d}");
            }
            if let Some(ref n) = task.notes {
                println!("Notes:       {n}");
            }
            if let Some(mt) = task.measure_type {
                println!(
                    "Measure:     {} {}",
                    mt,
                    task.measure_unit.as_deref().unwrap_or("")
                );
            }
            if let Some(v) = task.target_value {
                println!("Target:      {v}");
            }
            if let (Some(v), Some(u)) = (task.timebox_value, task.timebox_unit.as_deref()) {
                println!("Timebox:     {v} {u}");
            }
            if let Some(at) = task.completed_at {
                println!("Completed:   {at}");
                if let Some(m) = task.actual_minutes {
                    println!("Actual time: {m} min");
                }
                if let Some(ref w) = task.actual_work {
                    println!("Actual work: {w}");
                }
            }
            println!("Created:     {}", task.created_at);
        }
        TaskAction::Status { id, status } => {
            let task = service.update_status(owner, id, status).await?;
            println!("{} -> {}", task.id, task.status);
        }
        TaskAction::Complete { id, minutes, work } => {
            let task = service
                .complete_task(
                    owner,
                    id,
                    CheckIn {
                        actual_minutes: minutes,
                        actual_work: work,
                    },
                )
                .await?;
            println!("Completed {} at {}", task.id, task.completed_at.unwrap_or_default());
        }
        TaskAction::Delete { id } => {
            store.delete_instance(owner, id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
