//! `roster-sync` CLI entry-point.
//!
//! Loads a JSON snapshot of both collections, runs one operation against it
//! and writes the snapshot back when the operation succeeds.
//!
//! Available sub-commands:
//! - `move-employee`    : move an employee to another department.
//! - `edit-roster`      : replace a department's roster.
//! - `create-department`: create a department and move members into it.
//! - `delete-department`: delete a department with an empty roster.
//! - `audit`            : report employee/roster inconsistencies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use engine::{SyncEngine, SyncError, audit};
use store::{DepartmentPatch, InMemoryStore, NewDepartment, Snapshot, StoreTimeouts};
use tracing::info;

const STORE_HINT: &str = "Check the --data file and the --timeout-ms setting.";

#[derive(Parser)]
#[command(
    name = "roster-sync",
    about = "Keep employee departments and department rosters in sync",
    version
)]
struct Cli {
    /// Snapshot file holding `employees` and `departments`.
    #[arg(long, global = true, env = "ROSTER_DATA", default_value = "roster.json")]
    data: PathBuf,

    /// Deadline for every store call, in milliseconds.
    #[arg(long, global = true, env = "ROSTER_STORE_TIMEOUT_MS", default_value_t = 15_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move an employee to another department.
    MoveEmployee {
        #[arg(long)]
        employee: String,
        /// Name of the target department.
        #[arg(long)]
        to: String,
    },
    /// Replace a department's roster, reassigning anyone removed.
    EditRoster {
        #[arg(long)]
        department: String,
        /// Comma-separated employee ids.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        members: Vec<String>,
        /// Department that receives removed employees.
        #[arg(long, default_value = "")]
        reassign_to: String,
        /// Rename the department in the same save.
        #[arg(long)]
        name: Option<String>,
    },
    /// Create a department and move the listed employees into it.
    CreateDepartment {
        #[arg(long)]
        name: String,
        #[arg(long)]
        manager: String,
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        members: Vec<String>,
        #[arg(long)]
        acronym: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a department whose roster is empty.
    DeleteDepartment {
        #[arg(long)]
        department: String,
    },
    /// Report inconsistencies between employees and rosters.
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let store = load(&cli.data).await?;

    let command = match cli.command {
        Command::Audit => return run_audit(&store.snapshot()),
        command => command,
    };

    let timeouts = StoreTimeouts::uniform(Duration::from_millis(cli.timeout_ms));
    let engine = SyncEngine::new(Arc::new(store.clone()), Arc::new(store.clone()), timeouts);

    run(&engine, command)
        .await
        .map_err(|e| anyhow!(e.user_message(Some(STORE_HINT))))?;

    save(&cli.data, &store.snapshot()).await?;
    info!("snapshot written to {}", cli.data.display());
    Ok(())
}

async fn run(engine: &SyncEngine, command: Command) -> Result<(), SyncError> {
    match command {
        Command::MoveEmployee { employee, to } => {
            let current = engine.employees().get(&employee).await?;
            let fields = current.to_update().with_department(to);
            let saved = engine
                .sync_employee_department_change(&employee, &fields, &current.department)
                .await?;
            println!("{} is now in {}", saved.name, saved.department);
        }
        Command::EditRoster {
            department,
            members,
            reassign_to,
            name,
        } => {
            let current = engine.departments().get(&department).await?;
            let all_departments = engine.departments().list().await?;
            let employees_by_id: HashMap<_, _> = engine
                .employees()
                .list(None)
                .await?
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect();
            let patch = DepartmentPatch {
                name,
                ..DepartmentPatch::roster(members)
            };

            let saved = engine
                .sync_department_roster_change(
                    &department,
                    &patch,
                    &current,
                    &employees_by_id,
                    &reassign_to,
                    &all_departments,
                )
                .await?;
            println!("{} roster: [{}]", saved.name, saved.member_ids.join(", "));
        }
        Command::CreateDepartment {
            name,
            manager,
            members,
            acronym,
            description,
        } => {
            let selected = engine
                .employees()
                .list(None)
                .await?
                .into_iter()
                .filter(|e| members.contains(&e.id))
                .collect::<Vec<_>>();
            let input = NewDepartment {
                name,
                responsible_manager_id: manager,
                member_ids: members,
                description,
                acronym,
            };

            let created = engine.create_department_with_members(&input, &selected).await?;
            println!("created {} ({})", created.name, created.id);
        }
        Command::DeleteDepartment { department } => {
            engine.delete_department(&department).await?;
            println!("deleted {department}");
        }
        // Read-only; handled before the engine is built.
        Command::Audit => {}
    }
    Ok(())
}

fn run_audit(snapshot: &Snapshot) -> Result<()> {
    let findings = audit(&snapshot.employees, &snapshot.departments);
    if findings.is_empty() {
        println!("✅ Snapshot is consistent.");
        return Ok(());
    }
    for finding in &findings {
        eprintln!("❌ {finding}");
    }
    bail!("{} inconsistency(ies) found", findings.len())
}

async fn load(path: &Path) -> Result<InMemoryStore> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&content).with_context(|| format!("invalid snapshot in {}", path.display()))?;
    InMemoryStore::from_snapshot(snapshot).with_context(|| format!("cannot load {}", path.display()))
}

async fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("cannot write {}", path.display()))
}
