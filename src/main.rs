mod config;
mod error;
mod export;
mod server;
mod store;
mod task;
mod tracker;
mod view;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use crate::config::Config;
use crate::store::Store;
use crate::task::{parse_due, Priority};
use crate::tracker::Tracker;
use crate::view::{DueStatus, Query};

#[derive(Parser)]
#[command(name = "focusflow")]
#[command(about = "FocusFlow - organize your day, prioritize what matters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, global = true)]
    debug: bool,
    /// Directory holding tasks.json and exported_tasks.csv
    #[arg(long, global = true, env = "FOCUSFLOW_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    Add {
        description: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(short, long)]
        due: Option<String>,
        #[arg(short, long, default_value = "low")]
        priority: String,
    },
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long)]
        pending: bool,
        /// "Created Time", "Due Date", "Priority" or "Status"
        #[arg(long, default_value = "Created Time")]
        sort: String,
    },
    Toggle {
        #[arg(required_unless_present = "position")]
        id: Option<String>,
        /// 1-based position as shown by `list`
        #[arg(long, conflicts_with = "id")]
        position: Option<usize>,
    },
    Delete {
        #[arg(required_unless_present = "position")]
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        position: Option<usize>,
    },
    Export,
    Progress,
    Serve {
        #[arg(long, env = "FOCUSFLOW_PORT")]
        port: Option<u16>,
        #[arg(long, env = "FOCUSFLOW_UI_DIR", default_value = "ui")]
        ui_dir: PathBuf,
    },
}

fn position_to_index(position: usize) -> Result<usize> {
    match position.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Task positions start at 1"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug { env::set_var("RUST_LOG", "debug"); } else if env::var_os("RUST_LOG").is_none() { env::set_var("RUST_LOG", "info"); }
    env_logger::init();

    let port = match &cli.command {
        Commands::Serve { port, .. } => *port,
        _ => None,
    };
    let config = Config::resolve(cli.data_dir, port)?;
    let mut tracker = Tracker::open(Store::new(config.tasks_path()))
        .with_context(|| format!("Cannot start with data directory {:?}", config.data_dir))?;

    match cli.command {
        Commands::Add { description, due, priority } => {
            let due = match due {
                Some(d) => parse_due(&d)?,
                None => Local::now().date_naive(),
            };
            let priority: Priority = priority.parse()?;
            let task = tracker.add(&description, due, priority)?;
            println!("✅ Task added! [{}] {}", task.id, task.description);
        }
        Commands::List { search, pending, sort } => {
            let query = Query { search, pending, sort: Some(sort) };
            let today = Local::now().date_naive();
            let view = view::render(tracker.tasks(), &query, today);
            println!("📊 {}% completed ({}/{})", view.progress as u32, view.done, view.total);
            if view.rows.is_empty() {
                println!("No tasks found.");
            }
            for row in &view.rows {
                let marker = if row.done { "x" } else { " " };
                let status = match row.due_status {
                    DueStatus::Overdue => "🔥 Overdue!",
                    DueStatus::Upcoming => "⌛ Upcoming",
                    DueStatus::Done => "✅ Done",
                };
                println!(
                    "{:>3}. [{}] {:<40} 📅 {} {:<12} ⭐ {:<8} 🕓 {}  ({})",
                    row.index + 1, marker, row.description, row.due, status, row.priority, row.created, row.id
                );
            }
        }
        Commands::Toggle { id, position } => {
            let task = match (id, position) {
                (Some(id), _) => tracker.toggle_done(&id)?,
                (None, Some(p)) => tracker.toggle_done_at(position_to_index(p)?)?,
                (None, None) => bail!("Give a task id or --position"),
            };
            println!("{} {}", if task.done { "✅ Done:" } else { "⌛ Pending:" }, task.description);
        }
        Commands::Delete { id, position } => {
            let removed = match (id, position) {
                (Some(id), _) => tracker.delete(&id)?,
                (None, Some(p)) => tracker.delete_at(position_to_index(p)?)?,
                (None, None) => bail!("Give a task id or --position"),
            };
            println!("🗑️ Deleted task: {}", removed.description);
        }
        Commands::Export => {
            let path = export::export_to(tracker.tasks(), &config.export_path())?;
            println!("📤 Exported to {}", path.display());
        }
        Commands::Progress => {
            println!("✅ {}% completed", tracker.progress() as u32);
        }
        Commands::Serve { ui_dir, .. } => {
            let state = server::AppState::new(tracker, config.export_path());
            server::start_server(state, config.port, ui_dir).await?;
            return Ok(());
        }
    }
    tracker.close()?;
    Ok(())
}
