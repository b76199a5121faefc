//! # ptm - Prompt Task Manager CLI
//!
//! A local-first personal task manager that pairs every task with an
//! optional AI-prompt string and reusable prompt templates.
//!
//! ## Key Features
//!
//! - **Tasks with prompts**: each task can carry a prompt, rendered by hand
//!   or from a `{{variable}}` template
//! - **Projects**: colored groups with an "active project" scope for list
//!   views; a protected default project always exists
//! - **Sub-tasks**: flat parent references, deleted together with their
//!   parent
//! - **Prompt templates**: named, categorised, with derived variable lists
//!   and `--var name=value` substitution
//! - **Single-file storage**: one pretty-printed JSON snapshot with
//!   atomic writes, JSON export/import and automatic pre-import backups
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task to the active project
//! ptm add "Refine the release notes" --priority high
//!
//! # Pair a task with a templated prompt
//! ptm add "Review parser" --template 代码审查 --var code="fn main() {}"
//!
//! # List, complete, inspect
//! ptm list --tree
//! ptm complete "Review parser"
//! ptm view "Review parser"
//!
//! # Back up and restore everything
//! ptm export
//! ptm import prompt-manager-backup-2026-08-06.json
//! ```
//!
//! Data lives in `~/.ptm/data.json`; point `--db` elsewhere to keep
//! per-directory snapshots.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod fields;
pub mod ops;
pub mod project;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod task;
pub mod template;

use cli::Cli;
use cmd::*;
use storage::JsonStorage;
use store::Store;

fn main() {
    let cli = Cli::parse();
    let _logger = init_logging();

    let db_path = cli.db.unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Failed to create data directory {}: {}", parent.display(), e);
            std::process::exit(1);
        }
    }

    match cli.command {
        // These two work on the adapter alone; no store needed.
        Commands::Completions { shell } => {
            cmd_completions(shell);
            return;
        }
        Commands::Reset { yes } => {
            cmd_reset(&JsonStorage::new(&db_path), yes);
            return;
        }
        command => {
            let mut store = match Store::open(JsonStorage::new(&db_path)) {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("Failed to initialise store: {e}");
                    std::process::exit(1);
                }
            };

            match command {
                Commands::Add {
                    title,
                    desc,
                    prompt,
                    template,
                    vars,
                    project,
                    parent,
                    priority,
                    status,
                } => cmd_add(
                    &mut store, title, desc, prompt, template, vars, project, parent, priority,
                    status,
                ),

                Commands::List {
                    status,
                    project,
                    unassigned,
                    all_projects,
                    search,
                    tree,
                } => cmd_list(&store, status, project, unassigned, all_projects, search, tree),

                Commands::View { id } => cmd_view(&store, id),

                Commands::Update {
                    id,
                    title,
                    desc,
                    prompt,
                    project,
                    parent,
                    priority,
                    order,
                    clear_desc,
                    clear_prompt,
                    clear_project,
                    clear_parent,
                } => cmd_update(
                    &mut store,
                    id,
                    title,
                    desc,
                    prompt,
                    project,
                    parent,
                    priority,
                    order,
                    clear_desc,
                    clear_prompt,
                    clear_project,
                    clear_parent,
                ),

                Commands::Complete { id } => cmd_complete(&mut store, id),

                Commands::Status { id, status } => cmd_status(&mut store, id, status),

                Commands::Move { id, position } => cmd_move(&mut store, id, position),

                Commands::Delete { id } => cmd_delete(&mut store, id),

                Commands::Project { action } => cmd_project(&mut store, action),

                Commands::Template { action } => cmd_template(&mut store, action),

                Commands::Theme { mode, color } => cmd_theme(&mut store, mode, color),

                Commands::Export { output } => cmd_export(&store, output),

                Commands::Import { input, no_backup } => cmd_import(&mut store, input, no_backup),

                Commands::Completions { .. } | Commands::Reset { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }
}

/// Default snapshot location: `~/.ptm/data.json`.
fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ptm").join("data.json")
}

/// Start a stderr logger honoring `RUST_LOG`, defaulting to warnings only.
/// The handle must stay alive for the process lifetime.
fn init_logging() -> Option<flexi_logger::LoggerHandle> {
    match flexi_logger::Logger::try_with_env_or_str("warn").and_then(|logger| logger.start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to initialise logging: {e}");
            None
        }
    }
}
