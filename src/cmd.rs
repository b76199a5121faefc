//! Command implementations for the CLI interface.
//!
//! Every subcommand resolves its arguments against the store, dispatches the
//! matching transitions, and reports the outcome. Failed persistence is a
//! hard error here: the handlers print it and exit non-zero.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{Local, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::fields::{
    format_color_theme, format_priority, format_status, format_theme_mode, ColorTheme,
    StatusFilter, TaskPriority, TaskStatus, ThemeMode,
};
use crate::project::{NewProject, ProjectPatch};
use crate::storage::JsonStorage;
use crate::store::{FilterOptions, Store, Transition};
use crate::task::{NewTask, Task, TaskPatch};
use crate::template::{fill_template, parse_template_variables, NewTemplate, TemplatePatch};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Prompt text to pair with the task.
        #[arg(long)]
        prompt: Option<String>,
        /// Render the prompt from a template (id or name).
        #[arg(long)]
        template: Option<String>,
        /// Template variable binding, name=value. May be repeated.
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Project id or name. Defaults to the active project.
        #[arg(long)]
        project: Option<String>,
        /// Parent task id or title (creates a sub-task).
        #[arg(long)]
        parent: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = TaskPriority::Medium)]
        priority: TaskPriority,
        /// Status: pending | in-progress | completed.
        #[arg(long, value_enum, default_value_t = TaskStatus::Pending)]
        status: TaskStatus,
    },

    /// List root tasks with optional filters.
    List {
        /// Filter by status.
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Filter by project id or name.
        #[arg(long)]
        project: Option<String>,
        /// Only tasks not assigned to any project.
        #[arg(long)]
        unassigned: bool,
        /// Ignore the active-project scope and list every project.
        #[arg(long)]
        all_projects: bool,
        /// Case-insensitive search across title, description and prompt.
        #[arg(long)]
        search: Option<String>,
        /// Indent sub-tasks beneath their parents.
        #[arg(long)]
        tree: bool,
    },

    /// View a single task by id or title.
    View {
        /// Task id or title to view.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task id or title to update.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        /// Project id or name.
        #[arg(long)]
        project: Option<String>,
        /// Parent task id or title.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<TaskPriority>,
        /// Position weight within the sibling list.
        #[arg(long)]
        order: Option<i64>,
        /// Clear the description.
        #[arg(long)]
        clear_desc: bool,
        /// Clear the prompt.
        #[arg(long)]
        clear_prompt: bool,
        /// Detach the task from its project.
        #[arg(long)]
        clear_project: bool,
        /// Promote the task to a root task.
        #[arg(long)]
        clear_parent: bool,
    },

    /// Toggle a task between completed and pending.
    Complete {
        /// Task id or title to toggle.
        id: String,
    },

    /// Set a task's status explicitly.
    Status {
        /// Task id or title.
        id: String,
        /// New status: pending | in-progress | completed.
        #[arg(value_enum)]
        status: TaskStatus,
    },

    /// Move a task to a new position among its siblings.
    Move {
        /// Task id or title to move.
        id: String,
        /// Zero-based position within the sibling list.
        position: usize,
    },

    /// Delete a task and its direct sub-tasks.
    Delete {
        /// Task id or title to delete.
        id: String,
    },

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage prompt templates.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show or change theme settings.
    Theme {
        /// Theme mode: light | dark | system.
        #[arg(long, value_enum)]
        mode: Option<ThemeMode>,
        /// Accent color: blue | purple | green | orange | pink | teal.
        #[arg(long, value_enum)]
        color: Option<ColorTheme>,
    },

    /// Export the full snapshot as pretty-printed JSON.
    Export {
        /// Output file path (default: prompt-manager-backup-<date>.json).
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Import a snapshot file, replacing all data.
    Import {
        /// Input JSON file path.
        input: String,
        /// Skip creating a backup before import.
        #[arg(long)]
        no_backup: bool,
    },

    /// Delete the stored snapshot entirely.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        /// Project name.
        name: String,
        /// Display color (hex).
        #[arg(long, default_value = "#007AFF")]
        color: String,
    },
    /// List projects.
    List,
    /// Update a project's fields.
    Update {
        /// Project id or name.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Delete a project; its tasks move to the fallback project.
    Delete {
        /// Project id or name.
        id: String,
    },
    /// Set the active project scope.
    Use {
        /// Project id or name.
        id: Option<String>,
        /// Scope list views to all projects.
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create a prompt template.
    Add {
        /// Template name.
        name: String,
        /// Template content with {{variable}} placeholders.
        #[arg(long)]
        content: String,
        /// Category label.
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// List templates.
    List,
    /// Show a template's content and variables.
    Show {
        /// Template id or name.
        id: String,
    },
    /// Update a template's fields.
    Update {
        /// Template id or name.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a template.
    Delete {
        /// Template id or name.
        id: String,
    },
    /// Render a template with variable bindings.
    Fill {
        /// Template id or name.
        id: String,
        /// Variable binding, name=value. May be repeated.
        #[arg(long = "var")]
        vars: Vec<String>,
    },
}

/// Add a new task, optionally rendering its prompt from a template.
pub fn cmd_add(
    store: &mut Store,
    title: String,
    desc: Option<String>,
    prompt: Option<String>,
    template: Option<String>,
    vars: Vec<String>,
    project: Option<String>,
    parent: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
) {
    let project_id = match project {
        Some(ident) => match resolve_project(store, &ident) {
            Ok(id) => Some(id),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => store.snapshot().settings.active_project_id.clone(),
    };

    let parent_id = match parent {
        Some(ident) => match resolve_task(store, &ident) {
            Ok(id) => Some(id),
            Err(e) => {
                eprintln!("Error resolving parent: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let rendered = match template {
        Some(ident) => {
            let template_id = match resolve_template(store, &ident) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let values = match parse_var_bindings(&vars) {
                Ok(values) => values,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let content = store
                .template(&template_id)
                .map(|t| t.content.clone())
                .unwrap_or_default();
            let rendered = fill_template(&content, &values);
            let unfilled = parse_template_variables(&rendered);
            if !unfilled.is_empty() {
                eprintln!("Note: unfilled template variables: {}", unfilled.join(", "));
            }
            Some(rendered)
        }
        None => {
            if !vars.is_empty() {
                eprintln!("--var only makes sense together with --template.");
                std::process::exit(1);
            }
            None
        }
    };

    let order = store.snapshot().tasks.len() as i64;
    let new = NewTask {
        title,
        description: desc,
        status,
        priority,
        // An explicit --prompt wins over the rendered template.
        prompt: prompt.or(rendered),
        project_id,
        parent_id,
        order,
    };
    match store.add_task(new) {
        Ok(id) => println!("Added task {id}"),
        Err(e) => {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
}

/// List root tasks through the store's derived queries.
pub fn cmd_list(
    store: &Store,
    status: StatusFilter,
    project: Option<String>,
    unassigned: bool,
    all_projects: bool,
    search: Option<String>,
    tree: bool,
) {
    let project_scope: Option<Option<String>> = if unassigned {
        Some(None)
    } else if let Some(ident) = project {
        match resolve_project(store, &ident) {
            Ok(id) => Some(Some(id)),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    } else if all_projects {
        None
    } else {
        store
            .snapshot()
            .settings
            .active_project_id
            .clone()
            .map(Some)
    };

    let options = FilterOptions {
        status: Some(status),
        project_id: project_scope,
        search_query: search,
    };
    let tasks = store.filtered_tasks(&options);
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    print_task_table(store, &tasks, tree);
}

/// View detailed information about a single task.
pub fn cmd_view(store: &Store, id: String) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let Some(task) = store.task(&task_id) else {
        eprintln!("Task {task_id} not found.");
        std::process::exit(1);
    };

    println!("Id:          {}", task.id);
    println!("Title:       {}", task.title);
    println!("Status:      {}", format_status(task.status));
    println!("Priority:    {}", format_priority(task.priority));
    println!("Project:     {}", project_label(store, task));
    println!(
        "Parent:      {}",
        task.parent_id.as_deref().unwrap_or("-")
    );
    println!("Order:       {}", task.order);
    println!("Created:     {}", format_timestamp(task.created_at));
    println!("Updated:     {}", format_timestamp(task.updated_at));
    if let Some(completed_at) = task.completed_at {
        println!("Completed:   {}", format_timestamp(completed_at));
    }
    if let Some(description) = &task.description {
        println!("Description:\n{description}");
    }
    if let Some(prompt) = &task.prompt {
        println!("Prompt:\n{prompt}");
    }

    let subs = store.sub_tasks(&task.id);
    if !subs.is_empty() {
        println!("Sub-tasks:");
        for sub in subs {
            println!(
                "  - {} [{}] ({})",
                sub.title,
                format_status(sub.status),
                sub.id
            );
        }
    }
}

/// Update fields on a task.
pub fn cmd_update(
    store: &mut Store,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    prompt: Option<String>,
    project: Option<String>,
    parent: Option<String>,
    priority: Option<TaskPriority>,
    order: Option<i64>,
    clear_desc: bool,
    clear_prompt: bool,
    clear_project: bool,
    clear_parent: bool,
) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let project_id: Option<Option<String>> = if clear_project {
        Some(None)
    } else if let Some(ident) = project {
        match resolve_project(store, &ident) {
            Ok(id) => Some(Some(id)),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let parent_id: Option<Option<String>> = if clear_parent {
        Some(None)
    } else if let Some(ident) = parent {
        let pid = match resolve_task(store, &ident) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Error resolving parent: {e}");
                std::process::exit(1);
            }
        };
        if pid == task_id {
            eprintln!("A task cannot be its own parent.");
            std::process::exit(1);
        }
        // Walk the ancestry to reject cycles.
        let mut cursor = Some(pid.clone());
        let mut hops = 0;
        while let Some(current) = cursor {
            if current == task_id {
                eprintln!("Setting this parent would create a cycle.");
                std::process::exit(1);
            }
            cursor = store.task(&current).and_then(|t| t.parent_id.clone());
            hops += 1;
            if hops > 64 {
                break;
            }
        }
        Some(Some(pid))
    } else {
        None
    };

    let patch = TaskPatch {
        title,
        description: if clear_desc { Some(None) } else { desc.map(Some) },
        prompt: if clear_prompt { Some(None) } else { prompt.map(Some) },
        priority,
        order,
        project_id,
        parent_id,
        ..TaskPatch::default()
    };
    match store.dispatch(Transition::UpdateTask {
        id: task_id.clone(),
        patch,
    }) {
        Ok(()) => println!("Updated task {task_id}"),
        Err(e) => {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
}

/// Toggle a task between completed and pending.
pub fn cmd_complete(store: &mut Store, id: String) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = store.complete_task(&task_id) {
        eprintln!("Failed to save snapshot: {e}");
        std::process::exit(1);
    }
    if let Some(task) = store.task(&task_id) {
        println!("Task {} is now {}", task_id, format_status(task.status));
    }
}

/// Set a task's status explicitly.
pub fn cmd_status(store: &mut Store, id: String, status: TaskStatus) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = store.set_task_status(&task_id, status) {
        eprintln!("Failed to save snapshot: {e}");
        std::process::exit(1);
    }
    println!("Task {} is now {}", task_id, format_status(status));
}

/// Move a task to a new position among its siblings, renumbering orders.
pub fn cmd_move(store: &mut Store, id: String, position: usize) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let Some(task) = store.task(&task_id).cloned() else {
        eprintln!("Task {task_id} not found.");
        std::process::exit(1);
    };

    let sibling_ids: Vec<String> = match task.parent_id.as_deref() {
        Some(pid) => store.sub_tasks(pid).iter().map(|t| t.id.clone()).collect(),
        None => store
            .tasks_by_project(task.project_id.as_deref())
            .iter()
            .map(|t| t.id.clone())
            .collect(),
    };
    let mut ordered: Vec<String> = sibling_ids
        .into_iter()
        .filter(|sid| sid != &task_id)
        .collect();
    let position = position.min(ordered.len());
    ordered.insert(position, task_id.clone());

    let order_of: HashMap<&str, i64> = ordered
        .iter()
        .enumerate()
        .map(|(index, sid)| (sid.as_str(), index as i64))
        .collect();
    let tasks: Vec<Task> = store
        .snapshot()
        .tasks
        .iter()
        .map(|t| {
            let mut t = t.clone();
            if let Some(&order) = order_of.get(t.id.as_str()) {
                t.order = order;
            }
            t
        })
        .collect();

    match store.dispatch(Transition::ReorderTasks(tasks)) {
        Ok(()) => println!("Moved task {task_id} to position {position}"),
        Err(e) => {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
}

/// Delete a task; its direct sub-tasks go with it.
pub fn cmd_delete(store: &mut Store, id: String) {
    let task_id = match resolve_task(store, &id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let sub_count = store.sub_tasks(&task_id).len();
    match store.dispatch(Transition::DeleteTask(task_id.clone())) {
        Ok(()) => {
            if sub_count > 0 {
                println!("Deleted task {task_id} and {sub_count} sub-task(s)");
            } else {
                println!("Deleted task {task_id}");
            }
        }
        Err(e) => {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
}

/// Handle project management commands.
pub fn cmd_project(store: &mut Store, action: ProjectAction) {
    match action {
        ProjectAction::Add { name, color } => {
            if name.trim().is_empty() {
                eprintln!("Project name cannot be empty.");
                std::process::exit(1);
            }
            let order = store.snapshot().projects.len() as i64;
            match store.add_project(NewProject {
                name: name.trim().to_string(),
                color,
                order,
            }) {
                Ok(id) => println!("Added project {id}"),
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }

        ProjectAction::List => {
            let snapshot = store.snapshot();
            let active = snapshot.settings.active_project_id.as_deref();
            println!(
                "{:<2} {:<20} {:<24} {:<9} {}",
                "", "Name", "ID", "Color", "Tasks"
            );
            let mut projects: Vec<_> = snapshot.projects.iter().collect();
            projects.sort_by_key(|p| p.order);
            for project in projects {
                let marker = if active == Some(project.id.as_str()) {
                    "*"
                } else {
                    ""
                };
                let count = snapshot
                    .tasks
                    .iter()
                    .filter(|t| t.project_id.as_deref() == Some(project.id.as_str()))
                    .count();
                println!(
                    "{:<2} {:<20} {:<24} {:<9} {}",
                    marker,
                    truncate(&project.name, 20),
                    project.id,
                    project.color,
                    count
                );
            }
        }

        ProjectAction::Update {
            id,
            name,
            color,
            order,
        } => {
            let project_id = match resolve_project(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let patch = ProjectPatch { name, color, order };
            match store.dispatch(Transition::UpdateProject {
                id: project_id.clone(),
                patch,
            }) {
                Ok(()) => println!("Updated project {project_id}"),
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }

        ProjectAction::Delete { id } => {
            let project_id = match resolve_project(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            match store.dispatch(Transition::DeleteProject(project_id.clone())) {
                Ok(()) => println!("Deleted project {project_id}; its tasks moved to the fallback project"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }

        ProjectAction::Use { id, all } => {
            if all == id.is_some() {
                eprintln!("Specify exactly one of a project id or --all.");
                std::process::exit(1);
            }
            let scope = if all {
                None
            } else {
                // id is present per the check above.
                match id.as_deref().map(|ident| resolve_project(store, ident)) {
                    Some(Ok(project_id)) => Some(project_id),
                    Some(Err(e)) => {
                        eprintln!("{e}");
                        std::process::exit(1);
                    }
                    None => None,
                }
            };
            match store.dispatch(Transition::SetActiveProject(scope.clone())) {
                Ok(()) => match scope {
                    Some(project_id) => println!("Active project set to {project_id}"),
                    None => println!("Active scope set to all projects"),
                },
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Handle template management commands.
pub fn cmd_template(store: &mut Store, action: TemplateAction) {
    match action {
        TemplateAction::Add {
            name,
            content,
            category,
        } => {
            if name.trim().is_empty() {
                eprintln!("Template name cannot be empty.");
                std::process::exit(1);
            }
            match store.add_template(NewTemplate {
                name: name.trim().to_string(),
                content,
                category,
            }) {
                Ok(id) => {
                    let variables = store
                        .template(&id)
                        .map(|t| t.variables.clone())
                        .unwrap_or_default();
                    if variables.is_empty() {
                        println!("Added template {id}");
                    } else {
                        println!("Added template {id} (variables: {})", variables.join(", "));
                    }
                }
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }

        TemplateAction::List => {
            let templates = &store.snapshot().templates;
            if templates.is_empty() {
                println!("No templates found.");
                return;
            }
            println!(
                "{:<20} {:<24} {:<10} {}",
                "Name", "ID", "Category", "Variables"
            );
            for template in templates {
                println!(
                    "{:<20} {:<24} {:<10} {}",
                    truncate(&template.name, 20),
                    template.id,
                    truncate(&template.category, 10),
                    template.variables.join(",")
                );
            }
        }

        TemplateAction::Show { id } => {
            let template_id = match resolve_template(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let Some(template) = store.template(&template_id) else {
                eprintln!("Template {template_id} not found.");
                std::process::exit(1);
            };
            println!("Id:        {}", template.id);
            println!("Name:      {}", template.name);
            println!("Category:  {}", template.category);
            println!("Variables: {}", template.variables.join(", "));
            println!("Content:\n{}", template.content);
        }

        TemplateAction::Update {
            id,
            name,
            content,
            category,
        } => {
            let template_id = match resolve_template(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let patch = TemplatePatch {
                name,
                content,
                category,
            };
            match store.dispatch(Transition::UpdateTemplate {
                id: template_id.clone(),
                patch,
            }) {
                Ok(()) => println!("Updated template {template_id}"),
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }

        TemplateAction::Delete { id } => {
            let template_id = match resolve_template(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            match store.dispatch(Transition::DeleteTemplate(template_id.clone())) {
                Ok(()) => println!("Deleted template {template_id}"),
                Err(e) => {
                    eprintln!("Failed to save snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }

        TemplateAction::Fill { id, vars } => {
            let template_id = match resolve_template(store, &id) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let values = match parse_var_bindings(&vars) {
                Ok(values) => values,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let Some(template) = store.template(&template_id) else {
                eprintln!("Template {template_id} not found.");
                std::process::exit(1);
            };
            let rendered = fill_template(&template.content, &values);
            let unfilled = parse_template_variables(&rendered);
            println!("{rendered}");
            if !unfilled.is_empty() {
                eprintln!("Unfilled variables: {}", unfilled.join(", "));
            }
        }
    }
}

/// Show or change the theme settings.
pub fn cmd_theme(store: &mut Store, mode: Option<ThemeMode>, color: Option<ColorTheme>) {
    if mode.is_none() && color.is_none() {
        let settings = &store.snapshot().settings;
        println!("Theme mode:   {}", format_theme_mode(settings.theme_mode));
        println!("Color theme:  {}", format_color_theme(settings.color_theme));
        println!(
            "Active scope: {}",
            settings.active_project_id.as_deref().unwrap_or("all projects")
        );
        return;
    }
    if let Some(mode) = mode {
        if let Err(e) = store.dispatch(Transition::SetThemeMode(mode)) {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
    if let Some(color) = color {
        if let Err(e) = store.dispatch(Transition::SetColorTheme(color)) {
            eprintln!("Failed to save snapshot: {e}");
            std::process::exit(1);
        }
    }
    println!("Theme updated.");
}

/// Export the persisted snapshot as pretty-printed JSON.
pub fn cmd_export(store: &Store, output: Option<String>) {
    let text = match store.storage().export_text() {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to export snapshot: {e}");
            std::process::exit(1);
        }
    };
    let output_path = output.unwrap_or_else(|| {
        format!(
            "prompt-manager-backup-{}.json",
            Local::now().format("%Y-%m-%d")
        )
    });
    match fs::write(&output_path, text) {
        Ok(()) => println!("Exported snapshot to {output_path}"),
        Err(e) => {
            eprintln!("Failed to write {output_path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Create a timestamped copy of the snapshot file under `backup/`.
pub fn create_backup(db_path: &Path) -> Result<String, std::io::Error> {
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "snapshot file does not exist",
        ));
    }
    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("data.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
    fs::copy(db_path, &backup_path)?;
    Ok(backup_path.to_string_lossy().to_string())
}

/// Import a snapshot file with automatic backup, replacing all data.
pub fn cmd_import(store: &mut Store, input: String, no_backup: bool) {
    let db_path = store.storage().path().to_path_buf();
    if !no_backup && db_path.exists() {
        match create_backup(&db_path) {
            Ok(backup_path) => println!("Created backup: {backup_path}"),
            Err(e) => {
                eprintln!("Warning: failed to create backup: {e}");
                print!("Continue without backup? (y/N): ");
                let _ = io::stdout().flush();
                let mut response = String::new();
                if io::stdin().read_line(&mut response).is_err()
                    || !response.trim().to_lowercase().starts_with('y')
                {
                    println!("Import cancelled.");
                    return;
                }
            }
        }
    }

    let text = match fs::read_to_string(&input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {input}: {e}");
            std::process::exit(1);
        }
    };
    let snapshot = match store.storage().import_text(&text) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = store.dispatch(Transition::Import(snapshot)) {
        eprintln!("Failed to adopt imported snapshot: {e}");
        std::process::exit(1);
    }
    let snapshot = store.snapshot();
    println!(
        "Imported {} task(s), {} project(s), {} template(s).",
        snapshot.tasks.len(),
        snapshot.projects.len(),
        snapshot.templates.len()
    );
}

/// Delete the stored snapshot file.
pub fn cmd_reset(storage: &JsonStorage, yes: bool) {
    if !yes {
        eprintln!("This deletes all stored data. Re-run with --yes to confirm.");
        std::process::exit(1);
    }
    match storage.clear() {
        Ok(()) => println!("Stored data cleared."),
        Err(e) => {
            eprintln!("Failed to clear stored data: {e}");
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Resolve a task identifier (id or title) to a task id.
fn resolve_task(store: &Store, identifier: &str) -> Result<String, String> {
    if store.task(identifier).is_some() {
        return Ok(identifier.to_string());
    }
    let wanted = identifier.to_lowercase();
    let matches: Vec<&Task> = store
        .snapshot()
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == wanted)
        .collect();
    match matches.len() {
        0 => Err(format!("No task found with id or title '{identifier}'")),
        1 => Ok(matches[0].id.clone()),
        _ => {
            let mut message = format!("Multiple tasks titled '{identifier}':\n");
            for task in matches {
                message.push_str(&format!("  {} ({})\n", task.id, format_status(task.status)));
            }
            message.push_str("Use the specific id instead.");
            Err(message)
        }
    }
}

/// Resolve a project identifier (id or name) to a project id.
fn resolve_project(store: &Store, identifier: &str) -> Result<String, String> {
    if store.project(identifier).is_some() {
        return Ok(identifier.to_string());
    }
    let wanted = identifier.to_lowercase();
    let matches: Vec<_> = store
        .snapshot()
        .projects
        .iter()
        .filter(|project| project.name.to_lowercase() == wanted)
        .collect();
    match matches.len() {
        0 => Err(format!("No project found with id or name '{identifier}'")),
        1 => Ok(matches[0].id.clone()),
        _ => Err(format!(
            "Multiple projects named '{identifier}'; use the specific id instead."
        )),
    }
}

/// Resolve a template identifier (id or name) to a template id.
fn resolve_template(store: &Store, identifier: &str) -> Result<String, String> {
    if store.template(identifier).is_some() {
        return Ok(identifier.to_string());
    }
    let wanted = identifier.to_lowercase();
    let matches: Vec<_> = store
        .snapshot()
        .templates
        .iter()
        .filter(|template| template.name.to_lowercase() == wanted)
        .collect();
    match matches.len() {
        0 => Err(format!("No template found with id or name '{identifier}'")),
        1 => Ok(matches[0].id.clone()),
        _ => Err(format!(
            "Multiple templates named '{identifier}'; use the specific id instead."
        )),
    }
}

/// Parse repeated `name=value` bindings into a map.
fn parse_var_bindings(vars: &[String]) -> Result<HashMap<String, String>, String> {
    let mut values = HashMap::new();
    for raw in vars {
        match raw.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                values.insert(name.trim().to_string(), value.to_string());
            }
            _ => return Err(format!("Invalid --var '{raw}'; expected name=value")),
        }
    }
    Ok(values)
}

/// Print tasks in a formatted table, optionally with indented sub-tasks.
fn print_task_table(store: &Store, tasks: &[&Task], tree: bool) {
    println!(
        "{:<24} {:<12} {:<7} {:<14} {}",
        "ID", "Status", "Pri", "Project", "Title"
    );
    for task in tasks {
        print_task_row(store, task, 0, tree);
    }
}

fn print_task_row(store: &Store, task: &Task, depth: usize, tree: bool) {
    println!(
        "{:<24} {:<12} {:<7} {:<14} {}{}",
        task.id,
        format_status(task.status),
        format_priority(task.priority),
        truncate(&project_label(store, task), 14),
        "  ".repeat(depth),
        task.title
    );
    if tree && depth <= 64 {
        for child in store.sub_tasks(&task.id) {
            print_task_row(store, child, depth + 1, tree);
        }
    }
}

/// Display label for a task's project: its name, the raw id when the project
/// record is gone, or "-" when unassigned.
fn project_label(store: &Store, task: &Task) -> String {
    match task.project_id.as_deref() {
        None => "-".to_string(),
        Some(id) => store
            .project(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string()),
    }
}

/// Format an epoch-milliseconds timestamp for display in local time.
fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to a maximum width, ending in an ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
