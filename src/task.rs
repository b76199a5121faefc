//! Task data structure and its construction/patch payloads.
//!
//! A task is the unit of work the application manages. Tasks carry an
//! optional AI prompt, belong to at most one project, and may nest beneath a
//! parent task via `parent_id` (a flat back-reference, never an embedded
//! tree).

use serde::{Deserialize, Serialize};

use crate::fields::{TaskPriority, TaskStatus};

/// A work item with an optional paired AI prompt.
///
/// Timestamps are epoch milliseconds. `order` drives stable ordering within
/// a sibling list; `completed_at` is set exactly while the status is
/// `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Construction payload for a task; id and timestamps are stamped by
/// [`crate::ops::create_task`]. The caller guarantees `title` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub prompt: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub order: i64,
}

/// Field-wise update for a task. `None` leaves a field untouched; for
/// optional fields the inner `Option` distinguishes "set" from "clear", so a
/// `Some(None)` wipes the field the way the CLI's `--clear-*` flags ask for.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub prompt: Option<Option<String>>,
    pub project_id: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub order: Option<i64>,
    pub completed_at: Option<Option<i64>>,
}

impl TaskPatch {
    /// Merge the patch into `task`. Does not touch `updated_at`; the domain
    /// operation owns that stamp.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(prompt) = &self.prompt {
            task.prompt = prompt.clone();
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = project_id.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            task.parent_id = parent_id.clone();
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
    }
}
