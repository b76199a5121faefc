//! Project data structure for grouping tasks.
//!
//! One distinguished project, id [`DEFAULT_PROJECT_ID`], always exists. The
//! store refuses to delete it; deleting any other project reassigns its tasks
//! to a fallback project (see `ops::delete_project`).

use serde::{Deserialize, Serialize};

/// Id of the built-in project that seed data creates and the store protects
/// from deletion.
pub const DEFAULT_PROJECT_ID: &str = "default";

/// A named, colored task group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Construction payload for a project. The caller guarantees `name` is
/// non-empty.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub color: String,
    pub order: i64,
}

/// Field-wise update for a project; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

impl ProjectPatch {
    /// Merge the patch into `project`; `updated_at` is the domain
    /// operation's job.
    pub fn apply(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(color) = &self.color {
            project.color = color.clone();
        }
        if let Some(order) = self.order {
            project.order = order;
        }
    }
}
