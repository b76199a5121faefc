//! Pure domain operations over the snapshot.
//!
//! Every function here either constructs a fresh entity or maps one snapshot
//! to the next; none mutate their input. Callers replace their held snapshot
//! with the returned value. Updating or deleting an unknown id is a no-op,
//! never an error.

use crate::project::{NewProject, Project, ProjectPatch};
use crate::snapshot::{generate_id, now_millis, Snapshot};
use crate::task::{NewTask, Task, TaskPatch};
use crate::template::{parse_template_variables, NewTemplate, PromptTemplate, TemplatePatch};

/// Stamp id and timestamps onto a task payload.
pub fn create_task(new: NewTask) -> Task {
    let now = now_millis();
    Task {
        id: generate_id(),
        title: new.title,
        description: new.description,
        status: new.status,
        priority: new.priority,
        prompt: new.prompt,
        project_id: new.project_id,
        parent_id: new.parent_id,
        order: new.order,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }
}

/// Stamp id and timestamps onto a project payload.
pub fn create_project(new: NewProject) -> Project {
    let now = now_millis();
    Project {
        id: generate_id(),
        name: new.name,
        color: new.color,
        order: new.order,
        created_at: now,
        updated_at: now,
    }
}

/// Stamp id and timestamps onto a template payload, deriving its variable
/// list from the content.
pub fn create_template(new: NewTemplate) -> PromptTemplate {
    let now = now_millis();
    let variables = parse_template_variables(&new.content);
    PromptTemplate {
        id: generate_id(),
        name: new.name,
        content: new.content,
        category: new.category,
        variables,
        created_at: now,
        updated_at: now,
    }
}

/// Merge `patch` into the task matching `id` and refresh its `updated_at`.
pub fn update_task(snapshot: &Snapshot, id: &str, patch: &TaskPatch) -> Snapshot {
    let now = now_millis();
    let mut next = snapshot.clone();
    for task in &mut next.tasks {
        if task.id == id {
            patch.apply(task);
            task.updated_at = now;
        }
    }
    next
}

/// Remove the task matching `id` together with its direct sub-tasks. The
/// cascade is single-level: grandchildren are not re-checked.
pub fn delete_task(snapshot: &Snapshot, id: &str) -> Snapshot {
    let mut next = snapshot.clone();
    next.tasks
        .retain(|task| task.id != id && task.parent_id.as_deref() != Some(id));
    next
}

/// Merge `patch` into the project matching `id` and refresh its `updated_at`.
pub fn update_project(snapshot: &Snapshot, id: &str, patch: &ProjectPatch) -> Snapshot {
    let now = now_millis();
    let mut next = snapshot.clone();
    for project in &mut next.projects {
        if project.id == id {
            patch.apply(project);
            project.updated_at = now;
        }
    }
    next
}

/// Remove the project matching `id`. Tasks that pointed at it move to the
/// remaining project with the lowest `(order, id)`, or to no project when
/// none remain. The protection of the default project is the store's job.
pub fn delete_project(snapshot: &Snapshot, id: &str) -> Snapshot {
    let mut next = snapshot.clone();
    next.projects.retain(|project| project.id != id);
    let fallback = next
        .projects
        .iter()
        .min_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)))
        .map(|project| project.id.clone());
    let now = now_millis();
    for task in &mut next.tasks {
        if task.project_id.as_deref() == Some(id) {
            task.project_id = fallback.clone();
            task.updated_at = now;
        }
    }
    next
}

/// Merge `patch` into the template matching `id`, re-derive its variable
/// list from the (possibly new) content and refresh `updated_at`.
pub fn update_template(snapshot: &Snapshot, id: &str, patch: &TemplatePatch) -> Snapshot {
    let now = now_millis();
    let mut next = snapshot.clone();
    for template in &mut next.templates {
        if template.id == id {
            patch.apply(template);
            template.variables = parse_template_variables(&template.content);
            template.updated_at = now;
        }
    }
    next
}

/// Remove the template matching `id`.
pub fn delete_template(snapshot: &Snapshot, id: &str) -> Snapshot {
    let mut next = snapshot.clone();
    next.templates.retain(|template| template.id != id);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{TaskPriority, TaskStatus};

    fn task(id: &str, parent_id: Option<&str>, project_id: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            prompt: None,
            project_id: project_id.map(str::to_string),
            parent_id: parent_id.map(str::to_string),
            order: 0,
            created_at: 1,
            updated_at: 1,
            completed_at: None,
        }
    }

    fn project(id: &str, order: i64) -> Project {
        Project {
            id: id.to_string(),
            name: format!("project {id}"),
            color: "#007AFF".to_string(),
            order,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn create_task_stamps_id_and_matching_timestamps() {
        let created = create_task(NewTask {
            title: "write docs".to_string(),
            ..NewTask::default()
        });
        assert!(!created.id.is_empty());
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.completed_at.is_none());
    }

    #[test]
    fn update_task_merges_patch_and_bumps_updated_at() {
        let mut snapshot = Snapshot::empty();
        snapshot.tasks.push(task("t1", None, None));
        let patch = TaskPatch {
            title: Some("renamed".to_string()),
            description: Some(Some("details".to_string())),
            ..TaskPatch::default()
        };
        let next = update_task(&snapshot, "t1", &patch);
        assert_eq!(next.tasks[0].title, "renamed");
        assert_eq!(next.tasks[0].description.as_deref(), Some("details"));
        assert!(next.tasks[0].updated_at >= snapshot.tasks[0].updated_at);
        // input untouched
        assert_eq!(snapshot.tasks[0].title, "task t1");
    }

    #[test]
    fn update_of_unknown_id_is_a_noop() {
        let mut snapshot = Snapshot::empty();
        snapshot.tasks.push(task("t1", None, None));
        let next = update_task(&snapshot, "missing", &TaskPatch::default());
        assert_eq!(next, snapshot);
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let mut snapshot = Snapshot::empty();
        let mut t = task("t1", Some("p"), None);
        t.prompt = Some("old prompt".to_string());
        snapshot.tasks.push(t);
        let patch = TaskPatch {
            prompt: Some(None),
            parent_id: Some(None),
            ..TaskPatch::default()
        };
        let next = update_task(&snapshot, "t1", &patch);
        assert!(next.tasks[0].prompt.is_none());
        assert!(next.tasks[0].parent_id.is_none());
    }

    #[test]
    fn delete_task_cascades_exactly_one_level() {
        let mut snapshot = Snapshot::empty();
        snapshot.tasks.push(task("t1", None, None));
        snapshot.tasks.push(task("t2", Some("t1"), None));
        snapshot.tasks.push(task("t3", Some("t2"), None));
        snapshot.tasks.push(task("t4", None, None));
        let next = delete_task(&snapshot, "t1");
        let ids: Vec<&str> = next.tasks.iter().map(|t| t.id.as_str()).collect();
        // t2 goes with its parent; t3 (a grandchild) and t4 stay.
        assert_eq!(ids, vec!["t3", "t4"]);
    }

    #[test]
    fn delete_project_reassigns_tasks_to_lowest_order_survivor() {
        let mut snapshot = Snapshot::empty();
        snapshot.projects.push(project("a", 2));
        snapshot.projects.push(project("b", 1));
        snapshot.projects.push(project("gone", 0));
        snapshot.tasks.push(task("t1", None, Some("gone")));
        snapshot.tasks.push(task("t2", None, Some("a")));
        let next = delete_project(&snapshot, "gone");
        assert_eq!(next.projects.len(), 2);
        assert_eq!(next.tasks[0].project_id.as_deref(), Some("b"));
        assert_eq!(next.tasks[1].project_id.as_deref(), Some("a"));
    }

    #[test]
    fn delete_last_project_unassigns_its_tasks() {
        let mut snapshot = Snapshot::empty();
        snapshot.projects.push(project("only", 0));
        snapshot.tasks.push(task("t1", None, Some("only")));
        let next = delete_project(&snapshot, "only");
        assert!(next.projects.is_empty());
        assert!(next.tasks[0].project_id.is_none());
    }

    #[test]
    fn create_template_derives_variables_from_content() {
        let created = create_template(NewTemplate {
            name: "review".to_string(),
            content: "check {{code}} for {{focus}}".to_string(),
            category: "dev".to_string(),
        });
        assert_eq!(created.variables, vec!["code", "focus"]);
    }

    #[test]
    fn update_template_rederives_variables_on_content_change() {
        let mut snapshot = Snapshot::empty();
        snapshot.templates.push(create_template(NewTemplate {
            name: "t".to_string(),
            content: "{{a}}".to_string(),
            category: "c".to_string(),
        }));
        let id = snapshot.templates[0].id.clone();
        let patch = TemplatePatch {
            content: Some("{{x}} and {{y}}".to_string()),
            ..TemplatePatch::default()
        };
        let next = update_template(&snapshot, &id, &patch);
        assert_eq!(next.templates[0].variables, vec!["x", "y"]);
    }

    #[test]
    fn delete_template_removes_by_id() {
        let mut snapshot = Snapshot::empty();
        snapshot.templates.push(create_template(NewTemplate {
            name: "t".to_string(),
            content: String::new(),
            category: "c".to_string(),
        }));
        let id = snapshot.templates[0].id.clone();
        let next = delete_template(&snapshot, &id);
        assert!(next.templates.is_empty());
    }
}
