//! The authoritative in-memory snapshot and its transition dispatch.
//!
//! A [`Store`] owns the current [`Snapshot`] and mutates it only through the
//! closed set of [`Transition`]s. Each dispatch is a pure reducer step:
//! current snapshot + transition -> next snapshot, which is committed,
//! announced to observers, and persisted through the adapter. Whether the
//! persisted state has been loaded is tracked by an explicit flag rather
//! than inferred from collection emptiness, so the transient pre-load
//! placeholder can never clobber stored data.

use log::debug;
use thiserror::Error;

use crate::fields::{ColorTheme, StatusFilter, TaskStatus, ThemeMode};
use crate::ops;
use crate::project::{NewProject, Project, ProjectPatch, DEFAULT_PROJECT_ID};
use crate::snapshot::{now_millis, Snapshot};
use crate::storage::{JsonStorage, StorageError};
use crate::task::{NewTask, Task, TaskPatch};
use crate::template::{NewTemplate, PromptTemplate, TemplatePatch};

/// Failures a dispatch can surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the default project cannot be deleted")]
    DefaultProject,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The closed set of state changes the store accepts.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Replace the placeholder with the snapshot loaded from storage.
    Init(Snapshot),
    AddTask(Task),
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask(String),
    /// Replace the task collection wholesale (drag-style reordering).
    ReorderTasks(Vec<Task>),
    AddProject(Project),
    UpdateProject { id: String, patch: ProjectPatch },
    DeleteProject(String),
    AddTemplate(PromptTemplate),
    UpdateTemplate { id: String, patch: TemplatePatch },
    DeleteTemplate(String),
    SetActiveProject(Option<String>),
    SetThemeMode(ThemeMode),
    SetColorTheme(ColorTheme),
    /// Replace everything with an imported snapshot.
    Import(Snapshot),
}

/// Options for [`Store::filtered_tasks`]. Every field is optional narrowing;
/// the default filters nothing.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub status: Option<StatusFilter>,
    /// Outer `None`: no project narrowing. `Some(None)`: unassigned tasks
    /// only. `Some(Some(id))`: tasks of that project.
    pub project_id: Option<Option<String>>,
    /// Case-insensitive substring match across title, description and prompt.
    pub search_query: Option<String>,
}

type Observer = Box<dyn Fn(&Snapshot)>;

/// Single authoritative holder of the application snapshot.
pub struct Store {
    storage: JsonStorage,
    snapshot: Snapshot,
    loaded: bool,
    observers: Vec<Observer>,
}

impl Store {
    /// A store over `storage` holding the empty placeholder; call
    /// [`Store::init`] (or use [`Store::open`]) to bring in persisted state.
    pub fn new(storage: JsonStorage) -> Self {
        Store {
            storage,
            snapshot: Snapshot::empty(),
            loaded: false,
            observers: Vec::new(),
        }
    }

    /// Create a store and immediately load the persisted snapshot into it.
    pub fn open(storage: JsonStorage) -> Result<Self, StoreError> {
        let mut store = Store::new(storage);
        store.init()?;
        Ok(store)
    }

    /// Load the persisted snapshot and adopt it wholesale.
    pub fn init(&mut self) -> Result<(), StoreError> {
        let snapshot = self.storage.load();
        self.dispatch(Transition::Init(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn storage(&self) -> &JsonStorage {
        &self.storage
    }

    /// Register an observer called with the committed snapshot after every
    /// transition.
    pub fn subscribe(&mut self, observer: impl Fn(&Snapshot) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Apply one transition: reduce, commit, notify, persist.
    ///
    /// Transitions run strictly in issue order and to completion. `Init` and
    /// `Import` adopt a snapshot that came from the adapter, so they mark the
    /// store loaded and skip the redundant write-back; everything else
    /// persists the committed snapshot, and a failed write surfaces as
    /// [`StoreError::Storage`].
    pub fn dispatch(&mut self, transition: Transition) -> Result<(), StoreError> {
        if let Transition::DeleteProject(id) = &transition {
            if id == DEFAULT_PROJECT_ID {
                return Err(StoreError::DefaultProject);
            }
        }
        let adopted_from_storage =
            matches!(transition, Transition::Init(_) | Transition::Import(_));
        self.snapshot = reduce(&self.snapshot, transition);
        if adopted_from_storage {
            self.loaded = true;
        }
        for observer in &self.observers {
            observer(&self.snapshot);
        }
        if self.loaded && !adopted_from_storage {
            self.storage.save(&self.snapshot)?;
        }
        debug!(
            "committed transition: {} tasks, {} projects, {} templates",
            self.snapshot.tasks.len(),
            self.snapshot.projects.len(),
            self.snapshot.templates.len()
        );
        Ok(())
    }

    /// Create and add a task, returning its generated id.
    pub fn add_task(&mut self, new: NewTask) -> Result<String, StoreError> {
        let task = ops::create_task(new);
        let id = task.id.clone();
        self.dispatch(Transition::AddTask(task))?;
        Ok(id)
    }

    /// Create and add a project, returning its generated id.
    pub fn add_project(&mut self, new: NewProject) -> Result<String, StoreError> {
        let project = ops::create_project(new);
        let id = project.id.clone();
        self.dispatch(Transition::AddProject(project))?;
        Ok(id)
    }

    /// Create and add a template, returning its generated id.
    pub fn add_template(&mut self, new: NewTemplate) -> Result<String, StoreError> {
        let template = ops::create_template(new);
        let id = template.id.clone();
        self.dispatch(Transition::AddTemplate(template))?;
        Ok(id)
    }

    /// Set a task's status. The completion timestamp is stamped exactly when
    /// the status becomes `completed` and cleared otherwise. Unknown ids are
    /// a no-op.
    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) -> Result<(), StoreError> {
        let completed_at = if status == TaskStatus::Completed {
            Some(now_millis())
        } else {
            None
        };
        let patch = TaskPatch {
            status: Some(status),
            completed_at: Some(completed_at),
            ..TaskPatch::default()
        };
        self.dispatch(Transition::UpdateTask {
            id: id.to_string(),
            patch,
        })
    }

    /// Toggle a task between completed and pending.
    pub fn complete_task(&mut self, id: &str) -> Result<(), StoreError> {
        let Some(task) = self.snapshot.tasks.iter().find(|t| t.id == id) else {
            return Ok(());
        };
        let next = if task.status == TaskStatus::Completed {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        };
        self.set_task_status(id, next)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.snapshot.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.snapshot.projects.iter().find(|p| p.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&PromptTemplate> {
        self.snapshot.templates.iter().find(|t| t.id == id)
    }

    /// Root tasks narrowed by the given options, ascending by `order`.
    pub fn filtered_tasks(&self, options: &FilterOptions) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.parent_id.is_none())
            .filter(|task| match options.status.and_then(StatusFilter::as_status) {
                None => true,
                Some(status) => task.status == status,
            })
            .filter(|task| match &options.project_id {
                None => true,
                Some(wanted) => task.project_id.as_deref() == wanted.as_deref(),
            })
            .filter(|task| match options.search_query.as_deref() {
                None | Some("") => true,
                Some(query) => {
                    let query = query.to_lowercase();
                    task.title.to_lowercase().contains(&query)
                        || task
                            .description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(&query))
                        || task
                            .prompt
                            .as_ref()
                            .is_some_and(|p| p.to_lowercase().contains(&query))
                }
            })
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }

    /// Root tasks of one project (`None` = unassigned), ascending by `order`.
    pub fn tasks_by_project(&self, project_id: Option<&str>) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.parent_id.is_none() && task.project_id.as_deref() == project_id)
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }

    /// Direct sub-tasks of `parent_id`, ascending by `order`.
    pub fn sub_tasks(&self, parent_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.parent_id.as_deref() == Some(parent_id))
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }
}

/// The pure reducer: current snapshot + transition -> next snapshot.
fn reduce(snapshot: &Snapshot, transition: Transition) -> Snapshot {
    match transition {
        Transition::Init(next) | Transition::Import(next) => next,
        Transition::AddTask(task) => {
            let mut next = snapshot.clone();
            next.tasks.push(task);
            next
        }
        Transition::UpdateTask { id, patch } => ops::update_task(snapshot, &id, &patch),
        Transition::DeleteTask(id) => ops::delete_task(snapshot, &id),
        Transition::ReorderTasks(tasks) => {
            let mut next = snapshot.clone();
            next.tasks = tasks;
            next
        }
        Transition::AddProject(project) => {
            let mut next = snapshot.clone();
            next.projects.push(project);
            next
        }
        Transition::UpdateProject { id, patch } => ops::update_project(snapshot, &id, &patch),
        Transition::DeleteProject(id) => ops::delete_project(snapshot, &id),
        Transition::AddTemplate(template) => {
            let mut next = snapshot.clone();
            next.templates.push(template);
            next
        }
        Transition::UpdateTemplate { id, patch } => ops::update_template(snapshot, &id, &patch),
        Transition::DeleteTemplate(id) => ops::delete_template(snapshot, &id),
        Transition::SetActiveProject(id) => {
            let mut next = snapshot.clone();
            next.settings.active_project_id = id;
            next
        }
        Transition::SetThemeMode(mode) => {
            let mut next = snapshot.clone();
            next.settings.theme_mode = mode;
            next
        }
        Transition::SetColorTheme(theme) => {
            let mut next = snapshot.clone();
            next.settings.color_theme = theme;
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TaskPriority;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> Store {
        Store::open(JsonStorage::new(dir.path().join("data.json"))).expect("store opens")
    }

    fn new_task(title: &str, project_id: Option<&str>, order: i64) -> NewTask {
        NewTask {
            title: title.to_string(),
            project_id: project_id.map(str::to_string),
            order,
            ..NewTask::default()
        }
    }

    #[test]
    fn open_adopts_seed_data_without_writing_it_back() {
        let dir = TempDir::new().expect("temp dir");
        let store = open_store(&dir);
        assert_eq!(store.snapshot().projects[0].id, DEFAULT_PROJECT_ID);
        // Init comes from the adapter; nothing needs persisting yet.
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn transitions_before_init_are_not_persisted() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = Store::new(JsonStorage::new(dir.path().join("data.json")));
        store
            .dispatch(Transition::SetThemeMode(ThemeMode::Dark))
            .expect("dispatch succeeds");
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn mutating_transitions_persist_after_init() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        store
            .add_task(new_task("persisted", None, 0))
            .expect("add succeeds");
        let reloaded = JsonStorage::new(dir.path().join("data.json")).load();
        assert_eq!(reloaded.tasks.len(), 1);
        assert_eq!(reloaded.tasks[0].title, "persisted");
    }

    #[test]
    fn observers_see_every_committed_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.tasks.len()));
        store.add_task(new_task("a", None, 0)).expect("add");
        store.add_task(new_task("b", None, 1)).expect("add");
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn deleting_the_default_project_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let result = store.dispatch(Transition::DeleteProject(DEFAULT_PROJECT_ID.to_string()));
        assert!(matches!(result, Err(StoreError::DefaultProject)));
        assert_eq!(store.snapshot().projects.len(), 1);
    }

    #[test]
    fn deleting_another_project_reassigns_its_tasks() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let doomed = store
            .add_project(NewProject {
                name: "doomed".to_string(),
                color: "#FF9500".to_string(),
                order: 1,
            })
            .expect("add project");
        let task_id = store
            .add_task(new_task("stranded", Some(&doomed), 0))
            .expect("add task");
        store
            .dispatch(Transition::DeleteProject(doomed))
            .expect("delete project");
        // Falls back to the lowest-(order, id) survivor, the default project.
        assert_eq!(
            store.task(&task_id).and_then(|t| t.project_id.as_deref()),
            Some(DEFAULT_PROJECT_ID)
        );
    }

    #[test]
    fn status_changes_stamp_and_clear_the_completion_timestamp() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let id = store.add_task(new_task("finish me", None, 0)).expect("add");

        store
            .set_task_status(&id, TaskStatus::Completed)
            .expect("complete");
        let task = store.task(&id).expect("task exists");
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());

        store
            .set_task_status(&id, TaskStatus::Pending)
            .expect("reopen");
        let task = store.task(&id).expect("task exists");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn complete_task_toggles() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let id = store.add_task(new_task("toggle", None, 0)).expect("add");
        store.complete_task(&id).expect("first toggle");
        assert_eq!(
            store.task(&id).map(|t| t.status),
            Some(TaskStatus::Completed)
        );
        store.complete_task(&id).expect("second toggle");
        let task = store.task(&id).expect("task exists");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn filtered_tasks_combines_status_project_and_search() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let mut add = |title: &str, status, project: Option<&str>, prompt: Option<&str>, order| {
            let task = ops::create_task(NewTask {
                title: title.to_string(),
                status,
                priority: TaskPriority::Medium,
                prompt: prompt.map(str::to_string),
                project_id: project.map(str::to_string),
                order,
                ..NewTask::default()
            });
            let id = task.id.clone();
            store.dispatch(Transition::AddTask(task)).expect("add");
            id
        };
        let wanted_b = add(
            "ship Foo release",
            TaskStatus::Completed,
            Some(DEFAULT_PROJECT_ID),
            None,
            7,
        );
        let wanted_a = add(
            "notes",
            TaskStatus::Completed,
            Some(DEFAULT_PROJECT_ID),
            Some("write about FOO"),
            3,
        );
        add(
            "ship foo elsewhere",
            TaskStatus::Completed,
            Some("other"),
            None,
            1,
        );
        add(
            "foo but pending",
            TaskStatus::Pending,
            Some(DEFAULT_PROJECT_ID),
            None,
            2,
        );

        let options = FilterOptions {
            status: Some(StatusFilter::Completed),
            project_id: Some(Some(DEFAULT_PROJECT_ID.to_string())),
            search_query: Some("foo".to_string()),
        };
        let hits: Vec<&str> = store
            .filtered_tasks(&options)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(hits, vec![wanted_a.as_str(), wanted_b.as_str()]);
    }

    #[test]
    fn root_and_sub_task_queries_follow_the_hierarchy() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        let p = store
            .add_project(NewProject {
                name: "P".to_string(),
                color: "#34C759".to_string(),
                order: 5,
            })
            .expect("add project");
        let t1 = store.add_task(new_task("T1", Some(&p), 0)).expect("add");
        let t2 = store.add_task(new_task("T2", Some(&p), 1)).expect("add");
        let t3 = store
            .add_task(NewTask {
                title: "T3".to_string(),
                parent_id: Some(t1.clone()),
                order: 0,
                ..NewTask::default()
            })
            .expect("add");

        let subs: Vec<&str> = store.sub_tasks(&t1).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(subs, vec![t3.as_str()]);

        let options = FilterOptions {
            status: Some(StatusFilter::All),
            project_id: Some(Some(p.clone())),
            ..FilterOptions::default()
        };
        let roots: Vec<&str> = store
            .filtered_tasks(&options)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(roots, vec![t1.as_str(), t2.as_str()]);

        let by_project: Vec<&str> = store
            .tasks_by_project(Some(&p))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(by_project, vec![t1.as_str(), t2.as_str()]);
    }

    #[test]
    fn unassigned_scope_matches_only_projectless_tasks() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = open_store(&dir);
        store
            .add_task(new_task("assigned", Some(DEFAULT_PROJECT_ID), 0))
            .expect("add");
        let free = store.add_task(new_task("free", None, 1)).expect("add");
        let options = FilterOptions {
            project_id: Some(None),
            ..FilterOptions::default()
        };
        let hits: Vec<&str> = store
            .filtered_tasks(&options)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(hits, vec![free.as_str()]);
        assert_eq!(store.tasks_by_project(None).len(), 1);
    }

    #[test]
    fn import_replaces_state_and_marks_loaded() {
        let dir = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(dir.path().join("data.json"));
        let mut incoming = Snapshot::seed();
        incoming.tasks.push(ops::create_task(NewTask {
            title: "imported".to_string(),
            ..NewTask::default()
        }));
        let imported = storage
            .import_text(&serde_json::to_string(&incoming).expect("serialize"))
            .expect("import succeeds");

        let mut store = Store::new(storage);
        store
            .dispatch(Transition::Import(imported))
            .expect("adopt import");
        assert_eq!(store.snapshot().tasks.len(), 1);
        // Follow-up mutations persist now that the store is loaded.
        store.add_task(new_task("after", None, 1)).expect("add");
        let reloaded = JsonStorage::new(dir.path().join("data.json")).load();
        assert_eq!(reloaded.tasks.len(), 2);
    }
}
