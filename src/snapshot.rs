//! The persisted application state and its seed form.
//!
//! A [`Snapshot`] is the whole world: tasks, projects, templates, settings
//! and a schema version stamp. It serializes to the single JSON document the
//! persistence adapter reads and writes; the camelCase field names keep
//! backups from earlier builds importable.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fields::{ColorTheme, ThemeMode};
use crate::project::{Project, DEFAULT_PROJECT_ID};
use crate::task::Task;
use crate::template::{parse_template_variables, PromptTemplate};

/// Current snapshot schema version. Bump together with a migration step in
/// the persistence adapter.
pub const SCHEMA_VERSION: u32 = 1;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

/// User-scoped preferences carried inside the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub color_theme: ColorTheme,
    /// Project scope for list views; `None` means "all projects".
    #[serde(default)]
    pub active_project_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme_mode: ThemeMode::System,
            color_theme: ColorTheme::Blue,
            active_project_id: None,
        }
    }
}

/// The complete persisted application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub templates: Vec<PromptTemplate>,
    pub settings: Settings,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl Snapshot {
    /// The transient placeholder a store holds before the persisted snapshot
    /// has been loaded. Carries no entities and no active project.
    pub fn empty() -> Self {
        Snapshot {
            tasks: Vec::new(),
            projects: Vec::new(),
            templates: Vec::new(),
            settings: Settings::default(),
            version: SCHEMA_VERSION,
        }
    }

    /// The hard-coded first-run state: the protected default project and
    /// three starter templates.
    pub fn seed() -> Self {
        let now = now_millis();
        let template = |id: &str, name: &str, content: &str, category: &str| PromptTemplate {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            variables: parse_template_variables(content),
            created_at: now,
            updated_at: now,
        };
        Snapshot {
            tasks: Vec::new(),
            projects: vec![Project {
                id: DEFAULT_PROJECT_ID.to_string(),
                name: "默认项目".to_string(),
                color: "#007AFF".to_string(),
                order: 0,
                created_at: now,
                updated_at: now,
            }],
            templates: vec![
                template(
                    "template-1",
                    "代码审查",
                    "请帮我审查以下代码，关注：\n1. 代码质量和可读性\n2. 潜在的bug和安全问题\n3. 性能优化建议\n\n代码：\n{{code}}",
                    "开发",
                ),
                template(
                    "template-2",
                    "文案润色",
                    "请帮我润色以下文案，要求：\n1. 保持原意不变\n2. 语言更加流畅自然\n3. {{style}}\n\n原文：\n{{content}}",
                    "写作",
                ),
                template(
                    "template-3",
                    "翻译助手",
                    "请将以下{{source_lang}}文本翻译成{{target_lang}}，要求：\n1. 翻译准确\n2. 符合目标语言的表达习惯\n\n原文：\n{{text}}",
                    "翻译",
                ),
            ],
            settings: Settings {
                theme_mode: ThemeMode::System,
                color_theme: ColorTheme::Blue,
                active_project_id: Some(DEFAULT_PROJECT_ID.to_string()),
            },
            version: SCHEMA_VERSION,
        }
    }
}

/// Current time as epoch milliseconds, the snapshot's timestamp unit.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate an entity id: epoch millis plus a short random base-36 suffix.
/// Collisions are treated as negligible at a personal-tool scale.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now_millis(), suffix)
}
