//! Enumerations and field types for tasks, filtering and settings.
//!
//! Every closed vocabulary in the data model lives here: task status and
//! priority, the list-view status filter, and the theme settings. The serde
//! renames pin the persisted spelling (`in_progress`, `light`, ...) so stored
//! snapshots stay compatible across releases.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task completion status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Task priority classification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Status narrowing for list queries. `All` applies no status filter.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Completed,
}

impl StatusFilter {
    /// The concrete status this filter matches, or `None` for `All`.
    pub fn as_status(self) -> Option<TaskStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Pending => Some(TaskStatus::Pending),
            StatusFilter::InProgress => Some(TaskStatus::InProgress),
            StatusFilter::Completed => Some(TaskStatus::Completed),
        }
    }
}

/// Light/dark preference stored in settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// Accent color stored in settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorTheme {
    #[default]
    Blue,
    Purple,
    Green,
    Orange,
    Pink,
    Teal,
}

/// Format a task status for display.
pub fn format_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Completed => "completed",
    }
}

/// Format a priority for display.
pub fn format_priority(p: TaskPriority) -> &'static str {
    match p {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}

/// Format a theme mode for display.
pub fn format_theme_mode(m: ThemeMode) -> &'static str {
    match m {
        ThemeMode::Light => "light",
        ThemeMode::Dark => "dark",
        ThemeMode::System => "system",
    }
}

/// Format a color theme for display.
pub fn format_color_theme(c: ColorTheme) -> &'static str {
    match c {
        ColorTheme::Blue => "blue",
        ColorTheme::Purple => "purple",
        ColorTheme::Green => "green",
        ColorTheme::Orange => "orange",
        ColorTheme::Pink => "pink",
        ColorTheme::Teal => "teal",
    }
}
