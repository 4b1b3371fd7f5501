use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single task record
///
/// Serialized with camelCase keys and RFC 3339 timestamps, which is the shape
/// the browser UI and the REST API exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique positive identifier, never reused within a process lifetime
    pub id: u64,

    /// Trimmed, non-empty task text
    pub title: String,

    /// Completion flag
    pub completed: bool,

    /// Creation time, immutable
    pub created_at: DateTime<Utc>,

    /// Time of the last mutation (equal to `created_at` until the first update)
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a todo
///
/// Absent fields are left untouched. An empty patch is accepted and only
/// refreshes `updated_at`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

/// Trim a title, returning `None` when nothing is left
///
/// # Examples
/// ```
/// use todo_web::todo::normalize_title;
///
/// assert_eq!(normalize_title("  buy milk "), Some("buy milk".to_string()));
/// assert_eq!(normalize_title("   "), None);
/// ```
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
