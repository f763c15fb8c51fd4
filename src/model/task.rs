use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of tags a task may hold.
pub const MAX_TAGS: usize = 5;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Opaque task identifier. Assigned at creation, monotonically increasing,
/// never reused; numeric order doubles as creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(TaskId)
    }
}

/// Board column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Todo,
    InProgress,
    OnHold,
    Done,
}

impl Column {
    /// All columns in board order
    pub const ALL: [Column; 4] = [
        Column::Todo,
        Column::InProgress,
        Column::OnHold,
        Column::Done,
    ];

    /// The wire name used in persisted JSON and filter arguments
    pub fn name(self) -> &'static str {
        match self {
            Column::Todo => "todo",
            Column::InProgress => "inProgress",
            Column::OnHold => "onHold",
            Column::Done => "done",
        }
    }

    /// Human-readable column header
    pub fn label(self) -> &'static str {
        match self {
            Column::Todo => "To Do",
            Column::InProgress => "In Progress",
            Column::OnHold => "On Hold",
            Column::Done => "Done",
        }
    }

    /// Parse a column name (wire name or a common spelling); None if unknown
    pub fn from_name(s: &str) -> Option<Column> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "todo" => Some(Column::Todo),
            "inprogress" | "doing" => Some(Column::InProgress),
            "onhold" | "hold" => Some(Column::OnHold),
            "done" => Some(Column::Done),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Task priority. Serde default is `None` so an absent or null field in
/// persisted JSON lands on the none rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn name(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse a priority name; None if unknown
    pub fn from_name(s: &str) -> Option<Priority> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Priority::None),
            "low" => Some(Priority::Low),
            "medium" | "med" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A timestamped rich-text note on a task. `content` is an HTML fragment;
/// the filter engine extracts plain text from it for search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub at: DateTime<Utc>,
    pub content: String,
}

/// Category tag on an audit-history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Created,
    Status,
    Priority,
    Timer,
    Tag,
    DueDate,
    Note,
    Subtask,
    Deleted,
}

/// One entry in a task's permanent narrative history. Append-only; undo
/// never rolls these back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub kind: HistoryKind,
    pub text: String,
}

/// A task card with all its fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub column: Column,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Minutes worked
    #[serde(default)]
    pub timer_minutes: u32,
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
    /// Audit history: permanent narrative, distinct from undo records
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub deleted: bool,
    /// Nested sub-board, carried verbatim through snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_board: Option<serde_json::Value>,
}

impl Task {
    /// Create a new task in the given column, with a `Created` history entry
    pub fn new(id: TaskId, title: String, column: Column) -> Self {
        let mut task = Task {
            id,
            title,
            column,
            priority: Priority::None,
            tags: Vec::new(),
            due_date: None,
            timer_minutes: 0,
            notes: Vec::new(),
            history: Vec::new(),
            deleted: false,
            sub_board: None,
        };
        task.push_history(HistoryKind::Created, format!("Created in {}", column.label()));
        task
    }

    /// Independent deep copy of this record. Snapshots are what the action
    /// log and the trash own; they must never alias the live record.
    pub fn snapshot(&self) -> Task {
        self.clone()
    }

    /// Append an audit-history entry
    pub fn push_history(&mut self, kind: HistoryKind, text: String) {
        self.history.push(HistoryEntry {
            at: Utc::now(),
            kind,
            text,
        });
    }
}

// History is narrative bookkeeping, not card state, so equality ignores it.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.column == other.column
            && self.priority == other.priority
            && self.tags == other.tags
            && self.due_date == other.due_date
            && self.timer_minutes == other.timer_minutes
            && self.notes == other.notes
            && self.deleted == other.deleted
            && self.sub_board == other.sub_board
    }
}

impl Eq for Task {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
    }

    #[test]
    fn column_from_name_accepts_spellings() {
        assert_eq!(Column::from_name("in-progress"), Some(Column::InProgress));
        assert_eq!(Column::from_name("In Progress"), Some(Column::InProgress));
        assert_eq!(Column::from_name("HOLD"), Some(Column::OnHold));
        assert_eq!(Column::from_name("archive"), None);
    }

    #[test]
    fn priority_defaults_to_none_when_absent() {
        // Persisted JSON from older sessions may omit the field entirely
        let json = r#"{"id":1,"title":"x","column":"todo"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::None);
        assert!(task.tags.is_empty());
        assert!(!task.deleted);
    }

    #[test]
    fn column_serializes_as_camel_case() {
        let v = serde_json::to_value(Column::InProgress).unwrap();
        assert_eq!(v, serde_json::json!("inProgress"));
        let v = serde_json::to_value(Column::OnHold).unwrap();
        assert_eq!(v, serde_json::json!("onHold"));
    }

    #[test]
    fn new_task_has_created_history() {
        let task = Task::new(TaskId(1), "Write docs".into(), Column::Todo);
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].kind, HistoryKind::Created);
    }

    #[test]
    fn equality_ignores_history() {
        let mut a = Task::new(TaskId(1), "Same".into(), Column::Todo);
        let mut b = a.snapshot();
        b.history.clear();
        assert_eq!(a, b);
        a.title = "Different".into();
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_is_independent() {
        let mut task = Task::new(TaskId(7), "Original".into(), Column::Todo);
        task.tags.push("deep".into());
        let snap = task.snapshot();
        task.title = "Mutated".into();
        task.tags.push("later".into());
        assert_eq!(snap.title, "Original");
        assert_eq!(snap.tags, vec!["deep".to_string()]);
    }
}
