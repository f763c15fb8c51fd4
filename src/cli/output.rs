use serde::Serialize;

use crate::model::task::{HistoryEntry, Task};
use crate::ops::filter::{note_plain_text, ColumnCount};
use crate::ops::trash::TrashEntry;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CardJson {
    pub id: u64,
    pub title: String,
    pub column: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub timer_minutes: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

#[derive(Serialize)]
pub struct ColumnListJson {
    pub column: String,
    pub count: String,
    pub cards: Vec<CardJson>,
}

#[derive(Serialize)]
pub struct CountsJson {
    pub columns: Vec<ColumnCountJson>,
}

#[derive(Serialize)]
pub struct ColumnCountJson {
    pub column: String,
    pub visible: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct TrashEntryJson {
    pub id: u64,
    pub title: String,
    pub trashed_at: String,
}

#[derive(Serialize)]
pub struct HistoryEntryJson {
    pub at: String,
    pub kind: String,
    pub text: String,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn card_to_json(task: &Task) -> CardJson {
    CardJson {
        id: task.id.0,
        title: task.title.clone(),
        column: task.column.name().to_string(),
        priority: task.priority.name().to_string(),
        tags: task.tags.clone(),
        due: task.due_date.map(|d| d.to_string()),
        timer_minutes: task.timer_minutes,
        notes: task
            .notes
            .iter()
            .map(|note| note_plain_text(&note.content))
            .collect(),
        deleted: task.deleted,
    }
}

pub fn trash_entry_to_json(entry: &TrashEntry) -> TrashEntryJson {
    TrashEntryJson {
        id: entry.task.id.0,
        title: entry.task.title.clone(),
        trashed_at: entry.trashed_at.to_rfc3339(),
    }
}

pub fn history_entry_to_json(entry: &HistoryEntry) -> HistoryEntryJson {
    HistoryEntryJson {
        at: entry.at.to_rfc3339(),
        kind: format!("{:?}", entry.kind).to_lowercase(),
        text: entry.text.clone(),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// One-line card rendering: `#3 [high] Fix the parser #infra (due 2026-08-01) 25m`
pub fn card_line(task: &Task) -> String {
    let mut line = format!("#{}", task.id);
    if task.priority != crate::model::task::Priority::None {
        line.push_str(&format!(" [{}]", task.priority.name()));
    }
    line.push(' ');
    line.push_str(&task.title);
    for tag in &task.tags {
        line.push_str(&format!(" #{}", tag));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due {})", due));
    }
    if task.timer_minutes > 0 {
        line.push_str(&format!(" {}m", task.timer_minutes));
    }
    line
}

/// Column count per the display contract: just the visible count when no
/// filter is active, `visible/total` when one is.
pub fn count_label(count: ColumnCount, filtered: bool) -> String {
    if filtered {
        format!("{}/{}", count.visible, count.total)
    } else {
        format!("{}", count.visible)
    }
}
