use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::task::{Task, TaskId};

/// Maximum number of trashed snapshots kept; oldest entries are evicted.
pub const TRASH_LIMIT: usize = 20;

/// A soft-deleted task snapshot awaiting recovery or permanent deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    pub task: Task,
    pub trashed_at: DateTime<Utc>,
}

/// Bounded, persisted list of soft-deleted task snapshots. Lives
/// independently of the undo stacks: a task can be undone back into
/// existence while its snapshot still sits here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trash {
    /// Oldest first
    entries: Vec<TrashEntry>,
}

impl Trash {
    pub fn new() -> Self {
        Trash {
            entries: Vec::new(),
        }
    }

    /// Add a deleted task's snapshot. A re-deleted task replaces its older
    /// entry; past the cap the oldest entry is evicted.
    pub fn move_to_trash(&mut self, task: Task) {
        self.entries.retain(|entry| entry.task.id != task.id);
        self.entries.push(TrashEntry {
            task,
            trashed_at: Utc::now(),
        });
        if self.entries.len() > TRASH_LIMIT {
            self.entries.drain(..self.entries.len() - TRASH_LIMIT);
        }
    }

    /// Trashed entries, most recent first
    pub fn trashed(&self) -> impl Iterator<Item = &TrashEntry> {
        self.entries.iter().rev()
    }

    /// Remove an entry and hand its snapshot back for re-insertion into the
    /// store. The returned task has its `deleted` flag cleared.
    pub fn restore(&mut self, id: TaskId) -> Option<Task> {
        let index = self.entries.iter().position(|entry| entry.task.id == id)?;
        let mut task = self.entries.remove(index).task;
        task.deleted = false;
        Some(task)
    }

    /// Drop an entry for good. Returns whether anything was removed.
    pub fn permanently_delete(&mut self, id: TaskId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.task.id != id);
        self.entries.len() != before
    }

    pub fn empty(&mut self) {
        self.entries.clear();
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.iter().any(|entry| entry.task.id == id)
    }
}
