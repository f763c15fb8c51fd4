use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::task::{
    Column, HistoryKind, NoteEntry, Priority, Task, TaskId, MAX_TAGS, MAX_TITLE_LEN,
};

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("invalid column: {0}")]
    InvalidColumn(String),
    #[error("a task can hold at most {MAX_TAGS} tags")]
    TagLimitExceeded,
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("title too long: {0} characters (max {MAX_TITLE_LEN})")]
    TitleTooLong(usize),
    #[error("no note at index {0}")]
    NoteNotFound(usize),
    #[error("corrupt action record: {0}")]
    CorruptAction(&'static str),
}

/// Fields for a task being created
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    /// Defaults to the To Do column
    pub column: Option<Column>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDate>,
}

/// A partial update to a task. `None` leaves the field alone;
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub column: Option<Column>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub timer_minutes: Option<u32>,
}

/// Deep before/after copies produced by every mutating store operation,
/// ready to be placed on an action record.
#[derive(Debug, Clone)]
pub struct MutationSnapshots {
    pub before: Task,
    pub after: Task,
}

/// The in-memory ordered collection of live task records. Owns identity:
/// ids are assigned here and never reused, and at most one record exists
/// per id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStore {
    next_id: u64,
    tasks: IndexMap<TaskId, Task>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore {
            next_id: 1,
            tasks: IndexMap::new(),
        }
    }

    /// Create a task and return a deep snapshot of it
    pub fn create(&mut self, new: NewTask) -> Result<Task, TaskError> {
        let title = validate_title(&new.title)?;
        let tags = normalize_tags(new.tags)?;

        let id = TaskId(self.next_id);
        self.next_id += 1;

        let mut task = Task::new(id, title, new.column.unwrap_or(Column::Todo));
        task.priority = new.priority;
        task.tags = tags;
        task.due_date = new.due_date;

        let snapshot = task.snapshot();
        self.tasks.insert(id, task);
        Ok(snapshot)
    }

    /// Apply a patch. Validation happens before any field is touched, so a
    /// rejected patch leaves the record exactly as it was.
    pub fn mutate(&mut self, id: TaskId, patch: TaskPatch) -> Result<MutationSnapshots, TaskError> {
        let title = match &patch.title {
            Some(t) => Some(validate_title(t)?),
            None => None,
        };
        let tags = match patch.tags {
            Some(tags) => Some(normalize_tags(tags)?),
            None => None,
        };

        let task = self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        let before = task.snapshot();

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(column) = patch.column {
            task.column = column;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = tags {
            task.tags = tags;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(minutes) = patch.timer_minutes {
            task.timer_minutes = minutes;
        }

        let after = task.snapshot();
        Ok(MutationSnapshots { before, after })
    }

    /// Soft-delete: flag the record and append a `Deleted` history entry.
    /// The record stays in the store; removal is `purge`, used only by the
    /// trash's permanent-delete path.
    pub fn soft_delete(&mut self, id: TaskId) -> Result<MutationSnapshots, TaskError> {
        let task = self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        let before = task.snapshot();
        task.deleted = true;
        task.push_history(HistoryKind::Deleted, "Deleted".to_string());
        let after = task.snapshot();
        Ok(MutationSnapshots { before, after })
    }

    /// Append a rich-text note
    pub fn add_note(&mut self, id: TaskId, content: String) -> Result<MutationSnapshots, TaskError> {
        let task = self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        let before = task.snapshot();
        task.notes.push(NoteEntry {
            at: Utc::now(),
            content,
        });
        let after = task.snapshot();
        Ok(MutationSnapshots { before, after })
    }

    /// Remove the note at `index`
    pub fn remove_note(
        &mut self,
        id: TaskId,
        index: usize,
    ) -> Result<MutationSnapshots, TaskError> {
        let task = self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        if index >= task.notes.len() {
            return Err(TaskError::NoteNotFound(index));
        }
        let before = task.snapshot();
        task.notes.remove(index);
        let after = task.snapshot();
        Ok(MutationSnapshots { before, after })
    }

    /// Append an audit-history entry to a live record
    pub fn append_history(
        &mut self,
        id: TaskId,
        kind: HistoryKind,
        text: String,
    ) -> Result<(), TaskError> {
        let task = self.tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;
        task.push_history(kind, text);
        Ok(())
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Deep copy of a live record
    pub fn snapshot_of(&self, id: TaskId) -> Result<Task, TaskError> {
        self.tasks
            .get(&id)
            .map(Task::snapshot)
            .ok_or(TaskError::NotFound(id))
    }

    pub fn all(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove a record entirely. Used by create-undo and by the trash's
    /// permanent-delete path, never by ordinary deletion.
    pub fn purge(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.shift_remove(&id)
    }

    /// Re-insert a record (undo of delete, redo of create, trash restore).
    /// Replaces any record with the same id so the one-per-id invariant
    /// holds, and keeps `next_id` ahead of every live id.
    pub fn insert(&mut self, task: Task) {
        self.next_id = self.next_id.max(task.id.0 + 1);
        self.tasks.insert(task.id, task);
    }

    /// Full field-by-field replacement from a snapshot. The live record's
    /// audit history is preserved; when no live record exists the snapshot
    /// is inserted as-is. Returns the prior column of the live record.
    pub fn apply_snapshot(&mut self, snapshot: Task) -> Option<Column> {
        match self.tasks.get_mut(&snapshot.id) {
            Some(task) => {
                let old_column = task.column;
                let history = std::mem::take(&mut task.history);
                *task = snapshot;
                task.history = history;
                Some(old_column)
            }
            None => {
                self.insert(snapshot);
                None
            }
        }
    }

    /// After deserializing a persisted store, make sure `next_id` is ahead
    /// of every stored id so restored boards never hand out a stale id.
    pub fn ensure_next_id(&mut self) {
        let max_id = self.tasks.keys().map(|id| id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1).max(1);
    }
}

fn validate_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TITLE_LEN {
        return Err(TaskError::TitleTooLong(chars));
    }
    Ok(trimmed.to_string())
}

/// Strip `#` prefixes, drop empties and duplicates, enforce the tag cap
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, TaskError> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').to_string();
        if tag.is_empty() {
            continue;
        }
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(TaskError::TagLimitExceeded);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> TaskStore {
        let mut store = TaskStore::new();
        store
            .create(NewTask {
                title: "First".into(),
                ..Default::default()
            })
            .unwrap();
        store
            .create(NewTask {
                title: "Second".into(),
                column: Some(Column::InProgress),
                priority: Priority::High,
                ..Default::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let store = sample_store();
        let ids: Vec<u64> = store.all().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn create_defaults_to_todo() {
        let mut store = TaskStore::new();
        let task = store
            .create(NewTask {
                title: "Plain".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.column, Column::Todo);
        assert_eq!(task.priority, Priority::None);
    }

    #[test]
    fn create_rejects_empty_title() {
        let mut store = TaskStore::new();
        let err = store
            .create(NewTask {
                title: "   ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyTitle));
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_over_long_title() {
        let mut store = TaskStore::new();
        let err = store
            .create(NewTask {
                title: "x".repeat(MAX_TITLE_LEN + 1),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::TitleTooLong(_)));
    }

    #[test]
    fn create_normalizes_tags() {
        let mut store = TaskStore::new();
        let task = store
            .create(NewTask {
                title: "Tagged".into(),
                tags: vec!["#a".into(), "a".into(), "  ".into(), "b".into()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn mutate_produces_before_and_after_snapshots() {
        let mut store = sample_store();
        let snaps = store
            .mutate(
                TaskId(1),
                TaskPatch {
                    column: Some(Column::Done),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(snaps.before.column, Column::Todo);
        assert_eq!(snaps.after.column, Column::Done);
        assert_eq!(store.find(TaskId(1)).unwrap().column, Column::Done);
    }

    #[test]
    fn mutate_unknown_id_is_not_found() {
        let mut store = sample_store();
        let err = store.mutate(TaskId(99), TaskPatch::default()).unwrap_err();
        assert!(matches!(err, TaskError::NotFound(TaskId(99))));
    }

    #[test]
    fn sixth_tag_fails_and_leaves_tags_unchanged() {
        let mut store = TaskStore::new();
        let task = store
            .create(NewTask {
                title: "Full".into(),
                tags: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
                ..Default::default()
            })
            .unwrap();
        let mut six = task.tags.clone();
        six.push("f".into());
        let err = store
            .mutate(
                task.id,
                TaskPatch {
                    tags: Some(six),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TaskError::TagLimitExceeded));
        assert_eq!(store.find(task.id).unwrap().tags.len(), 5);
    }

    #[test]
    fn rejected_patch_leaves_other_fields_untouched() {
        let mut store = sample_store();
        let err = store
            .mutate(
                TaskId(1),
                TaskPatch {
                    title: Some("".into()),
                    column: Some(Column::Done),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyTitle));
        // the column part of the patch must not have been applied
        assert_eq!(store.find(TaskId(1)).unwrap().column, Column::Todo);
    }

    #[test]
    fn soft_delete_keeps_the_record() {
        let mut store = sample_store();
        let snaps = store.soft_delete(TaskId(1)).unwrap();
        assert!(!snaps.before.deleted);
        assert!(snaps.after.deleted);
        let task = store.find(TaskId(1)).unwrap();
        assert!(task.deleted);
        assert_eq!(
            task.history.last().map(|h| h.kind),
            Some(HistoryKind::Deleted)
        );
    }

    #[test]
    fn purge_removes_and_id_is_never_reused() {
        let mut store = sample_store();
        store.purge(TaskId(2));
        assert!(store.find(TaskId(2)).is_none());
        let task = store
            .create(NewTask {
                title: "Third".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.id, TaskId(3));
    }

    #[test]
    fn insert_bumps_next_id() {
        let mut store = TaskStore::new();
        store.insert(Task::new(TaskId(10), "Restored".into(), Column::Todo));
        let task = store
            .create(NewTask {
                title: "Fresh".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.id, TaskId(11));
    }

    #[test]
    fn apply_snapshot_replaces_fields_but_preserves_history() {
        let mut store = sample_store();
        let old = store.snapshot_of(TaskId(1)).unwrap();
        store
            .mutate(
                TaskId(1),
                TaskPatch {
                    priority: Some(Priority::High),
                    column: Some(Column::Done),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .append_history(TaskId(1), HistoryKind::Priority, "Priority set to high".into())
            .unwrap();
        let history_len = store.find(TaskId(1)).unwrap().history.len();

        let prior = store.apply_snapshot(old);
        assert_eq!(prior, Some(Column::Done));
        let task = store.find(TaskId(1)).unwrap();
        assert_eq!(task.column, Column::Todo);
        assert_eq!(task.priority, Priority::None);
        // narrative history survives the rollback
        assert_eq!(task.history.len(), history_len);
    }

    #[test]
    fn apply_snapshot_reinserts_missing_record() {
        let mut store = sample_store();
        let snap = store.snapshot_of(TaskId(1)).unwrap();
        store.purge(TaskId(1));
        let prior = store.apply_snapshot(snap);
        assert_eq!(prior, None);
        assert!(store.find(TaskId(1)).is_some());
    }

    #[test]
    fn add_and_remove_note() {
        let mut store = sample_store();
        store.add_note(TaskId(1), "<p>hello</p>".into()).unwrap();
        assert_eq!(store.find(TaskId(1)).unwrap().notes.len(), 1);
        let err = store.remove_note(TaskId(1), 4).unwrap_err();
        assert!(matches!(err, TaskError::NoteNotFound(4)));
        store.remove_note(TaskId(1), 0).unwrap();
        assert!(store.find(TaskId(1)).unwrap().notes.is_empty());
    }

    #[test]
    fn ensure_next_id_after_load() {
        let store = sample_store();
        let json = serde_json::to_string(&store).unwrap();
        let mut loaded: TaskStore = serde_json::from_str(&json).unwrap();
        loaded.ensure_next_id();
        let task = loaded
            .create(NewTask {
                title: "After reload".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.id, TaskId(3));
    }
}
