use chrono::{DateTime, Utc};

use crate::model::task::{Task, TaskId};
use crate::ops::events::EngineEvent;
use crate::ops::store::{TaskError, TaskStore};

/// Undo history cap. Oldest records are evicted from the undo side; the
/// redo side is always bounded by prior undo depth.
pub const UNDO_STACK_LIMIT: usize = 50;

/// What kind of reversible mutation an action record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Delete,
    Move,
    Priority,
    Timer,
    Tags,
    DueDate,
    Notes,
    Title,
}

/// One reversible mutation: deep before/after snapshots plus a display
/// description. `timer_delta` carries the signed minute change for timer
/// actions as data; the description is a display artifact only, never
/// parsed back into a number.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub task_id: TaskId,
    /// Snapshot before the mutation; None for create
    pub before: Option<Task>,
    /// Snapshot after the mutation; None for delete
    pub after: Option<Task>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub timer_delta: Option<i64>,
}

impl ActionRecord {
    pub fn new(
        kind: ActionKind,
        task_id: TaskId,
        before: Option<Task>,
        after: Option<Task>,
        description: String,
    ) -> Self {
        ActionRecord {
            kind,
            task_id,
            before,
            after,
            description,
            timestamp: Utc::now(),
            timer_delta: None,
        }
    }

    pub fn with_timer_delta(mut self, delta: i64) -> Self {
        self.timer_delta = Some(delta);
        self
    }
}

/// Result of an undo/redo call. An empty stack is a normal negative
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Applied {
        description: String,
        events: Vec<EngineEvent>,
    },
    Nothing,
}

impl UndoOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, UndoOutcome::Applied { .. })
    }
}

/// The undo/redo stacks. History is strictly linear: recording any new
/// action invalidates everything that was undone.
#[derive(Debug, Default)]
pub struct ActionLog {
    undo: Vec<ActionRecord>,
    redo: Vec<ActionRecord>,
}

impl ActionLog {
    pub fn new() -> Self {
        ActionLog {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record a new forward action. Clears the redo stack unconditionally.
    pub fn record(&mut self, record: ActionRecord) {
        self.undo.push(record);
        if self.undo.len() > UNDO_STACK_LIMIT {
            self.undo.drain(..self.undo.len() - UNDO_STACK_LIMIT);
        }
        self.redo.clear();
    }

    /// Undo the most recent action by applying its inverse to the store.
    ///
    /// The record is applied before it is popped: a structural failure
    /// (malformed snapshot pairing) reports the error and leaves both
    /// stacks exactly as they were.
    pub fn undo(&mut self, store: &mut TaskStore) -> Result<UndoOutcome, TaskError> {
        let events = match self.undo.last() {
            None => return Ok(UndoOutcome::Nothing),
            Some(record) => apply_inverse(record, store)?,
        };
        let Some(record) = self.undo.pop() else {
            return Ok(UndoOutcome::Nothing);
        };
        let description = record.description.clone();
        self.redo.push(record);
        Ok(UndoOutcome::Applied {
            description,
            events,
        })
    }

    /// Redo the most recently undone action by re-applying its forward
    /// effect. Symmetric with `undo`.
    pub fn redo(&mut self, store: &mut TaskStore) -> Result<UndoOutcome, TaskError> {
        let events = match self.redo.last() {
            None => return Ok(UndoOutcome::Nothing),
            Some(record) => apply_forward(record, store)?,
        };
        let Some(record) = self.redo.pop() else {
            return Ok(UndoOutcome::Nothing);
        };
        let description = record.description.clone();
        self.undo.push(record);
        Ok(UndoOutcome::Applied {
            description,
            events,
        })
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn peek_undo(&self) -> Option<&ActionRecord> {
        self.undo.last()
    }

    pub fn peek_redo(&self) -> Option<&ActionRecord> {
        self.redo.last()
    }
}

/// Apply the inverse effect of a record (for undo)
fn apply_inverse(
    record: &ActionRecord,
    store: &mut TaskStore,
) -> Result<Vec<EngineEvent>, TaskError> {
    match record.kind {
        ActionKind::Create => {
            // Undo create = remove the task entirely
            store.purge(record.task_id);
            Ok(vec![EngineEvent::TaskRemoved {
                id: record.task_id,
            }])
        }
        ActionKind::Delete => {
            let snapshot = record
                .before
                .as_ref()
                .ok_or(TaskError::CorruptAction("delete record without before state"))?
                .snapshot();
            store.apply_snapshot(snapshot);
            Ok(vec![EngineEvent::TaskRestored {
                id: record.task_id,
            }])
        }
        _ => {
            let snapshot = record
                .before
                .as_ref()
                .ok_or(TaskError::CorruptAction("record without before state"))?
                .snapshot();
            Ok(vec![apply_field_snapshot(store, snapshot)])
        }
    }
}

/// Re-apply the forward effect of a record (for redo)
fn apply_forward(
    record: &ActionRecord,
    store: &mut TaskStore,
) -> Result<Vec<EngineEvent>, TaskError> {
    match record.kind {
        ActionKind::Create => {
            let snapshot = record
                .after
                .as_ref()
                .ok_or(TaskError::CorruptAction("create record without after state"))?
                .snapshot();
            store.insert(snapshot);
            Ok(vec![EngineEvent::TaskRestored {
                id: record.task_id,
            }])
        }
        ActionKind::Delete => {
            // Forward effect of a delete: the before snapshot, flagged
            let mut snapshot = record
                .before
                .as_ref()
                .ok_or(TaskError::CorruptAction("delete record without before state"))?
                .snapshot();
            snapshot.deleted = true;
            store.apply_snapshot(snapshot);
            Ok(vec![EngineEvent::TaskRemoved {
                id: record.task_id,
            }])
        }
        _ => {
            let snapshot = record
                .after
                .as_ref()
                .ok_or(TaskError::CorruptAction("record without after state"))?
                .snapshot();
            Ok(vec![apply_field_snapshot(store, snapshot)])
        }
    }
}

/// Overwrite a live record from a snapshot and describe the change for the
/// renderer, reporting the prior column when the card moved.
fn apply_field_snapshot(store: &mut TaskStore, snapshot: Task) -> EngineEvent {
    let id = snapshot.id;
    let new_column = snapshot.column;
    let old_column = store.apply_snapshot(snapshot);
    EngineEvent::TaskUpdated {
        id,
        old_column: old_column.filter(|&c| c != new_column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Column, Priority};
    use crate::ops::store::{NewTask, TaskPatch};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn store_with_task(title: &str) -> (TaskStore, TaskId) {
        let mut store = TaskStore::new();
        let task = store
            .create(NewTask {
                title: title.into(),
                ..Default::default()
            })
            .unwrap();
        (store, task.id)
    }

    fn record_move(store: &mut TaskStore, log: &mut ActionLog, id: TaskId, to: Column) {
        let snaps = store
            .mutate(
                id,
                TaskPatch {
                    column: Some(to),
                    ..Default::default()
                },
            )
            .unwrap();
        log.record(ActionRecord::new(
            ActionKind::Move,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("Moved to {}", to.label()),
        ));
    }

    fn record_priority(store: &mut TaskStore, log: &mut ActionLog, id: TaskId, p: Priority) {
        let snaps = store
            .mutate(
                id,
                TaskPatch {
                    priority: Some(p),
                    ..Default::default()
                },
            )
            .unwrap();
        log.record(ActionRecord::new(
            ActionKind::Priority,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("Priority set to {}", p.name()),
        ));
    }

    // -----------------------------------------------------------------------
    // Stack mechanics
    // -----------------------------------------------------------------------

    #[test]
    fn undo_on_empty_stack_reports_nothing() {
        let mut store = TaskStore::new();
        let mut log = ActionLog::new();
        assert_eq!(log.undo(&mut store).unwrap(), UndoOutcome::Nothing);
        assert_eq!(log.redo(&mut store).unwrap(), UndoOutcome::Nothing);
    }

    #[test]
    fn record_clears_redo() {
        let (mut store, id) = store_with_task("T");
        let mut log = ActionLog::new();
        record_move(&mut store, &mut log, id, Column::InProgress);
        log.undo(&mut store).unwrap();
        assert_eq!(log.redo_depth(), 1);

        record_move(&mut store, &mut log, id, Column::OnHold);
        assert_eq!(log.redo_depth(), 0);
        assert_eq!(log.redo(&mut store).unwrap(), UndoOutcome::Nothing);
    }

    #[test]
    fn stack_limit_evicts_oldest() {
        let (mut store, id) = store_with_task("T");
        let mut log = ActionLog::new();
        for i in 0..=UNDO_STACK_LIMIT {
            let to = if i % 2 == 0 {
                Column::InProgress
            } else {
                Column::Todo
            };
            record_move(&mut store, &mut log, id, to);
        }
        assert_eq!(log.undo_depth(), UNDO_STACK_LIMIT);
    }

    // -----------------------------------------------------------------------
    // Inverse/forward semantics
    // -----------------------------------------------------------------------

    #[test]
    fn undo_create_removes_task() {
        let mut store = TaskStore::new();
        let mut log = ActionLog::new();
        let task = store
            .create(NewTask {
                title: "Fresh".into(),
                ..Default::default()
            })
            .unwrap();
        let id = task.id;
        log.record(ActionRecord::new(
            ActionKind::Create,
            id,
            None,
            Some(task),
            "Created 'Fresh'".into(),
        ));

        let outcome = log.undo(&mut store).unwrap();
        assert!(store.find(id).is_none());
        match outcome {
            UndoOutcome::Applied { events, .. } => {
                assert_eq!(events, vec![EngineEvent::TaskRemoved { id }]);
            }
            UndoOutcome::Nothing => panic!("expected an applied undo"),
        }
    }

    #[test]
    fn redo_create_reinserts_task() {
        let mut store = TaskStore::new();
        let mut log = ActionLog::new();
        let task = store
            .create(NewTask {
                title: "Fresh".into(),
                ..Default::default()
            })
            .unwrap();
        let id = task.id;
        log.record(ActionRecord::new(
            ActionKind::Create,
            id,
            None,
            Some(task),
            "Created 'Fresh'".into(),
        ));
        log.undo(&mut store).unwrap();
        let outcome = log.redo(&mut store).unwrap();
        assert!(store.find(id).is_some());
        match outcome {
            UndoOutcome::Applied { events, .. } => {
                assert_eq!(events, vec![EngineEvent::TaskRestored { id }]);
            }
            UndoOutcome::Nothing => panic!("expected an applied redo"),
        }
    }

    #[test]
    fn undo_delete_restores_live_flag() {
        let (mut store, id) = store_with_task("Doomed");
        let mut log = ActionLog::new();
        let snaps = store.soft_delete(id).unwrap();
        log.record(ActionRecord::new(
            ActionKind::Delete,
            id,
            Some(snaps.before),
            None,
            "Deleted 'Doomed'".into(),
        ));

        log.undo(&mut store).unwrap();
        assert!(!store.find(id).unwrap().deleted);

        log.redo(&mut store).unwrap();
        assert!(store.find(id).unwrap().deleted);
    }

    #[test]
    fn undo_delete_reinserts_purged_record() {
        let (mut store, id) = store_with_task("Doomed");
        let mut log = ActionLog::new();
        let snaps = store.soft_delete(id).unwrap();
        log.record(ActionRecord::new(
            ActionKind::Delete,
            id,
            Some(snaps.before),
            None,
            "Deleted 'Doomed'".into(),
        ));
        // permanent delete emptied the slot in the meantime
        store.purge(id);

        log.undo(&mut store).unwrap();
        let task = store.find(id).unwrap();
        assert!(!task.deleted);
        assert_eq!(task.title, "Doomed");
    }

    #[test]
    fn undo_move_reports_old_column() {
        let (mut store, id) = store_with_task("Mover");
        let mut log = ActionLog::new();
        record_move(&mut store, &mut log, id, Column::InProgress);

        let outcome = log.undo(&mut store).unwrap();
        assert_eq!(store.find(id).unwrap().column, Column::Todo);
        match outcome {
            UndoOutcome::Applied { events, .. } => {
                assert_eq!(
                    events,
                    vec![EngineEvent::TaskUpdated {
                        id,
                        old_column: Some(Column::InProgress),
                    }]
                );
            }
            UndoOutcome::Nothing => panic!("expected an applied undo"),
        }
    }

    #[test]
    fn undo_priority_has_no_old_column() {
        let (mut store, id) = store_with_task("Stable");
        let mut log = ActionLog::new();
        record_priority(&mut store, &mut log, id, Priority::High);

        let outcome = log.undo(&mut store).unwrap();
        match outcome {
            UndoOutcome::Applied { events, .. } => {
                assert_eq!(
                    events,
                    vec![EngineEvent::TaskUpdated {
                        id,
                        old_column: None,
                    }]
                );
            }
            UndoOutcome::Nothing => panic!("expected an applied undo"),
        }
    }

    #[test]
    fn snapshot_application_is_full_replacement() {
        // Fields changed after the snapshot was taken must be overwritten
        let (mut store, id) = store_with_task("Wide");
        let mut log = ActionLog::new();
        record_move(&mut store, &mut log, id, Column::InProgress);

        // Another recorded change on a different field
        record_priority(&mut store, &mut log, id, Priority::High);

        // Undo both: every field must match the original state
        log.undo(&mut store).unwrap();
        log.undo(&mut store).unwrap();
        let task = store.find(id).unwrap();
        assert_eq!(task.column, Column::Todo);
        assert_eq!(task.priority, Priority::None);
    }

    // -----------------------------------------------------------------------
    // Failure atomicity
    // -----------------------------------------------------------------------

    #[test]
    fn corrupt_record_leaves_stacks_untouched() {
        let (mut store, id) = store_with_task("T");
        let mut log = ActionLog::new();
        // A move record missing its before snapshot is structurally invalid
        log.record(ActionRecord::new(
            ActionKind::Move,
            id,
            None,
            None,
            "broken".into(),
        ));

        let err = log.undo(&mut store).unwrap_err();
        assert!(matches!(err, TaskError::CorruptAction(_)));
        // the popped entry was not lost and nothing crossed to redo
        assert_eq!(log.undo_depth(), 1);
        assert_eq!(log.redo_depth(), 0);
    }

    #[test]
    fn undo_redo_undo_equals_single_undo() {
        let (mut store, id) = store_with_task("Idem");
        let mut log = ActionLog::new();
        record_move(&mut store, &mut log, id, Column::Done);

        log.undo(&mut store).unwrap();
        let after_single = store.snapshot_of(id).unwrap();
        log.redo(&mut store).unwrap();
        log.undo(&mut store).unwrap();
        assert_eq!(store.snapshot_of(id).unwrap(), after_single);
        assert_eq!(log.undo_depth(), 0);
        assert_eq!(log.redo_depth(), 1);
    }
}
