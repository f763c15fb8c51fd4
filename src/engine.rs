use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::io::kv::KvStore;
use crate::io::persist;
use crate::model::config::{BoardConfig, TagRegistry};
use crate::model::task::{Column, HistoryKind, Priority, Task, TaskId};
use crate::ops::actions::{ActionKind, ActionLog, ActionRecord, UndoOutcome};
use crate::ops::events::{EngineEvent, Notifier};
use crate::ops::filter::{self, ColumnCount, FilterState};
use crate::ops::sort;
use crate::ops::store::{NewTask, TaskError, TaskPatch, TaskStore};
use crate::ops::trash::{Trash, TrashEntry};

/// The application root: one explicit instance owning the task store, the
/// undo/redo log, the trash, the renderer notifier, and the injected
/// key-value store. Every mutation follows the same shape (snapshot,
/// apply, audit, record, persist), and persistence failures degrade to a
/// retained warning rather than a failed operation.
pub struct Engine {
    config: BoardConfig,
    tag_registry: TagRegistry,
    store: TaskStore,
    log: ActionLog,
    trash: Trash,
    notifier: Notifier,
    kv: Box<dyn KvStore>,
    persist_warning: Option<String>,
}

impl Engine {
    /// Load board and trash from the key-value store. The undo/redo stacks
    /// always start empty; history does not survive the session.
    pub fn new(config: BoardConfig, kv: Box<dyn KvStore>) -> Self {
        let store = persist::load_store(kv.as_ref());
        let trash = persist::load_trash(kv.as_ref());
        let tag_registry = config.tag_registry();
        Engine {
            config,
            tag_registry,
            store,
            log: ActionLog::new(),
            trash,
            notifier: Notifier::new(),
            kv,
            persist_warning: None,
        }
    }

    /// Register a renderer callback for undo/redo events
    pub fn subscribe(&mut self, callback: Box<dyn Fn(&EngineEvent)>) {
        self.notifier.subscribe(callback);
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a task and return a snapshot of it
    pub fn create_task(&mut self, new: NewTask) -> Result<Task, TaskError> {
        let task = self.store.create(new)?;
        self.log.record(ActionRecord::new(
            ActionKind::Create,
            task.id,
            None,
            Some(task.snapshot()),
            format!("Created '{}'", task.title),
        ));
        self.save_board();
        Ok(task)
    }

    pub fn edit_title(&mut self, id: TaskId, title: &str) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        if current.title == title.trim() {
            return Ok(());
        }
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                title: Some(title.to_string()),
                ..Default::default()
            },
        )?;
        self.log.record(ActionRecord::new(
            ActionKind::Title,
            id,
            Some(snaps.before),
            Some(snaps.after.clone()),
            format!("Renamed '{}' to '{}'", current.title, snaps.after.title),
        ));
        self.save_board();
        Ok(())
    }

    pub fn move_task(&mut self, id: TaskId, column: Column) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        if current.column == column {
            return Ok(());
        }
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                column: Some(column),
                ..Default::default()
            },
        )?;
        self.append_history(
            id,
            HistoryKind::Status,
            format!("Moved from {} to {}", current.column.label(), column.label()),
        );
        self.log.record(ActionRecord::new(
            ActionKind::Move,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!(
                "Moved '{}' from {} to {}",
                current.title,
                current.column.label(),
                column.label()
            ),
        ));
        self.save_board();
        Ok(())
    }

    pub fn set_priority(&mut self, id: TaskId, priority: Priority) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        if current.priority == priority {
            return Ok(());
        }
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                priority: Some(priority),
                ..Default::default()
            },
        )?;
        self.append_history(
            id,
            HistoryKind::Priority,
            format!("Priority set to {}", priority.name()),
        );
        self.log.record(ActionRecord::new(
            ActionKind::Priority,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("Set priority of '{}' to {}", current.title, priority.name()),
        ));
        self.save_board();
        Ok(())
    }

    pub fn add_tag(&mut self, id: TaskId, tag: &str) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() || current.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return Ok(());
        }
        let mut tags = current.tags.clone();
        tags.push(tag.to_string());
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                tags: Some(tags),
                ..Default::default()
            },
        )?;
        self.append_history(id, HistoryKind::Tag, format!("Added tag '{}'", tag));
        self.log.record(ActionRecord::new(
            ActionKind::Tags,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("Tagged '{}' with '{}'", current.title, tag),
        ));
        self.save_board();
        Ok(())
    }

    pub fn remove_tag(&mut self, id: TaskId, tag: &str) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        let tag = tag.trim().trim_start_matches('#');
        if !current.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return Ok(());
        }
        let tags: Vec<String> = current
            .tags
            .iter()
            .filter(|t| !t.eq_ignore_ascii_case(tag))
            .cloned()
            .collect();
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                tags: Some(tags),
                ..Default::default()
            },
        )?;
        self.append_history(id, HistoryKind::Tag, format!("Removed tag '{}'", tag));
        self.log.record(ActionRecord::new(
            ActionKind::Tags,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("Untagged '{}' from '{}'", tag, current.title),
        ));
        self.save_board();
        Ok(())
    }

    pub fn set_due_date(&mut self, id: TaskId, due: Option<NaiveDate>) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        if current.due_date == due {
            return Ok(());
        }
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                due_date: Some(due),
                ..Default::default()
            },
        )?;
        let text = match due {
            Some(date) => format!("Due date set to {}", date),
            None => "Due date cleared".to_string(),
        };
        self.append_history(id, HistoryKind::DueDate, text.clone());
        self.log.record(ActionRecord::new(
            ActionKind::DueDate,
            id,
            Some(snaps.before),
            Some(snaps.after),
            format!("{} on '{}'", text, current.title),
        ));
        self.save_board();
        Ok(())
    }

    /// Adjust the work timer by a signed number of minutes, floored at
    /// zero. The delta rides on the action record as data; the description
    /// is display-only.
    pub fn adjust_timer(&mut self, id: TaskId, delta_minutes: i64) -> Result<(), TaskError> {
        let current = self.store.snapshot_of(id)?;
        if delta_minutes == 0 {
            return Ok(());
        }
        let minutes = (i64::from(current.timer_minutes) + delta_minutes).max(0) as u32;
        let snaps = self.store.mutate(
            id,
            TaskPatch {
                timer_minutes: Some(minutes),
                ..Default::default()
            },
        )?;
        let text = if delta_minutes > 0 {
            format!("Timer +{}m", delta_minutes)
        } else {
            format!("Timer {}m", delta_minutes)
        };
        self.append_history(id, HistoryKind::Timer, text.clone());
        self.log.record(
            ActionRecord::new(
                ActionKind::Timer,
                id,
                Some(snaps.before),
                Some(snaps.after),
                format!("{} on '{}'", text, current.title),
            )
            .with_timer_delta(delta_minutes),
        );
        self.save_board();
        Ok(())
    }

    pub fn add_note(&mut self, id: TaskId, content: &str) -> Result<(), TaskError> {
        let snaps = self.store.add_note(id, content.to_string())?;
        self.append_history(id, HistoryKind::Note, "Note added".to_string());
        self.log.record(ActionRecord::new(
            ActionKind::Notes,
            id,
            Some(snaps.before),
            Some(snaps.after.clone()),
            format!("Added a note to '{}'", snaps.after.title),
        ));
        self.save_board();
        Ok(())
    }

    pub fn remove_note(&mut self, id: TaskId, index: usize) -> Result<(), TaskError> {
        let snaps = self.store.remove_note(id, index)?;
        self.append_history(id, HistoryKind::Note, "Note removed".to_string());
        self.log.record(ActionRecord::new(
            ActionKind::Notes,
            id,
            Some(snaps.before),
            Some(snaps.after.clone()),
            format!("Removed a note from '{}'", snaps.after.title),
        ));
        self.save_board();
        Ok(())
    }

    /// Soft-delete a task: the record stays in the store flagged deleted, a
    /// snapshot goes to the trash, and the deletion lands on the undo
    /// stack. Undo and trash restore are two independent recovery paths.
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        let snaps = self.store.soft_delete(id)?;
        self.trash.move_to_trash(snaps.after.snapshot());
        self.log.record(ActionRecord::new(
            ActionKind::Delete,
            id,
            Some(snaps.before.clone()),
            None,
            format!("Deleted '{}'", snaps.before.title),
        ));
        self.save_board();
        self.save_trash();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<UndoOutcome, TaskError> {
        let outcome = self.log.undo(&mut self.store)?;
        if let UndoOutcome::Applied { events, .. } = &outcome {
            self.notifier.emit_all(events);
            self.save_board();
        }
        Ok(outcome)
    }

    pub fn redo(&mut self) -> Result<UndoOutcome, TaskError> {
        let outcome = self.log.redo(&mut self.store)?;
        if let UndoOutcome::Applied { events, .. } = &outcome {
            self.notifier.emit_all(events);
            self.save_board();
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Trash
    // -----------------------------------------------------------------------

    /// Bring a trashed task back to the board. Does not touch the undo
    /// stacks; the two recovery paths stay independent.
    pub fn restore_from_trash(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let task = self.trash.restore(id).ok_or(TaskError::NotFound(id))?;
        self.store.insert(task.snapshot());
        self.save_board();
        self.save_trash();
        Ok(task)
    }

    /// Drop a trashed task for good, purging its soft-deleted record from
    /// the store if one is still there.
    pub fn permanently_delete(&mut self, id: TaskId) -> bool {
        let removed = self.trash.permanently_delete(id);
        if removed {
            if self.store.find(id).is_some_and(|t| t.deleted) {
                self.store.purge(id);
                self.save_board();
            }
            self.save_trash();
        }
        removed
    }

    /// Permanently delete everything in the trash
    pub fn empty_trash(&mut self) {
        let ids: Vec<TaskId> = self.trash.trashed().map(|entry| entry.task.id).collect();
        for id in ids {
            if self.store.find(id).is_some_and(|t| t.deleted) {
                self.store.purge(id);
            }
        }
        self.trash.empty();
        self.save_board();
        self.save_trash();
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.find(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.store.all()
    }

    /// Ordered card ids for one column
    pub fn sorted_column(&self, column: Column) -> Vec<TaskId> {
        sort::sort_column(column, self.store.all())
    }

    pub fn is_visible(&self, task: &Task, filter: &FilterState) -> bool {
        filter::is_visible(task, filter, &self.tag_registry)
    }

    /// Per-column visible/total counts under the active filter
    pub fn counts(&self, filter: &FilterState) -> IndexMap<Column, ColumnCount> {
        let tasks: Vec<&Task> = self.store.all().collect();
        filter::column_counts(&tasks, filter, &self.tag_registry)
    }

    pub fn trash_entries(&self) -> Vec<&TrashEntry> {
        self.trash.trashed().collect()
    }

    pub fn trash_count(&self) -> usize {
        self.trash.count()
    }

    pub fn undo_depth(&self) -> usize {
        self.log.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.log.redo_depth()
    }

    /// The warning from the most recent failed save, if the last save
    /// failed. Cleared by the next successful save.
    pub fn persist_warning(&self) -> Option<&str> {
        self.persist_warning.as_deref()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save_board(&mut self) {
        match persist::save_store(self.kv.as_mut(), &self.store) {
            Ok(()) => self.persist_warning = None,
            Err(e) => {
                self.persist_warning =
                    Some(format!("could not save board: {}; changes kept in memory", e));
            }
        }
    }

    fn save_trash(&mut self) {
        if let Err(e) = persist::save_trash(self.kv.as_mut(), &self.trash) {
            self.persist_warning =
                Some(format!("could not save trash: {}; changes kept in memory", e));
        }
    }

    fn append_history(&mut self, id: TaskId, kind: HistoryKind, text: String) {
        // the record was just mutated, so the id is known to be live
        let _ = self.store.append_history(id, kind, text);
    }
}
