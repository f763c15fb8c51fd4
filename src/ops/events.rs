use crate::model::task::{Column, TaskId};

/// Events published after undo/redo application so a renderer can relocate
/// or repaint cards. The engine never calls into rendering directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A record came back into existence (delete undone, create redone)
    TaskRestored { id: TaskId },
    /// A record left the board (create undone, delete redone)
    TaskRemoved { id: TaskId },
    /// A record's fields were overwritten in place. `old_column` is set
    /// when the application moved the card to a different column.
    TaskUpdated {
        id: TaskId,
        old_column: Option<Column>,
    },
}

/// Typed observer registration. Subscribers receive every published event;
/// the publisher knows nothing about their internals.
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Box<dyn Fn(&EngineEvent)>>,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: Box<dyn Fn(&EngineEvent)>) {
        self.subscribers.push(callback);
    }

    pub fn emit(&self, event: &EngineEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    pub fn emit_all(&self, events: &[EngineEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}
