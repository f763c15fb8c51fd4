use crate::io::kv::{KvError, KvStore};
use crate::ops::store::TaskStore;
use crate::ops::trash::Trash;

/// Key the board (task store) is persisted under
pub const BOARD_KEY: &str = "board";
/// Key the trash is persisted under. The undo/redo stacks are
/// deliberately not persisted; they live and die with the session.
pub const TRASH_KEY: &str = "trash";

/// Load the task store; a missing or unreadable key yields a fresh one
pub fn load_store(kv: &dyn KvStore) -> TaskStore {
    let mut store: TaskStore = kv
        .get(BOARD_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();
    // keep id assignment ahead of whatever was stored
    store.ensure_next_id();
    store
}

/// Load the trash; a missing or unreadable key yields an empty one
pub fn load_trash(kv: &dyn KvStore) -> Trash {
    kv.get(TRASH_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

pub fn save_store(kv: &mut dyn KvStore, store: &TaskStore) -> Result<(), KvError> {
    kv.set(BOARD_KEY, serde_json::to_value(store)?)
}

pub fn save_trash(kv: &mut dyn KvStore, trash: &Trash) -> Result<(), KvError> {
    kv.set(TRASH_KEY, serde_json::to_value(trash)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::kv::MemStore;
    use crate::model::task::{Column, Task, TaskId};
    use crate::ops::store::NewTask;

    #[test]
    fn store_round_trip() {
        let mut kv = MemStore::new();
        let mut store = TaskStore::new();
        store
            .create(NewTask {
                title: "Persisted".into(),
                ..Default::default()
            })
            .unwrap();
        save_store(&mut kv, &store).unwrap();

        let loaded = load_store(&kv);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.find(TaskId(1)).unwrap().title, "Persisted");
    }

    #[test]
    fn loaded_store_continues_id_sequence() {
        let mut kv = MemStore::new();
        let mut store = TaskStore::new();
        for i in 0..3 {
            store
                .create(NewTask {
                    title: format!("Task {}", i),
                    ..Default::default()
                })
                .unwrap();
        }
        save_store(&mut kv, &store).unwrap();

        let mut loaded = load_store(&kv);
        let task = loaded
            .create(NewTask {
                title: "Next".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(task.id, TaskId(4));
    }

    #[test]
    fn missing_keys_yield_fresh_state() {
        let kv = MemStore::new();
        assert!(load_store(&kv).is_empty());
        assert_eq!(load_trash(&kv).count(), 0);
    }

    #[test]
    fn malformed_board_yields_fresh_state() {
        let mut kv = MemStore::new();
        kv.set(BOARD_KEY, serde_json::json!("not a board")).unwrap();
        assert!(load_store(&kv).is_empty());
    }

    #[test]
    fn trash_round_trip() {
        let mut kv = MemStore::new();
        let mut trash = Trash::new();
        trash.move_to_trash(Task::new(TaskId(5), "Binned".into(), Column::Todo));
        save_trash(&mut kv, &trash).unwrap();

        let loaded = load_trash(&kv);
        assert_eq!(loaded.count(), 1);
        assert!(loaded.contains(TaskId(5)));
    }
}
