use std::cmp::Reverse;

use crate::model::task::{Column, Priority, Task, TaskId};

/// Numeric rank for a priority within a column. The tables differ on
/// purpose: in the intake column untriaged cards float to the top, while
/// every other column orders triaged work first and sinks untagged cards.
pub fn priority_rank(column: Column, priority: Priority) -> u8 {
    match column {
        Column::Todo => match priority {
            Priority::None => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        },
        _ => match priority {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
            Priority::None => 3,
        },
    }
}

/// Order a column's cards: rank ascending, then newest id first. Ids are
/// assigned in creation order, so the tie-break approximates "most
/// recently created first" within a priority tier.
pub fn sort_column<'a>(
    column: Column,
    tasks: impl IntoIterator<Item = &'a Task>,
) -> Vec<TaskId> {
    let mut cards: Vec<&Task> = tasks
        .into_iter()
        .filter(|task| task.column == column)
        .collect();
    cards.sort_by_key(|task| (priority_rank(column, task.priority), Reverse(task.id)));
    cards.into_iter().map(|task| task.id).collect()
}
