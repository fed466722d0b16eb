//! Pure reconciliation of repository results with the current todo list.
//!
//! Flows settle every request first and then compute the next list from the
//! per-todo outcomes. Nothing here touches the store or the network.

use crate::api::NetworkError;
use crate::types::{Todo, TodoId};
use std::collections::HashSet;

/// Outcome of one request in a batch
pub type Settled<T> = (TodoId, Result<T, NetworkError>);

/// Ids whose request succeeded
fn succeeded<T>(results: &[Settled<T>]) -> HashSet<TodoId> {
    results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(id, _)| *id)
        .collect()
}

/// Number of failed requests in `results`
#[must_use]
pub fn failures<T>(results: &[Settled<T>]) -> usize {
    results.iter().filter(|(_, result)| result.is_err()).count()
}

/// Applies `target` to every todo whose update succeeded
///
/// Todos whose update failed, or that were not part of the batch, keep
/// their current value.
#[must_use]
pub fn reconcile_toggle<T>(todos: &[Todo], results: &[Settled<T>], target: bool) -> Vec<Todo> {
    let updated = succeeded(results);

    todos
        .iter()
        .map(|todo| {
            if updated.contains(&todo.id) {
                todo.with_completed(target)
            } else {
                todo.clone()
            }
        })
        .collect()
}

/// Drops every todo whose removal succeeded
#[must_use]
pub fn reconcile_removed(todos: &[Todo], results: &[Settled<()>]) -> Vec<Todo> {
    let removed = succeeded(results);

    todos
        .iter()
        .filter(|todo| !removed.contains(&todo.id))
        .cloned()
        .collect()
}

/// Replaces the entry with `updated`'s id, keeping its position
///
/// A todo that is no longer in the list is not re-added.
#[must_use]
pub fn replace_todo(todos: &[Todo], updated: Todo) -> Vec<Todo> {
    todos
        .iter()
        .map(|todo| {
            if todo.id == updated.id {
                updated.clone()
            } else {
                todo.clone()
            }
        })
        .collect()
}

/// The list without `id`
#[must_use]
pub fn without(todos: &[Todo], id: TodoId) -> Vec<Todo> {
    todos.iter().filter(|todo| todo.id != id).cloned().collect()
}
