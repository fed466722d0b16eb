//! Reducer for the todo client state.
//!
//! Every action replaces one field of [`AppState`] wholesale. Working out
//! *what* changed (which todo was added, which ids are loading) is left to
//! the flow controllers; the reducer only keeps the state invariants and
//! schedules the error banner expiry.

use crate::types::{AppState, ErrorKind, Todo, TodoAction, TodoId};
use std::collections::HashSet;
use std::time::Duration;
use todo_sync_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec, SmallVec,
};

/// Cancellation key of the scheduled error clear
pub const ERROR_EXPIRY: EffectId = EffectId::new("error-expiry");

/// How long an error stays visible unless dismissed
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_millis(3000);

/// Environment for the todo reducer
#[derive(Clone, Debug)]
pub struct TodoEnvironment {
    /// Time after which a shown error is cleared
    pub error_display: Duration,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub const fn new(error_display: Duration) -> Self {
        Self { error_display }
    }
}

impl Default for TodoEnvironment {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_DISPLAY)
    }
}

/// Reducer for [`AppState`]
#[derive(Clone, Debug)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Keeps the first todo for each id and drops placeholder ids
    fn dedupe(todos: Vec<Todo>) -> Vec<Todo> {
        let mut seen = HashSet::with_capacity(todos.len());
        let total = todos.len();

        let unique: Vec<Todo> = todos
            .into_iter()
            .filter(|todo| !todo.id.is_placeholder() && seen.insert(todo.id))
            .collect();

        if unique.len() != total {
            tracing::warn!(
                dropped = total - unique.len(),
                "Dropped todos with duplicate or placeholder ids"
            );
        }
        unique
    }

    /// Drops loading ids that no longer identify a todo
    fn prune_loading(state: &mut AppState) {
        let todos = &state.todos;
        state
            .loading
            .retain(|id| id.is_placeholder() || todos.iter().any(|todo| todo.id == *id));
    }

    fn add_todo(state: &mut AppState, todo: Todo) {
        if todo.id.is_placeholder() {
            tracing::warn!("Ignoring todo without a server-assigned id");
            return;
        }

        match state.todos.iter_mut().find(|existing| existing.id == todo.id) {
            Some(existing) => *existing = todo,
            None => state.todos.push(todo),
        }
    }

    fn set_error(
        state: &mut AppState,
        error: Option<ErrorKind>,
        env: &TodoEnvironment,
    ) -> SmallVec<[Effect<TodoAction>; 4]> {
        state.error = error;

        match error {
            Some(kind) => {
                tracing::debug!(error = ?kind, "Showing error");
                // A new cancellable under the same id restarts the timer
                smallvec![Effect::cancellable(
                    ERROR_EXPIRY,
                    Effect::delay(env.error_display, TodoAction::SetError(None)),
                )]
            },
            None => smallvec![Effect::Cancel(ERROR_EXPIRY)],
        }
    }
}

impl Default for TodoReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TodoReducer {
    type State = AppState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::SetTodos(todos) => {
                state.todos = Self::dedupe(todos);
                Self::prune_loading(state);
                SmallVec::new()
            },
            TodoAction::AddTodo(todo) => {
                Self::add_todo(state, todo);
                SmallVec::new()
            },
            TodoAction::AddTempTodo(todo) => {
                state.temp_todo = todo.map(|todo| Todo {
                    id: TodoId::PLACEHOLDER,
                    ..todo
                });
                SmallVec::new()
            },
            TodoAction::FilterBy(filter) => {
                state.filter = filter;
                SmallVec::new()
            },
            TodoAction::SetError(error) => Self::set_error(state, error, env),
            TodoAction::LoadingTodos(ids) => {
                state.loading = ids;
                Self::prune_loading(state);
                SmallVec::new()
            },
            TodoAction::Unknown => {
                tracing::trace!("Ignoring unknown action");
                SmallVec::new()
            },
        }
    }
}
