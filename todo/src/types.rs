//! Domain types for the todo client.
//!
//! The client mirrors one user's task list held by a remote REST collection.
//! [`AppState`] is the whole client-side snapshot; [`TodoAction`] is the set of
//! inputs the reducer understands.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// Server-assigned identifier of a todo
///
/// `0` is reserved for the placeholder shown while a creation request is in
/// flight and never identifies a stored todo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(u64);

impl TodoId {
    /// Id of the not-yet-created placeholder todo
    pub const PLACEHOLDER: Self = Self(0);

    /// Creates a `TodoId` from a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the placeholder id
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of the todo list, fixed for a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a `UserId` from a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo item, in the wire shape `{id, userId, title, completed}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Server-assigned identifier
    pub id: TodoId,
    /// Owner
    pub user_id: UserId,
    /// Title, non-empty after trimming
    pub title: String,
    /// Whether the todo is done
    pub completed: bool,
}

impl Todo {
    /// Creates a todo
    #[must_use]
    pub fn new(id: TodoId, user_id: UserId, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            completed,
        }
    }

    /// Creates the placeholder shown while a creation request is in flight
    #[must_use]
    pub fn placeholder(user_id: UserId, title: impl Into<String>) -> Self {
        Self::new(TodoId::PLACEHOLDER, user_id, title, false)
    }

    /// Returns a copy with `completed` set
    #[must_use]
    pub fn with_completed(&self, completed: bool) -> Self {
        Self {
            completed,
            ..self.clone()
        }
    }
}

/// Which todos the list shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Every todo
    #[default]
    All,
    /// Todos not yet completed
    Active,
    /// Completed todos
    Completed,
}

impl Filter {
    /// Whether `todo` is visible under this filter
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        })
    }
}

/// Returned when a filter name is not one of `all`, `active`, `completed`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown filter `{0}` (expected all, active or completed)")]
pub struct UnknownFilter(pub String);

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// User-facing failure shown in the error banner
///
/// The absence of an error is `None` in [`AppState::error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Initial list could not be fetched
    TasksLoadFailed,
    /// Creating a todo failed
    TaskCreateFailed,
    /// Updating one or more todos failed
    TaskUpdateFailed,
    /// Deleting one or more todos failed
    TaskDeleteFailed,
    /// A todo was submitted with a blank title
    EmptyTitle,
}

impl ErrorKind {
    /// Banner text
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TasksLoadFailed => "Unable to load todos",
            Self::TaskCreateFailed => "Unable to add a todo",
            Self::TaskUpdateFailed => "Unable to update a todo",
            Self::TaskDeleteFailed => "Unable to delete a todo",
            Self::EmptyTitle => "Title should not be empty",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Client-side application state
///
/// Invariants (kept by the reducer):
/// - `temp_todo`, when present, has the placeholder id and is not in `todos`
/// - `loading` only holds ids of members of `todos` or the placeholder id
/// - no two entries of `todos` share an id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Todos in arrival order
    pub todos: Vec<Todo>,
    /// Active list filter
    pub filter: Filter,
    /// Ids with a request in flight
    pub loading: BTreeSet<TodoId>,
    /// Error currently shown, if any
    pub error: Option<ErrorKind>,
    /// Placeholder for a creation request in flight
    pub temp_todo: Option<Todo>,
}

impl AppState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `todos`
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos,
            ..Self::default()
        }
    }

    /// Returns a todo by id
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn contains(&self, id: TodoId) -> bool {
        self.get(id).is_some()
    }

    /// Whether a request for `id` is in flight
    #[must_use]
    pub fn is_loading(&self, id: TodoId) -> bool {
        self.loading.contains(&id)
    }

    /// Whether a creation request is in flight
    #[must_use]
    pub const fn is_creating(&self) -> bool {
        self.temp_todo.is_some()
    }

    /// Todos shown under the active filter, in order
    pub fn visible_todos(&self) -> impl Iterator<Item = &Todo> {
        let filter = self.filter;
        self.todos.iter().filter(move |todo| filter.matches(todo))
    }

    /// Number of todos not yet completed ("items left")
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }

    /// Whether "clear completed" has anything to do
    #[must_use]
    pub fn has_completed(&self) -> bool {
        self.todos.iter().any(|todo| todo.completed)
    }

    /// Whether every todo is completed (and there is at least one)
    #[must_use]
    pub fn all_completed(&self) -> bool {
        !self.todos.is_empty() && self.todos.iter().all(|todo| todo.completed)
    }

    /// The `completed` value "toggle all" moves towards
    ///
    /// Completing takes priority: the target is `true` as soon as one todo is
    /// still active.
    #[must_use]
    pub fn toggle_all_target(&self) -> bool {
        self.todos.iter().any(|todo| !todo.completed)
    }
}

/// Actions understood by the reducer
///
/// Serialised as `{"type": ..., "payload": ...}`. Any unrecognised `type`
/// deserialises to [`TodoAction::Unknown`] whatever its payload, and the
/// reducer ignores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TodoAction {
    /// Replace the whole todo list
    SetTodos(Vec<Todo>),

    /// Append a todo
    AddTodo(Todo),

    /// Set or clear the creation placeholder
    AddTempTodo(Option<Todo>),

    /// Change the list filter
    FilterBy(Filter),

    /// Show an error, or clear it with `None`
    #[serde(rename = "error")]
    SetError(Option<ErrorKind>),

    /// Replace the set of ids with a request in flight
    LoadingTodos(BTreeSet<TodoId>),

    /// Any action this client does not know about
    Unknown,
}

fn parse_payload<T, E>(kind: &str, payload: serde_json::Value) -> Result<T, E>
where
    T: DeserializeOwned,
    E: de::Error,
{
    serde_json::from_value(payload)
        .map_err(|error| E::custom(format_args!("invalid `{kind}` payload: {error}")))
}

impl<'de> Deserialize<'de> for TodoAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Tagged {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            payload: serde_json::Value,
        }

        let Tagged { kind, payload } = Tagged::deserialize(deserializer)?;
        match kind.as_str() {
            "setTodos" => parse_payload(&kind, payload).map(Self::SetTodos),
            "addTodo" => parse_payload(&kind, payload).map(Self::AddTodo),
            "addTempTodo" => parse_payload(&kind, payload).map(Self::AddTempTodo),
            "filterBy" => parse_payload(&kind, payload).map(Self::FilterBy),
            "error" => parse_payload(&kind, payload).map(Self::SetError),
            "loadingTodos" => parse_payload(&kind, payload).map(Self::LoadingTodos),
            _ => Ok(Self::Unknown),
        }
    }
}
