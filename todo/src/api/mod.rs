//! Todo repository: the remote task collection behind the client.
//!
//! [`TodoRepository`] is the seam between flow controllers and the network.
//! [`HttpTodoRepository`] talks to the REST API; `MockTodoRepository`
//! (feature `test-utils`) is an in-memory stand-in for tests.
//!
//! Every operation is scoped to the session's single user. There is no retry
//! and no caching: callers issue one call per todo and combine the results.

use crate::types::{Todo, TodoId};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

pub mod error;
mod http;
#[cfg(feature = "test-utils")]
pub mod mock;

pub use error::NetworkError;
pub use http::HttpTodoRepository;
#[cfg(feature = "test-utils")]
pub use mock::MockTodoRepository;

/// Future returned by repository operations
pub type RepositoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, NetworkError>> + Send + 'a>>;

/// Partial update of a todo
///
/// Fields left as `None` are not sent and keep their server value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TodoPatch {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Patch changing only the title
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            completed: None,
        }
    }

    /// Patch changing only the completion flag
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            title: None,
            completed: Some(completed),
        }
    }

    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Returns `todo` with this patch applied
    #[must_use]
    pub fn apply_to(&self, todo: &Todo) -> Todo {
        Todo {
            title: self.title.clone().unwrap_or_else(|| todo.title.clone()),
            completed: self.completed.unwrap_or(todo.completed),
            ..todo.clone()
        }
    }
}

/// Remote todo collection for one user
///
/// Methods return boxed futures so the repository can be shared as
/// `Arc<dyn TodoRepository>` by the flow controllers.
pub trait TodoRepository: Send + Sync {
    /// All todos of the session's user
    fn list(&self) -> RepositoryFuture<'_, Vec<Todo>>;

    /// Create a todo; the returned todo carries the server-assigned id
    fn create(&self, title: String, completed: bool) -> RepositoryFuture<'_, Todo>;

    /// Delete a todo
    fn remove(&self, id: TodoId) -> RepositoryFuture<'_, ()>;

    /// Apply `patch` to a todo and return the updated todo
    fn update(&self, id: TodoId, patch: TodoPatch) -> RepositoryFuture<'_, Todo>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[test]
    fn patch_serialises_only_set_fields() {
        let json = serde_json::to_value(TodoPatch::completed(true)).unwrap();
        assert_eq!(json, serde_json::json!({"completed": true}));

        let json = serde_json::to_value(TodoPatch::title("x")).unwrap();
        assert_eq!(json, serde_json::json!({"title": "x"}));

        assert!(TodoPatch::default().is_empty());
    }

    #[test]
    fn patch_applies_to_todo() {
        let todo = Todo::new(TodoId::new(1), UserId::new(1), "a", false);

        let patched = TodoPatch::completed(true).apply_to(&todo);
        assert_eq!(patched, Todo::new(TodoId::new(1), UserId::new(1), "a", true));

        let patched = TodoPatch::title("b").apply_to(&todo);
        assert_eq!(patched.title, "b");
        assert!(!patched.completed);
    }
}
