//! In-memory [`TodoRepository`] for tests
//!
//! Behaves like the REST API (sequential ids, partial updates) and records
//! how it was called. Failures can be scripted per operation or per todo.

use super::{NetworkError, RepositoryFuture, TodoPatch, TodoRepository};
use crate::types::{Todo, TodoId, UserId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Server {
    todos: Vec<Todo>,
    next_id: u64,
    fail_list: bool,
    fail_create: bool,
    failing_updates: HashSet<TodoId>,
    failing_removals: HashSet<TodoId>,
    created_titles: Vec<String>,
}

#[derive(Debug, Default)]
struct Calls {
    list: AtomicUsize,
    create: AtomicUsize,
    remove: AtomicUsize,
    update: AtomicUsize,
}

fn server_error() -> NetworkError {
    NetworkError::Status {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

fn not_found(id: TodoId) -> NetworkError {
    NetworkError::Status {
        status: 404,
        message: format!("todo {id} not found"),
    }
}

/// Mock todo repository
///
/// Clones share the same server and counters.
///
/// # Example
///
/// ```
/// use todo_sync::api::{MockTodoRepository, TodoRepository};
/// use todo_sync::types::UserId;
///
/// # async fn example() {
/// let repository = MockTodoRepository::new(UserId::new(1));
/// repository.fail_create(true);
///
/// assert!(repository.create("x".to_string(), false).await.is_err());
/// assert_eq!(repository.create_calls(), 1);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MockTodoRepository {
    server: Arc<Mutex<Server>>,
    calls: Arc<Calls>,
    user_id: UserId,
    latency: Duration,
}

impl MockTodoRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            server: Arc::new(Mutex::new(Server {
                next_id: 1,
                ..Server::default()
            })),
            calls: Arc::new(Calls::default()),
            user_id,
            latency: Duration::ZERO,
        }
    }

    /// Seed the server with `todos`; new ids continue after the largest one
    #[must_use]
    pub fn with_todos(self, todos: Vec<Todo>) -> Self {
        {
            let mut server = self.lock();
            server.next_id = todos.iter().map(|t| t.id.get()).max().unwrap_or(0) + 1;
            server.todos = todos;
        }
        self
    }

    /// Delay every call by `latency` before it is answered
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `list` fail
    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    /// Make `create` fail
    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make `update` fail for `id`
    pub fn fail_update_for(&self, id: TodoId) {
        self.lock().failing_updates.insert(id);
    }

    /// Make `remove` fail for `id`
    pub fn fail_remove_for(&self, id: TodoId) {
        self.lock().failing_removals.insert(id);
    }

    /// Number of `list` calls
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls.list.load(Ordering::SeqCst)
    }

    /// Number of `create` calls
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    /// Number of `remove` calls
    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.calls.remove.load(Ordering::SeqCst)
    }

    /// Number of `update` calls
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    /// Titles received by `create`, in call order
    #[must_use]
    pub fn created_titles(&self) -> Vec<String> {
        self.lock().created_titles.clone()
    }

    /// Todos currently stored on the mock server
    #[must_use]
    pub fn server_todos(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn handle_list(&self) -> Result<Vec<Todo>, NetworkError> {
        let server = self.lock();
        if server.fail_list {
            return Err(server_error());
        }
        Ok(server
            .todos
            .iter()
            .filter(|todo| todo.user_id == self.user_id)
            .cloned()
            .collect())
    }

    fn handle_create(&self, title: String, completed: bool) -> Result<Todo, NetworkError> {
        let mut server = self.lock();
        server.created_titles.push(title.clone());
        if server.fail_create {
            return Err(server_error());
        }

        let todo = Todo::new(TodoId::new(server.next_id), self.user_id, title, completed);
        server.next_id += 1;
        server.todos.push(todo.clone());
        Ok(todo)
    }

    fn handle_remove(&self, id: TodoId) -> Result<(), NetworkError> {
        let mut server = self.lock();
        if server.failing_removals.contains(&id) {
            return Err(server_error());
        }

        let before = server.todos.len();
        server.todos.retain(|todo| todo.id != id);
        if server.todos.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn handle_update(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, NetworkError> {
        let mut server = self.lock();
        if server.failing_updates.contains(&id) {
            return Err(server_error());
        }

        let todo = server
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| not_found(id))?;
        *todo = patch.apply_to(todo);
        Ok(todo.clone())
    }
}

impl TodoRepository for MockTodoRepository {
    fn list(&self) -> RepositoryFuture<'_, Vec<Todo>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.respond().await;
            self.handle_list()
        })
    }

    fn create(&self, title: String, completed: bool) -> RepositoryFuture<'_, Todo> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.respond().await;
            self.handle_create(title, completed)
        })
    }

    fn remove(&self, id: TodoId) -> RepositoryFuture<'_, ()> {
        self.calls.remove.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.respond().await;
            self.handle_remove(id)
        })
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> RepositoryFuture<'_, Todo> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.respond().await;
            self.handle_update(id, &patch)
        })
    }
}
