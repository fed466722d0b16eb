//! Flow controllers: user gestures turned into repository calls and actions.
//!
//! Each flow follows the same shape: mark the affected ids as loading, talk
//! to the repository, apply the result (or report an error), then unmark the
//! ids. Unmarking always runs, also when applying the result fails.
//!
//! Loading ids are added and removed relative to the state current at
//! dispatch time (see [`Store::send_with`]), so concurrent flows on different
//! todos never clobber each other's markers.

use crate::api::{TodoPatch, TodoRepository};
use crate::reconcile::{self, Settled};
use crate::reducer::{TodoEnvironment, TodoReducer};
use crate::types::{AppState, ErrorKind, Filter, Todo, TodoAction, TodoId, UserId};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use todo_sync_runtime::{Store, StoreError};

/// Store specialised for the todo client
pub type TodoStore = Store<AppState, TodoAction, TodoEnvironment, TodoReducer>;

/// How a single-todo flow ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The server accepted the change and the state reflects it
    Applied,
    /// The request failed; the state kept its previous value and an error is shown
    RolledBack,
    /// Nothing was sent: the todo is unknown, busy, or nothing changed
    Ignored,
    /// Input was invalid; an error is shown and nothing was sent
    Rejected,
}

impl FlowOutcome {
    /// Short label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::RolledBack => "rolled_back",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
        }
    }
}

/// How the initial load ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list was fetched; holds the number of todos received
    Loaded(usize),
    /// The list could not be fetched
    Failed,
    /// A load was already started this session
    AlreadyStarted,
}

/// Per-todo tally of a bulk flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Requests that succeeded
    pub succeeded: usize,
    /// Requests that failed
    pub failed: usize,
}

impl BulkOutcome {
    fn from_results<T>(results: &[Settled<T>]) -> Self {
        let failed = reconcile::failures(results);
        Self {
            succeeded: results.len() - failed,
            failed,
        }
    }

    /// Whether the batch was empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.succeeded == 0 && self.failed == 0
    }
}

fn record(flow: &'static str, outcome: &'static str) {
    metrics::counter!("todo.flows.completed", "flow" => flow, "outcome" => outcome).increment(1);
}

/// The todo client: state store plus repository for one user
///
/// This is the application context handed to the presentation layer. All
/// methods take `&self`, so an `Arc<TodoApp>` can run several flows at once.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use todo_sync::api::MockTodoRepository;
/// use todo_sync::flows::{FlowOutcome, TodoApp};
/// use todo_sync::reducer::TodoEnvironment;
/// use todo_sync::types::UserId;
///
/// # async fn example() -> Result<(), todo_sync::StoreError> {
/// let user = UserId::new(854);
/// let app = TodoApp::new(
///     Arc::new(MockTodoRepository::new(user)),
///     user,
///     TodoEnvironment::default(),
/// );
///
/// app.load().await?;
/// assert_eq!(app.create("  buy milk ").await?, FlowOutcome::Applied);
/// assert_eq!(app.snapshot().await.todos[0].title, "buy milk");
/// # Ok(())
/// # }
/// ```
pub struct TodoApp {
    store: TodoStore,
    repository: Arc<dyn TodoRepository>,
    user_id: UserId,
    load_started: AtomicBool,
}

impl TodoApp {
    /// Create an app with an empty state
    #[must_use]
    pub fn new(
        repository: Arc<dyn TodoRepository>,
        user_id: UserId,
        environment: TodoEnvironment,
    ) -> Self {
        Self::with_state(AppState::new(), repository, user_id, environment)
    }

    /// Create an app starting from `state`
    #[must_use]
    pub fn with_state(
        state: AppState,
        repository: Arc<dyn TodoRepository>,
        user_id: UserId,
        environment: TodoEnvironment,
    ) -> Self {
        Self {
            store: Store::new(state, TodoReducer::new(), environment),
            repository,
            user_id,
            load_started: AtomicBool::new(false),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> AppState {
        self.store.state(AppState::clone).await
    }

    /// Stop accepting actions and cancel the pending error clear
    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    /// Fetch the todo list; runs at most once per app
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        if self.load_started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Load already started, skipping");
            return Ok(LoadOutcome::AlreadyStarted);
        }

        let outcome = match self.repository.list().await {
            Ok(todos) => {
                let count = todos.len();
                self.dispatch(TodoAction::SetTodos(todos)).await?;
                tracing::info!(count, "Loaded todos");
                LoadOutcome::Loaded(count)
            },
            Err(error) => {
                tracing::warn!(%error, "Failed to load todos");
                self.show_error(ErrorKind::TasksLoadFailed).await?;
                LoadOutcome::Failed
            },
        };

        record("load", if outcome == LoadOutcome::Failed { "rolled_back" } else { "applied" });
        Ok(outcome)
    }

    /// Create a todo titled `title` (trimmed)
    ///
    /// A blank title shows [`ErrorKind::EmptyTitle`] without a request. While
    /// a creation is in flight further calls are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, title: &str) -> Result<FlowOutcome, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            self.show_error(ErrorKind::EmptyTitle).await?;
            record("create", FlowOutcome::Rejected.as_str());
            return Ok(FlowOutcome::Rejected);
        }

        let placeholder = Todo::placeholder(self.user_id, title);
        let started = self
            .store
            .send_with(move |state| {
                (!state.is_creating()).then(|| TodoAction::AddTempTodo(Some(placeholder)))
            })
            .await?
            .is_some();
        if !started {
            tracing::debug!("Creation already in flight, ignoring");
            return Ok(FlowOutcome::Ignored);
        }

        let outcome = self.create_placeholder(title).await;

        let cleared = self.dispatch(TodoAction::AddTempTodo(None)).await;
        let unmarked = self.unmark_loading(&[TodoId::PLACEHOLDER]).await;
        let outcome = unmarked.and(cleared).and(outcome)?;

        record("create", outcome.as_str());
        Ok(outcome)
    }

    async fn create_placeholder(&self, title: &str) -> Result<FlowOutcome, StoreError> {
        self.mark_loading(&[TodoId::PLACEHOLDER]).await?;

        match self.repository.create(title.to_string(), false).await {
            Ok(todo) => {
                tracing::debug!(id = %todo.id, "Todo created");
                self.dispatch(TodoAction::AddTodo(todo)).await?;
                Ok(FlowOutcome::Applied)
            },
            Err(error) => {
                tracing::warn!(%error, "Failed to create todo");
                self.show_error(ErrorKind::TaskCreateFailed).await?;
                Ok(FlowOutcome::RolledBack)
            },
        }
    }

    /// Flip the completion flag of `id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    pub async fn toggle(&self, id: TodoId) -> Result<FlowOutcome, StoreError> {
        let Some(completed) = self.store.state(|s| s.get(id).map(|t| t.completed)).await else {
            return Ok(FlowOutcome::Ignored);
        };
        self.update(id, TodoPatch::completed(!completed)).await
    }

    /// Rename `id`; a blank title deletes the todo instead
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    pub async fn rename(&self, id: TodoId, title: &str) -> Result<FlowOutcome, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return self.delete(id).await;
        }

        let unchanged = self
            .store
            .state(|s| s.get(id).is_none_or(|todo| todo.title == title))
            .await;
        if unchanged {
            return Ok(FlowOutcome::Ignored);
        }
        self.update(id, TodoPatch::title(title)).await
    }

    /// Send `patch` for `id` and merge the server's answer
    ///
    /// Ignored when `id` is unknown or already has a request in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<FlowOutcome, StoreError> {
        if patch.is_empty() || !self.claim(id).await? {
            return Ok(FlowOutcome::Ignored);
        }

        let outcome = match self.repository.update(id, patch).await {
            Ok(updated) => self
                .store
                .send_with(move |state| {
                    Some(TodoAction::SetTodos(reconcile::replace_todo(&state.todos, updated)))
                })
                .await
                .map(|_| FlowOutcome::Applied),
            Err(error) => {
                tracing::warn!(%error, "Failed to update todo");
                self.show_error(ErrorKind::TaskUpdateFailed)
                    .await
                    .map(|()| FlowOutcome::RolledBack)
            },
        };

        let outcome = self.unmark_loading(&[id]).await.and(outcome)?;
        record("update", outcome.as_str());
        Ok(outcome)
    }

    /// Delete `id`
    ///
    /// Ignored when `id` is unknown or already has a request in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: TodoId) -> Result<FlowOutcome, StoreError> {
        if !self.claim(id).await? {
            return Ok(FlowOutcome::Ignored);
        }

        let outcome = match self.repository.remove(id).await {
            Ok(()) => self
                .store
                .send_with(move |state| {
                    Some(TodoAction::SetTodos(reconcile::without(&state.todos, id)))
                })
                .await
                .map(|_| FlowOutcome::Applied),
            Err(error) => {
                tracing::warn!(%error, "Failed to delete todo");
                self.show_error(ErrorKind::TaskDeleteFailed)
                    .await
                    .map(|()| FlowOutcome::RolledBack)
            },
        };

        let outcome = self.unmark_loading(&[id]).await.and(outcome)?;
        record("delete", outcome.as_str());
        Ok(outcome)
    }

    /// Complete every todo, or uncomplete all of them if all are done
    ///
    /// Only todos not already at the target value are sent. Failed updates
    /// keep their todo unchanged and produce a single error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_all(&self) -> Result<BulkOutcome, StoreError> {
        let (target, ids) = self
            .store
            .state(|state| {
                let target = state.toggle_all_target();
                let ids: Vec<TodoId> = state
                    .todos
                    .iter()
                    .filter(|todo| todo.completed != target)
                    .map(|todo| todo.id)
                    .collect();
                (target, ids)
            })
            .await;
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        tracing::debug!(target, count = ids.len(), "Toggling todos");
        self.mark_loading(&ids).await?;

        let results: Vec<Settled<Todo>> = join_all(ids.iter().map(|&id| async move {
            (id, self.repository.update(id, TodoPatch::completed(target)).await)
        }))
        .await;
        let outcome = BulkOutcome::from_results(&results);

        let reported = if outcome.failed > 0 {
            tracing::warn!(failed = outcome.failed, "Some todos could not be updated");
            self.show_error(ErrorKind::TaskUpdateFailed).await
        } else {
            Ok(())
        };
        let applied = self
            .store
            .send_with(|state| {
                Some(TodoAction::SetTodos(reconcile::reconcile_toggle(
                    &state.todos,
                    &results,
                    target,
                )))
            })
            .await;

        self.unmark_loading(&ids).await?;
        reported?;
        applied?;

        metrics::counter!("todo.bulk.requests", "flow" => "toggle_all", "result" => "failed")
            .increment(outcome.failed as u64);
        Ok(outcome)
    }

    /// Delete every completed todo
    ///
    /// Failed removals keep their todo and produce a single error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn clear_completed(&self) -> Result<BulkOutcome, StoreError> {
        let ids: Vec<TodoId> = self
            .store
            .state(|state| {
                state
                    .todos
                    .iter()
                    .filter(|todo| todo.completed)
                    .map(|todo| todo.id)
                    .collect()
            })
            .await;
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        tracing::debug!(count = ids.len(), "Clearing completed todos");
        self.mark_loading(&ids).await?;

        let results: Vec<Settled<()>> = join_all(
            ids.iter()
                .map(|&id| async move { (id, self.repository.remove(id).await) }),
        )
        .await;
        let outcome = BulkOutcome::from_results(&results);

        let reported = if outcome.failed > 0 {
            tracing::warn!(failed = outcome.failed, "Some todos could not be deleted");
            self.show_error(ErrorKind::TaskDeleteFailed).await
        } else {
            Ok(())
        };
        let applied = self
            .store
            .send_with(|state| {
                Some(TodoAction::SetTodos(reconcile::reconcile_removed(
                    &state.todos,
                    &results,
                )))
            })
            .await;

        self.unmark_loading(&ids).await?;
        reported?;
        applied?;

        metrics::counter!("todo.bulk.requests", "flow" => "clear_completed", "result" => "failed")
            .increment(outcome.failed as u64);
        Ok(outcome)
    }

    /// Change the list filter
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    pub async fn set_filter(&self, filter: Filter) -> Result<(), StoreError> {
        self.dispatch(TodoAction::FilterBy(filter)).await
    }

    /// Hide the error banner and cancel its scheduled clear
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is shutting down.
    pub async fn dismiss_error(&self) -> Result<(), StoreError> {
        self.dispatch(TodoAction::SetError(None)).await
    }

    async fn dispatch(&self, action: TodoAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(drop)
    }

    async fn show_error(&self, kind: ErrorKind) -> Result<(), StoreError> {
        self.dispatch(TodoAction::SetError(Some(kind))).await
    }

    /// Mark `id` loading unless it is unknown or already loading
    async fn claim(&self, id: TodoId) -> Result<bool, StoreError> {
        let claimed = self
            .store
            .send_with(move |state| {
                if !state.contains(id) || state.is_loading(id) {
                    return None;
                }
                let mut loading = state.loading.clone();
                loading.insert(id);
                Some(TodoAction::LoadingTodos(loading))
            })
            .await?
            .is_some();

        if !claimed {
            tracing::debug!(%id, "Todo unknown or busy, ignoring");
        }
        Ok(claimed)
    }

    async fn mark_loading(&self, ids: &[TodoId]) -> Result<(), StoreError> {
        self.store
            .send_with(|state| {
                let mut loading = state.loading.clone();
                loading.extend(ids.iter().copied());
                Some(TodoAction::LoadingTodos(loading))
            })
            .await
            .map(drop)
    }

    async fn unmark_loading(&self, ids: &[TodoId]) -> Result<(), StoreError> {
        self.store
            .send_with(|state| {
                if !ids.iter().any(|id| state.is_loading(*id)) {
                    return None;
                }
                let mut loading = state.loading.clone();
                for id in ids {
                    loading.remove(id);
                }
                Some(TodoAction::LoadingTodos(loading))
            })
            .await
            .map(drop)
    }
}

impl std::fmt::Debug for TodoApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoApp")
            .field("user_id", &self.user_id)
            .field("load_started", &self.load_started)
            .finish_non_exhaustive()
    }
}
