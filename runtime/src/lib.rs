//! # Todo Sync Runtime
//!
//! Runtime implementation for the todo-sync client.
//!
//! This crate provides the Store runtime that owns the application state,
//! serialises every change through the reducer and executes the effects the
//! reducer returns.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, runs the reducer, executes effects
//! - **Effect Executor**: Runs effect descriptions on tokio and feeds resulting actions back
//! - **Cancellation registry**: Tracks cancellable effects by [`EffectId`]
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_runtime::Store;
//!
//! let store = Store::new(AppState::default(), TodoReducer::new(), environment);
//!
//! // Send an action
//! store.send(TodoAction::FilterBy(Filter::Active)).await?;
//!
//! // Read state
//! let filter = store.state(|s| s.filter).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use todo_sync_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use tokio::sync::RwLock;
use tokio::task::{AbortHandle, JoinHandle};

pub use error::StoreError;
pub use store::Store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after `shutdown()`.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effects did not complete within the requested time
        #[error("Timeout waiting for effects to complete")]
        Timeout,
    }
}

/// Boxed effect execution future
type EffectFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Running cancellable effects keyed by id
type Cancellables = Arc<Mutex<HashMap<EffectId, AbortHandle>>>;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. Actions fed back by those effects start their own effects,
/// which are not tracked by this handle.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
pub struct EffectHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl EffectHandle {
    /// Create a handle that's already complete
    #[must_use]
    pub const fn completed() -> Self {
        Self { tasks: Vec::new() }
    }

    fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Number of tracked effects that have not finished yet
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Wait for all tracked effects to complete
    ///
    /// Cancelled effects count as complete.
    pub async fn wait(&mut self) {
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(()) => {},
                Err(error) if error.is_cancelled() => {
                    tracing::trace!("Effect cancelled before completion");
                },
                Err(error) => {
                    tracing::error!(error = %error, "Effect task failed");
                },
            }
        }
    }

    /// Wait for all tracked effects, giving up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("tracked", &self.tasks.len())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Store module - the runtime coordinator
pub mod store {
    use super::{
        AbortHandle, Arc, AtomicBool, Cancellables, Effect, EffectFuture, EffectHandle, EffectId,
        HashMap, Mutex, Ordering, PoisonError, Reducer, RwLock, StoreError,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` so every write goes through the reducer)
    /// 2. Reducer
    /// 3. Environment (injected settings)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Cloning a Store is cheap; clones share the same state.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        cancellables: Cancellables,
        shutdown: Arc<AtomicBool>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                cancellables: Arc::new(Mutex::new(HashMap::new())),
                shutdown: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Starts the returned effects, then releases the lock
        ///
        /// `send()` returns once effects are started, not completed. Use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let handle = self.send_with(move |_| Some(action)).await?;
            Ok(handle.unwrap_or_else(EffectHandle::completed))
        }

        /// Derive an action from the current state and reduce it atomically
        ///
        /// `f` runs under the same write lock as the reducer, so no other
        /// action can be reduced between reading the state and applying the
        /// derived action. Returning `None` dispatches nothing and yields
        /// `Ok(None)`.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, f), name = "store_send")]
        pub async fn send_with<F>(&self, f: F) -> Result<Option<EffectHandle>, StoreError>
        where
            F: FnOnce(&S) -> Option<A> + Send,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Rejecting action, store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let mut state = self.state.write().await;
            let Some(action) = f(&*state) else {
                tracing::trace!("No action derived from current state");
                return Ok(None);
            };
            metrics::counter!("store.actions.dispatched").increment(1);
            let effects = self
                .reducer
                .reduce(&mut *state, action, self.environment.as_ref());

            // Effects start before the guard drops so a replaced timer that
            // already fired is aborted while it waits for the lock
            let mut handle = EffectHandle::completed();
            for effect in effects {
                self.execute_effect(effect, &mut handle);
            }
            drop(state);
            Ok(Some(handle))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.todos.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Stop accepting actions and abort every running cancellable effect
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::Release);

            let mut cancellables = self
                .cancellables
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let count = cancellables.len();
            for (_, running) in cancellables.drain() {
                running.abort();
            }
            tracing::info!(cancelled = count, "Store shut down");
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Start an effect, tracking spawned work in `handle`
        ///
        /// `Cancel` is applied immediately so that it takes effect before
        /// `send()` returns.
        fn execute_effect(&self, effect: Effect<A>, handle: &mut EffectHandle) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Cancel(id) => {
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    self.cancel(id);
                },
                Effect::Cancellable { id, effect } => {
                    metrics::counter!("store.effects.executed", "type" => "cancellable")
                        .increment(1);
                    let task = tokio::spawn(self.run_effect(*effect));
                    self.register(id, task.abort_handle());
                    handle.push(task);
                },
                effect @ Effect::Delay { .. } => {
                    handle.push(tokio::spawn(self.run_effect(effect)));
                },
            }
        }

        /// Run an effect to completion
        fn run_effect(&self, effect: Effect<A>) -> EffectFuture {
            let store = self.clone();

            Box::pin(async move {
                match effect {
                    Effect::Delay { duration, action } => {
                        tracing::trace!(?duration, "Executing Effect::Delay");
                        metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                        tokio::time::sleep(duration).await;
                        if let Err(error) = store.send(*action).await {
                            tracing::debug!(%error, "Delayed action dropped");
                        }
                    },
                    other => {
                        let mut handle = EffectHandle::completed();
                        store.execute_effect(other, &mut handle);
                        handle.wait().await;
                    },
                }
            })
        }

        fn register(&self, id: EffectId, running: AbortHandle) {
            let previous = self
                .cancellables
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, running);

            if let Some(previous) = previous {
                if !previous.is_finished() {
                    tracing::debug!(effect_id = %id, "Replacing running cancellable effect");
                    metrics::counter!("store.effects.cancelled").increment(1);
                }
                previous.abort();
            }
        }

        fn cancel(&self, id: EffectId) {
            let running = self
                .cancellables
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);

            match running {
                Some(running) if !running.is_finished() => {
                    tracing::debug!(effect_id = %id, "Cancelling effect");
                    metrics::counter!("store.effects.cancelled").increment(1);
                    running.abort();
                },
                _ => tracing::trace!(effect_id = %id, "Nothing to cancel"),
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                cancellables: Arc::clone(&self.cancellables),
                shutdown: Arc::clone(&self.shutdown),
            }
        }
    }
}
