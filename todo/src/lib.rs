//! Todo list client kept in sync with a remote REST collection.
//!
//! One user's todos live on a server; this crate holds the client-side view
//! of them and runs the flows that change them:
//!
//! - [`types`]: todos, filter, error kinds, [`AppState`] and [`TodoAction`]
//! - [`reducer`]: the only mutation path for [`AppState`]; schedules the
//!   error banner expiry as a cancellable effect
//! - [`api`]: [`TodoRepository`] and its HTTP implementation
//! - [`flows`]: [`TodoApp`], which marks todos loading, calls the repository
//!   and reconciles the answers
//! - [`view`] and [`command`]: the terminal front end
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo_sync::{Config, HttpTodoRepository, TodoApp, TodoEnvironment};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let repository = HttpTodoRepository::from_config(&config.api)?;
//! let app = TodoApp::new(
//!     Arc::new(repository),
//!     config.api.user_id,
//!     TodoEnvironment::new(config.ui.error_display()),
//! );
//!
//! app.load().await?;
//! app.create("Buy milk").await?;
//! app.toggle_all().await?;
//!
//! print!("{}", todo_sync::view::render(&app.snapshot().await));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod command;
pub mod config;
pub mod flows;
pub mod reconcile;
pub mod reducer;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use api::{HttpTodoRepository, NetworkError, TodoPatch, TodoRepository};
pub use config::Config;
pub use flows::{BulkOutcome, FlowOutcome, LoadOutcome, TodoApp, TodoStore};
pub use reducer::{TodoEnvironment, TodoReducer};
pub use todo_sync_runtime::StoreError;
pub use types::{AppState, ErrorKind, Filter, Todo, TodoAction, TodoId, UserId};
