//! # Todo Sync Testing
//!
//! Testing utilities and helpers for the todo-sync client.
//!
//! This crate provides:
//! - [`ReducerTest`]: a Given-When-Then builder for reducer unit tests
//! - [`assertions`]: helpers for checking the effects a reducer returned
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(TodoReducer::new())
//!     .with_env(TodoEnvironment::default())
//!     .given_state(AppState::default())
//!     .when_action(TodoAction::FilterBy(Filter::Active))
//!     .then_state(|state| assert_eq!(state.filter, Filter::Active))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{ReducerTest, assertions};
