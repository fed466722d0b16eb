//! # Todo Sync Core
//!
//! Core traits and types for the todo-sync client.
//!
//! The client keeps a single application state that is only ever changed by a
//! reducer. Everything with a side effect (network calls, timers) lives
//! outside the reducer: network calls in the flow controllers, timers as
//! [`effect::Effect`] descriptions executed by the runtime `Store`.
//!
//! ## Core Concepts
//!
//! - **State**: The whole client-side snapshot (tasks, filter, loading ids, error)
//! - **Action**: Every input to the reducer
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected settings and dependencies
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for TodoReducer {
//!     type State = AppState;
//!     type Action = TodoAction;
//!     type Environment = TodoEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut AppState,
//!         action: TodoAction,
//!         env: &TodoEnvironment,
//!     ) -> SmallVec<[Effect<TodoAction>; 4]> {
//!         match action {
//!             TodoAction::FilterBy(filter) => {
//!                 state.filter = filter;
//!                 SmallVec::new()
//!             }
//!             _ => SmallVec::new(),
//!         }
//!     }
//! }
//! ```

pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold no I/O and are deterministic, which makes them testable without a
/// runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - the only code allowed to change state
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected settings this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected settings
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must be total: every action produces a valid next
        /// state, and the same `(state, action)` pair always produces the same
        /// next state and the same effect descriptions.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers and executed by the runtime.
/// Because they are plain data they can be compared in tests.
pub mod effect {
    use std::time::Duration;

    /// Identifier of a cancellable effect
    ///
    /// Two cancellable effects with the same id never run at the same time:
    /// starting the second one cancels the first.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Creates an effect id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// Returns the name of this id
        #[must_use]
        pub const fn as_str(&self) -> &'static str {
            self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Delayed action (timers, auto-expiry)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Run `effect` under `id`, cancelling any running effect with the same id
        Cancellable {
            /// Cancellation key
            id: EffectId,
            /// The effect to run
            effect: Box<Effect<Action>>,
        },

        /// Cancel the running effect registered under this id, if any
        Cancel(EffectId),
    }

    impl<Action> Effect<Action> {
        /// Dispatch `action` after `duration`
        #[must_use]
        pub fn delay(duration: Duration, action: Action) -> Self {
            Self::Delay {
                duration,
                action: Box::new(action),
            }
        }

        /// Wrap `effect` so that it can be cancelled or replaced through `id`
        #[must_use]
        pub fn cancellable(id: EffectId, effect: Self) -> Self {
            Self::Cancellable {
                id,
                effect: Box::new(effect),
            }
        }

        /// Returns true for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }
    }
}
