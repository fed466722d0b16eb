//! Plain-text rendering of the client state.

use crate::types::{AppState, Filter, Todo};
use std::fmt;

const LOADING_MARKER: &str = "…";

/// The list view of an [`AppState`], formatted with `Display`
///
/// The footer is only shown when there is at least one todo, and the error
/// banner only while an error is set.
#[derive(Debug, Clone, Copy)]
pub struct ListView<'a>(pub &'a AppState);

impl ListView<'_> {
    fn row(&self, f: &mut fmt::Formatter<'_>, todo: &Todo) -> fmt::Result {
        let check = if todo.completed { "[x]" } else { "[ ]" };
        let marker = if self.0.is_loading(todo.id) { LOADING_MARKER } else { "" };
        writeln!(f, "  {check} #{:<4} {}{marker}", todo.id.get(), todo.title)
    }

    fn footer(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        let left = state.active_count();
        let noun = if left == 1 { "item" } else { "items" };
        write!(f, "{left} {noun} left |")?;

        for filter in [Filter::All, Filter::Active, Filter::Completed] {
            if filter == state.filter {
                write!(f, " <{filter}>")?;
            } else {
                write!(f, " {filter}")?;
            }
        }
        if state.has_completed() {
            f.write_str(" | clear completed")?;
        }
        f.write_str("\n")
    }
}

impl fmt::Display for ListView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        f.write_str("todos\n")?;

        if !state.todos.is_empty() {
            let toggle = if state.all_completed() { "[x]" } else { "[ ]" };
            writeln!(f, "  {toggle} toggle all")?;
        }

        for todo in state.visible_todos() {
            self.row(f, todo)?;
        }
        if let Some(temp) = &state.temp_todo {
            self.row(f, temp)?;
        }

        if !state.todos.is_empty() {
            self.footer(f)?;
        }
        if let Some(error) = state.error {
            writeln!(f, "! {error}")?;
        }
        Ok(())
    }
}

/// Render `state` as it would appear in the list view
#[must_use]
pub fn render(state: &AppState) -> String {
    ListView(state).to_string()
}
