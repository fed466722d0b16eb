//! Line-oriented commands for the terminal front end.
//!
//! Each command maps to one user gesture of the list view.

use crate::flows::TodoApp;
use crate::types::{Filter, TodoId, UnknownFilter};
use std::str::FromStr;
use thiserror::Error;
use todo_sync_runtime::StoreError;

/// Usage text shown by `help`
pub const HELP: &str = "\
commands:
  add <title>            create a todo
  toggle <id>            complete or reopen a todo
  rename <id> <title>    rename a todo (an empty title deletes it)
  rm <id>                delete a todo
  all                    complete all todos, or reopen all if all are done
  clear                  delete completed todos
  filter <all|active|completed>
  dismiss                hide the error banner
  list                   show the list
  help                   show this help
  quit                   exit";

/// A parsed user gesture
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create a todo
    Add(String),
    /// Flip a todo's completion
    Toggle(TodoId),
    /// Rename a todo
    Rename(TodoId, String),
    /// Delete a todo
    Remove(TodoId),
    /// Toggle every todo
    ToggleAll,
    /// Delete completed todos
    ClearCompleted,
    /// Change the filter
    Filter(Filter),
    /// Hide the error banner
    Dismiss,
    /// Print the list
    List,
    /// Print usage
    Help,
    /// Exit
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("empty command (try `help`)")]
    Empty,

    /// First word is not a known command
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    /// A required argument is missing
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Description of the missing argument
        argument: &'static str,
    },

    /// Todo id is not a number
    #[error("invalid todo id `{0}`")]
    InvalidId(String),

    /// Filter name is not recognised
    #[error(transparent)]
    Filter(#[from] UnknownFilter),
}

fn parse_id(command: &'static str, raw: Option<&str>) -> Result<TodoId, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument {
        command,
        argument: "a todo id",
    })?;
    raw.trim_start_matches('#')
        .parse()
        .map(TodoId::new)
        .map_err(|_| CommandError::InvalidId(raw.to_string()))
}

/// Split off the first whitespace-separated word
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

/// First word of `rest`, if any
fn argument(rest: &str) -> Option<&str> {
    let (word, _) = split_word(rest);
    (!word.is_empty()).then_some(word)
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, rest) = split_word(line);

        match name.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "add" | "new" => Ok(Self::Add(rest.to_string())),
            "toggle" | "t" => parse_id("toggle", argument(rest)).map(Self::Toggle),
            "rename" | "edit" => {
                let id = parse_id("rename", argument(rest))?;
                let (_, title) = split_word(rest);
                Ok(Self::Rename(id, title.to_string()))
            },
            "rm" | "delete" => parse_id("rm", argument(rest)).map(Self::Remove),
            "all" => Ok(Self::ToggleAll),
            "clear" => Ok(Self::ClearCompleted),
            "filter" => {
                let filter = argument(rest).ok_or(CommandError::MissingArgument {
                    command: "filter",
                    argument: "all, active or completed",
                })?;
                Ok(Self::Filter(filter.parse()?))
            },
            "dismiss" => Ok(Self::Dismiss),
            "list" | "ls" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Run the flow behind `command`
///
/// `List`, `Help` and `Quit` are handled by the caller and do nothing here.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is shutting down.
pub async fn execute(app: &TodoApp, command: Command) -> Result<(), StoreError> {
    match command {
        Command::Add(title) => {
            let outcome = app.create(&title).await?;
            tracing::debug!(outcome = outcome.as_str(), "add");
        },
        Command::Toggle(id) => {
            let outcome = app.toggle(id).await?;
            tracing::debug!(%id, outcome = outcome.as_str(), "toggle");
        },
        Command::Rename(id, title) => {
            let outcome = app.rename(id, &title).await?;
            tracing::debug!(%id, outcome = outcome.as_str(), "rename");
        },
        Command::Remove(id) => {
            let outcome = app.delete(id).await?;
            tracing::debug!(%id, outcome = outcome.as_str(), "rm");
        },
        Command::ToggleAll => {
            let outcome = app.toggle_all().await?;
            tracing::debug!(succeeded = outcome.succeeded, failed = outcome.failed, "all");
        },
        Command::ClearCompleted => {
            let outcome = app.clear_completed().await?;
            tracing::debug!(succeeded = outcome.succeeded, failed = outcome.failed, "clear");
        },
        Command::Filter(filter) => app.set_filter(filter).await?,
        Command::Dismiss => app.dismiss_error().await?,
        Command::List | Command::Help | Command::Quit => {},
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!("add  buy milk ".parse::<Command>(), Ok(Command::Add("buy milk ".to_string())));
        assert_eq!("toggle".parse::<Command>(), Err(CommandError::MissingArgument {
            command: "toggle",
            argument: "a todo id",
        }));
        assert_eq!("toggle 3".parse::<Command>(), Ok(Command::Toggle(TodoId::new(3))));
        assert_eq!("rm #12".parse::<Command>(), Ok(Command::Remove(TodoId::new(12))));
        assert_eq!(
            "rename 4 new title".parse::<Command>(),
            Ok(Command::Rename(TodoId::new(4), "new title".to_string()))
        );
        assert_eq!("filter Completed".parse::<Command>(), Ok(Command::Filter(Filter::Completed)));
        assert_eq!("ALL".parse::<Command>(), Ok(Command::ToggleAll));
    }

    #[test]
    fn blank_titles_are_left_to_the_flows() {
        assert_eq!("add".parse::<Command>(), Ok(Command::Add(String::new())));
        assert_eq!("rename 4".parse::<Command>(), Ok(Command::Rename(TodoId::new(4), String::new())));
    }

    #[test]
    fn reports_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "frobnicate".parse::<Command>(),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
        assert_eq!(
            "toggle x".parse::<Command>(),
            Err(CommandError::InvalidId("x".to_string()))
        );
        assert!(matches!(
            "rm".parse::<Command>(),
            Err(CommandError::MissingArgument { command: "rm", .. })
        ));
        assert!(matches!(
            "filter done".parse::<Command>(),
            Err(CommandError::Filter(_))
        ));
    }
}
