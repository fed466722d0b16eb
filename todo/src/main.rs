//! Terminal client for a remote todo list.
//!
//! Reads one command per line from stdin (see `help`) and prints the list
//! after every change. Logs go to stderr.

use anyhow::Context;
use std::io::Write as _;
use std::sync::Arc;
use todo_sync::command::{self, Command, CommandError, HELP};
use todo_sync::{Config, HttpTodoRepository, LoadOutcome, TodoApp, TodoEnvironment, view};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.ui.log_level)
                .unwrap_or_else(|_| EnvFilter::new("todo_sync=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        api = %config.api.base_url,
        user_id = %config.api.user_id,
        "Configuration loaded"
    );

    let repository =
        HttpTodoRepository::from_config(&config.api).context("failed to build HTTP client")?;
    let app = Arc::new(TodoApp::new(
        Arc::new(repository),
        config.api.user_id,
        TodoEnvironment::new(config.ui.error_display()),
    ));

    if app.load().await? == LoadOutcome::Failed {
        tracing::warn!("Starting with an empty list");
    }
    print_state(&app).await;
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(error) => {
                eprintln!("{error}");
                continue;
            },
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::List => print_state(&app).await,
            command => {
                // Flows run concurrently so a slow request does not block input
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    match command::execute(&app, command).await {
                        Ok(()) => print_state(&app).await,
                        Err(error) => tracing::warn!(%error, "Command not run"),
                    }
                });
            },
        }
    }

    app.shutdown();
    tracing::info!("Bye");
    Ok(())
}

async fn print_state(app: &TodoApp) {
    let state = app.snapshot().await;
    print!("{}", view::ListView(&state));
    let _ = std::io::stdout().flush();
}
