//! Flow tests against the in-memory repository.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use todo_sync::api::MockTodoRepository;
use todo_sync::{
    AppState, BulkOutcome, ErrorKind, Filter, FlowOutcome, LoadOutcome, StoreError, Todo,
    TodoApp, TodoEnvironment, TodoId, UserId,
};
use tokio_test::assert_ok;

const USER: UserId = UserId::new(854);
const LATENCY: Duration = Duration::from_millis(100);

fn todo(id: u64, title: &str, completed: bool) -> Todo {
    Todo::new(TodoId::new(id), USER, title, completed)
}

fn id(raw: u64) -> TodoId {
    TodoId::new(raw)
}

/// Repository and app both starting from `todos`
fn setup(todos: Vec<Todo>) -> (MockTodoRepository, TodoApp) {
    let repository = MockTodoRepository::new(USER).with_todos(todos.clone());
    let app = app_over(&repository, todos);
    (repository, app)
}

fn app_over(repository: &MockTodoRepository, todos: Vec<Todo>) -> TodoApp {
    TodoApp::with_state(
        AppState::with_todos(todos),
        Arc::new(repository.clone()),
        USER,
        TodoEnvironment::default(),
    )
}

fn completed_flags(state: &AppState) -> Vec<(u64, bool)> {
    state.todos.iter().map(|t| (t.id.get(), t.completed)).collect()
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn load_replaces_list_and_runs_once() {
    let repository = MockTodoRepository::new(USER)
        .with_todos(vec![todo(1, "a", false), todo(2, "b", true)]);
    let app = app_over(&repository, Vec::new());

    assert_eq!(app.load().await.unwrap(), LoadOutcome::Loaded(2));
    assert_eq!(app.load().await.unwrap(), LoadOutcome::AlreadyStarted);

    let state = app.snapshot().await;
    assert_eq!(state.todos, vec![todo(1, "a", false), todo(2, "b", true)]);
    assert_eq!(repository.list_calls(), 1);
}

#[tokio::test]
async fn load_only_shows_the_session_users_todos() {
    let other = UserId::new(1);
    let repository = MockTodoRepository::new(USER).with_todos(vec![
        todo(1, "mine", false),
        Todo::new(id(2), other, "theirs", false),
    ]);
    let app = app_over(&repository, Vec::new());

    app.load().await.unwrap();

    assert_eq!(app.snapshot().await.todos, vec![todo(1, "mine", false)]);
}

#[tokio::test]
async fn load_failure_shows_error_and_keeps_list() {
    let (repository, app) = setup(Vec::new());
    repository.fail_list(true);

    assert_eq!(app.load().await.unwrap(), LoadOutcome::Failed);

    let state = app.snapshot().await;
    assert!(state.todos.is_empty());
    assert_eq!(state.error, Some(ErrorKind::TasksLoadFailed));
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn blank_title_never_reaches_the_repository() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    for title in ["", "   ", "\t\n"] {
        assert_eq!(app.create(title).await.unwrap(), FlowOutcome::Rejected);
    }

    let state = app.snapshot().await;
    assert_eq!(repository.create_calls(), 0);
    assert_eq!(state.error, Some(ErrorKind::EmptyTitle));
    assert!(state.temp_todo.is_none());
    assert_eq!(state.todos.len(), 1);
}

#[tokio::test]
async fn create_sends_trimmed_title_and_appends_server_todo() {
    let (repository, app) = setup(Vec::new());

    assert_eq!(app.create("  buy milk  ").await.unwrap(), FlowOutcome::Applied);

    let state = app.snapshot().await;
    assert_eq!(repository.created_titles(), vec!["buy milk".to_string()]);
    assert_eq!(state.todos, vec![todo(1, "buy milk", false)]);
    assert!(state.temp_todo.is_none());
    assert!(state.loading.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn create_failure_discards_placeholder() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);
    repository.fail_create(true);

    assert_eq!(app.create("b").await.unwrap(), FlowOutcome::RolledBack);

    let state = app.snapshot().await;
    assert_eq!(state.todos, vec![todo(1, "a", false)]);
    assert!(state.temp_todo.is_none());
    assert!(!state.is_loading(TodoId::PLACEHOLDER));
    assert_eq!(state.error, Some(ErrorKind::TaskCreateFailed));
}

#[tokio::test(start_paused = true)]
async fn placeholder_is_shown_while_creating() {
    let repository = MockTodoRepository::new(USER).with_latency(LATENCY);
    let app = app_over(&repository, Vec::new());

    let (outcome, during) = tokio::join!(app.create("pending"), async {
        tokio::time::sleep(LATENCY / 2).await;
        app.snapshot().await
    });

    assert_eq!(outcome.unwrap(), FlowOutcome::Applied);
    let temp = during.temp_todo.as_ref().unwrap();
    assert!(temp.id.is_placeholder());
    assert_eq!(temp.title, "pending");
    assert!(during.is_loading(TodoId::PLACEHOLDER));
    assert!(during.todos.is_empty());
}

#[tokio::test(start_paused = true)]
async fn second_create_is_ignored_while_one_is_in_flight() {
    let repository = MockTodoRepository::new(USER).with_latency(LATENCY);
    let app = app_over(&repository, Vec::new());

    let (first, second) = tokio::join!(app.create("a"), app.create("b"));

    let mut outcomes = [first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|outcome| outcome.as_str());
    assert_eq!(outcomes, [FlowOutcome::Applied, FlowOutcome::Ignored]);
    assert_eq!(repository.create_calls(), 1);
    assert_eq!(app.snapshot().await.todos.len(), 1);
}

// ============================================================================
// Per-item flows
// ============================================================================

#[tokio::test]
async fn delete_end_to_end() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    assert_eq!(app.delete(id(1)).await.unwrap(), FlowOutcome::Applied);

    let state = app.snapshot().await;
    assert!(state.todos.is_empty());
    assert!(state.loading.is_empty());
    assert_eq!(state.error, None);
    assert!(repository.server_todos().is_empty());
}

#[tokio::test]
async fn delete_failure_keeps_todo() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);
    repository.fail_remove_for(id(1));

    assert_eq!(app.delete(id(1)).await.unwrap(), FlowOutcome::RolledBack);

    let state = app.snapshot().await;
    assert_eq!(state.todos, vec![todo(1, "a", false)]);
    assert!(state.loading.is_empty());
    assert_eq!(state.error, Some(ErrorKind::TaskDeleteFailed));
}

#[tokio::test]
async fn toggle_merges_server_answer() {
    let (repository, app) = setup(vec![todo(1, "a", false), todo(2, "b", false)]);

    assert_eq!(app.toggle(id(2)).await.unwrap(), FlowOutcome::Applied);
    assert_eq!(app.toggle(id(1)).await.unwrap(), FlowOutcome::Applied);
    assert_eq!(app.toggle(id(1)).await.unwrap(), FlowOutcome::Applied);

    let state = app.snapshot().await;
    assert_eq!(completed_flags(&state), vec![(1, false), (2, true)]);
    assert_eq!(repository.update_calls(), 3);
    assert!(state.loading.is_empty());
}

#[tokio::test]
async fn toggle_failure_keeps_previous_value() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);
    repository.fail_update_for(id(1));

    assert_eq!(app.toggle(id(1)).await.unwrap(), FlowOutcome::RolledBack);

    let state = app.snapshot().await;
    assert_eq!(state.todos, vec![todo(1, "a", false)]);
    assert!(state.loading.is_empty());
    assert_eq!(state.error, Some(ErrorKind::TaskUpdateFailed));
}

#[tokio::test]
async fn rename_trims_and_skips_unchanged_titles() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    assert_eq!(app.rename(id(1), "  new title ").await.unwrap(), FlowOutcome::Applied);
    assert_eq!(app.rename(id(1), "new title").await.unwrap(), FlowOutcome::Ignored);

    assert_eq!(app.snapshot().await.todos, vec![todo(1, "new title", false)]);
    assert_eq!(repository.update_calls(), 1);
}

#[tokio::test]
async fn rename_to_blank_deletes() {
    let (repository, app) = setup(vec![todo(1, "a", false), todo(2, "b", false)]);

    assert_eq!(app.rename(id(1), "   ").await.unwrap(), FlowOutcome::Applied);

    assert_eq!(app.snapshot().await.todos, vec![todo(2, "b", false)]);
    assert_eq!(repository.remove_calls(), 1);
    assert_eq!(repository.update_calls(), 0);
}

#[tokio::test]
async fn unknown_ids_are_ignored() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    assert_eq!(app.toggle(id(9)).await.unwrap(), FlowOutcome::Ignored);
    assert_eq!(app.delete(id(9)).await.unwrap(), FlowOutcome::Ignored);
    assert_eq!(app.rename(id(9), "x").await.unwrap(), FlowOutcome::Ignored);

    assert_eq!(repository.update_calls() + repository.remove_calls(), 0);
    assert_eq!(app.snapshot().await.error, None);
}

#[tokio::test(start_paused = true)]
async fn busy_todo_ignores_second_request() {
    let repository = MockTodoRepository::new(USER)
        .with_todos(vec![todo(1, "a", false)])
        .with_latency(LATENCY);
    let app = app_over(&repository, vec![todo(1, "a", false)]);

    let (toggled, deleted) = tokio::join!(app.toggle(id(1)), app.delete(id(1)));

    let outcomes = [toggled.unwrap(), deleted.unwrap()];
    assert!(outcomes.contains(&FlowOutcome::Applied));
    assert!(outcomes.contains(&FlowOutcome::Ignored));
    assert_eq!(repository.update_calls() + repository.remove_calls(), 1);
    assert!(app.snapshot().await.loading.is_empty());
}

#[tokio::test(start_paused = true)]
async fn loading_marker_covers_only_the_request() {
    let repository = MockTodoRepository::new(USER)
        .with_todos(vec![todo(1, "a", false), todo(2, "b", false)])
        .with_latency(LATENCY);
    let app = app_over(&repository, vec![todo(1, "a", false), todo(2, "b", false)]);

    let (outcome, during) = tokio::join!(app.toggle(id(2)), async {
        tokio::time::sleep(LATENCY / 2).await;
        app.snapshot().await.loading
    });

    assert_eq!(outcome.unwrap(), FlowOutcome::Applied);
    assert_eq!(during, BTreeSet::from([id(2)]));
    assert!(app.snapshot().await.loading.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_flows_keep_each_others_loading_ids() {
    let repository = MockTodoRepository::new(USER)
        .with_todos(vec![todo(1, "a", false), todo(2, "b", false)])
        .with_latency(LATENCY);
    let app = app_over(&repository, vec![todo(1, "a", false), todo(2, "b", false)]);

    let slow = async {
        tokio::time::sleep(LATENCY / 2).await;
        app.toggle(id(2)).await
    };
    let observe = async {
        tokio::time::sleep(LATENCY + LATENCY / 4).await;
        app.snapshot().await.loading
    };
    let (first, second, during) = tokio::join!(app.toggle(id(1)), slow, observe);

    assert_eq!(first.unwrap(), FlowOutcome::Applied);
    assert_eq!(second.unwrap(), FlowOutcome::Applied);
    // id 1 finished while id 2 was still in flight
    assert_eq!(during, BTreeSet::from([id(2)]));
}

// ============================================================================
// Bulk flows
// ============================================================================

#[tokio::test]
async fn toggle_all_completes_mixed_list() {
    let (repository, app) =
        setup(vec![todo(1, "a", false), todo(2, "b", true), todo(3, "c", false)]);

    let outcome = app.toggle_all().await.unwrap();

    assert_eq!(outcome, BulkOutcome { succeeded: 2, failed: 0 });
    assert_eq!(repository.update_calls(), 2);
    let state = app.snapshot().await;
    assert!(state.todos.iter().all(|t| t.completed));
    assert!(state.loading.is_empty());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn toggle_all_reopens_fully_completed_list() {
    let (_, app) = setup(vec![todo(1, "a", true), todo(2, "b", true)]);

    app.toggle_all().await.unwrap();

    assert!(app.snapshot().await.todos.iter().all(|t| !t.completed));
}

#[tokio::test]
async fn toggle_all_partial_failure() {
    let (repository, app) =
        setup(vec![todo(1, "a", false), todo(2, "b", false), todo(3, "c", false)]);
    repository.fail_update_for(id(2));

    let outcome = app.toggle_all().await.unwrap();

    assert_eq!(outcome, BulkOutcome { succeeded: 2, failed: 1 });
    let state = app.snapshot().await;
    assert_eq!(completed_flags(&state), vec![(1, true), (2, false), (3, true)]);
    assert_eq!(state.error, Some(ErrorKind::TaskUpdateFailed));
    assert!(state.loading.is_empty());
}

#[tokio::test]
async fn toggle_all_on_empty_list_does_nothing() {
    let (repository, app) = setup(Vec::new());

    let outcome = app.toggle_all().await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(repository.update_calls(), 0);
}

#[tokio::test]
async fn clear_completed_keeps_active_and_failed_todos() {
    let (repository, app) =
        setup(vec![todo(1, "a", true), todo(2, "b", true), todo(3, "c", false)]);
    repository.fail_remove_for(id(2));

    let outcome = app.clear_completed().await.unwrap();

    assert_eq!(outcome, BulkOutcome { succeeded: 1, failed: 1 });
    assert_eq!(repository.remove_calls(), 2);
    let state = app.snapshot().await;
    assert_eq!(completed_flags(&state), vec![(2, true), (3, false)]);
    assert_eq!(state.error, Some(ErrorKind::TaskDeleteFailed));
    assert!(state.loading.is_empty());
}

#[tokio::test]
async fn clear_completed_without_completed_todos() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    assert_eq!(app.clear_completed().await.unwrap(), BulkOutcome::default());
    assert_eq!(repository.remove_calls(), 0);
    assert_eq!(app.snapshot().await.todos.len(), 1);
}

// ============================================================================
// Error banner and filter
// ============================================================================

#[tokio::test(start_paused = true)]
async fn error_clears_after_display_time() {
    let (_, app) = setup(Vec::new());

    app.create("").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2999)).await;
    assert_eq!(app.snapshot().await.error, Some(ErrorKind::EmptyTitle));

    tokio::time::sleep(Duration::from_millis(2)).await;
    tokio::task::yield_now().await;
    assert_eq!(app.snapshot().await.error, None);
}

#[tokio::test(start_paused = true)]
async fn new_error_restarts_display_time() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);
    repository.fail_remove_for(id(1));

    app.create("").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    app.delete(id(1)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(app.snapshot().await.error, Some(ErrorKind::TaskDeleteFailed));

    tokio::time::sleep(Duration::from_millis(1001)).await;
    tokio::task::yield_now().await;
    assert_eq!(app.snapshot().await.error, None);
}

#[tokio::test(start_paused = true)]
async fn dismissing_cancels_scheduled_clear() {
    let (_, app) = setup(Vec::new());

    app.create("").await.unwrap();
    assert_ok!(app.dismiss_error().await);
    assert_eq!(app.snapshot().await.error, None);

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(app.snapshot().await.error, None);
}

#[tokio::test]
async fn custom_display_time_is_used() {
    let repository = MockTodoRepository::new(USER);
    let app = TodoApp::new(
        Arc::new(repository),
        USER,
        TodoEnvironment::new(Duration::from_millis(20)),
    );

    app.create(" ").await.unwrap();
    assert_eq!(app.snapshot().await.error, Some(ErrorKind::EmptyTitle));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.snapshot().await.error, None);
}

#[tokio::test]
async fn set_filter_changes_visible_todos() {
    let (_, app) = setup(vec![todo(1, "a", false), todo(2, "b", true)]);

    assert_ok!(app.set_filter(Filter::Completed).await);

    let state = app.snapshot().await;
    let visible: Vec<_> = state.visible_todos().map(|t| t.id).collect();
    assert_eq!(visible, vec![id(2)]);
}

#[tokio::test]
async fn flows_fail_after_shutdown() {
    let (repository, app) = setup(vec![todo(1, "a", false)]);

    app.shutdown();

    assert_eq!(app.create("x").await, Err(StoreError::ShutdownInProgress));
    assert_eq!(app.delete(id(1)).await, Err(StoreError::ShutdownInProgress));
    assert_eq!(repository.create_calls() + repository.remove_calls(), 0);
}
