//! REST implementation of [`TodoRepository`]

use super::{NetworkError, RepositoryFuture, TodoPatch, TodoRepository};
use crate::config::ApiConfig;
use crate::types::{Todo, TodoId, UserId};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Body of `POST /todos`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTodo {
    title: String,
    user_id: UserId,
    completed: bool,
}

/// Body of `PATCH /todos/{id}`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchBody<'a> {
    user_id: UserId,
    #[serde(flatten)]
    patch: &'a TodoPatch,
}

/// Todo storage API client
///
/// Talks to a conventional REST resource at `{base_url}/todos`, filtered by
/// the `userId` query parameter.
#[derive(Clone, Debug)]
pub struct HttpTodoRepository {
    client: Client,
    base_url: String,
    user_id: UserId,
}

impl HttpTodoRepository {
    /// Create a client with reqwest's default settings
    #[must_use]
    pub fn new(base_url: impl Into<String>, user_id: UserId) -> Self {
        Self::with_client(Client::new(), base_url, user_id)
    }

    /// Create a client from configuration, applying the request timeout
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::RequestFailed` if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn from_config(config: &ApiConfig) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self::with_client(client, config.base_url.clone(), config.user_id))
    }

    fn with_client(client: Client, base_url: impl Into<String>, user_id: UserId) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            user_id,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: TodoId) -> String {
        format!("{}/todos/{id}", self.base_url)
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, NetworkError> {
        let url = self.collection_url();
        tracing::debug!(%url, user_id = %self.user_id, "GET todos");

        let response = self
            .client
            .get(&url)
            .query(&[("userId", self.user_id.get())])
            .send()
            .await?;

        read_json(response).await
    }

    async fn create_todo(&self, title: String, completed: bool) -> Result<Todo, NetworkError> {
        let url = self.collection_url();
        tracing::debug!(%url, "POST todo");

        let body = NewTodo {
            title,
            user_id: self.user_id,
            completed,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        let created: Todo = read_json(response).await?;

        if created.id.is_placeholder() {
            return Err(NetworkError::InvalidResponse(
                "created todo has no id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn remove_todo(&self, id: TodoId) -> Result<(), NetworkError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "DELETE todo");

        let response = self.client.delete(&url).send().await?;
        check_status(response).await.map(drop)
    }

    async fn update_todo(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, NetworkError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "PATCH todo");

        let body = PatchBody {
            user_id: self.user_id,
            patch: &patch,
        };
        let response = self.client.patch(&url).json(&body).send().await?;
        read_json(response).await
    }
}

/// Turn a non-2xx response into `NetworkError::Status`
async fn check_status(response: Response) -> Result<Response, NetworkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(NetworkError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, NetworkError> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| NetworkError::ResponseParseFailed(e.to_string()))
}

impl TodoRepository for HttpTodoRepository {
    fn list(&self) -> RepositoryFuture<'_, Vec<Todo>> {
        Box::pin(self.list_todos())
    }

    fn create(&self, title: String, completed: bool) -> RepositoryFuture<'_, Todo> {
        Box::pin(self.create_todo(title, completed))
    }

    fn remove(&self, id: TodoId) -> RepositoryFuture<'_, ()> {
        Box::pin(self.remove_todo(id))
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> RepositoryFuture<'_, Todo> {
        Box::pin(self.update_todo(id, patch))
    }
}
