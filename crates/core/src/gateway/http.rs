use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{GatewayError, TaskGateway};
use crate::config::AppConfig;
use crate::model::ListQuery;
use crate::wire::{Page, TaskRequest, TaskResponse};

/// [`TaskGateway`] backed by the REST API at [`AppConfig::base_url`].
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base.as_str())
            .finish()
    }
}

impl HttpGateway {
    pub fn new(config: &AppConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        let raw = config.base_url().trim_end_matches('/');
        let base = Url::parse(raw)
            .map_err(|e| GatewayError::Transport(format!("invalid base URL '{raw}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "invalid base URL '{raw}': cannot hold a path"
            )));
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded as a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn tasks_url(&self) -> Url {
        self.endpoint(&["tasks"])
    }

    fn task_url(&self, id: &str) -> Url {
        self.endpoint(&["tasks", id])
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Transport(format!("request timed out: {e}"))
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GatewayError> {
        let response = Self::send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to read response body: {e}")))?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn map_http_error(status: StatusCode, body: &str) -> GatewayError {
    GatewayError::Status {
        status: status.as_u16(),
        message: extract_error_message(body),
    }
}

/// Pull `message` out of an error body such as `{"status":"NOT_FOUND","message":"..."}`.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .filter(|m| !m.trim().is_empty())
}

#[async_trait]
impl TaskGateway for HttpGateway {
    async fn list(&self, query: &ListQuery) -> Result<Page<TaskResponse>, GatewayError> {
        let url = self.tasks_url();
        tracing::debug!(url = %url, "listing tasks");
        Self::send_json(self.client.get(url).query(query)).await
    }

    async fn get(&self, id: &str) -> Result<TaskResponse, GatewayError> {
        tracing::debug!(task_id = id, "fetching task");
        Self::send_json(self.client.get(self.task_url(id))).await
    }

    async fn create(&self, request: &TaskRequest) -> Result<TaskResponse, GatewayError> {
        tracing::debug!(title = request.title.as_str(), "creating task");
        Self::send_json(self.client.post(self.tasks_url()).json(request)).await
    }

    async fn update(&self, id: &str, request: &TaskRequest) -> Result<TaskResponse, GatewayError> {
        tracing::debug!(task_id = id, "updating task");
        Self::send_json(self.client.put(self.task_url(id)).json(request)).await
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        tracing::debug!(task_id = id, "deleting task");
        Self::send(self.client.delete(self.task_url(id))).await?;
        Ok(())
    }
}
