//! Remote task gateway: the only place where task I/O happens.
//!
//! Each call is a single round trip. Failures are returned as
//! [`GatewayError`] and never retried or swallowed here.

mod http;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::ListQuery;
use crate::wire::{Page, TaskRequest, TaskResponse, WireError};

pub use http::HttpGateway;
pub use memory::{GatewayCall, MemoryGateway};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The server answered with a non-2xx status.
    #[error("server responded with HTTP {status}{}", message_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },
    /// The request did not complete (connection, DNS, timeout).
    #[error("request failed: {0}")]
    Transport(String),
    /// The response body could not be mapped to local types.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport(_) | GatewayError::Decode(_) => None,
        }
    }

    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Status { message, .. } => message.as_deref(),
            GatewayError::Transport(_) | GatewayError::Decode(_) => None,
        }
    }

    pub fn not_found(id: &str) -> Self {
        GatewayError::Status {
            status: 404,
            message: Some(format!("Task not found with id {id}")),
        }
    }
}

impl From<WireError> for GatewayError {
    fn from(err: WireError) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<TaskResponse>, GatewayError>;

    async fn get(&self, id: &str) -> Result<TaskResponse, GatewayError>;

    async fn create(&self, request: &TaskRequest) -> Result<TaskResponse, GatewayError>;

    /// `request` must be the full replacement body; partial updates are merged by the caller.
    async fn update(&self, id: &str, request: &TaskRequest) -> Result<TaskResponse, GatewayError>;

    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}
