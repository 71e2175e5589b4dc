//! Notion REST API adapter.

mod client;
mod gate;
mod wire;

use thiserror::Error;

use crate::application::repos::RepoError;

pub use client::{NotionClient, NotionClientConfig};
pub use gate::RequestGate;

#[derive(Debug, Error)]
pub enum NotionError {
    #[error("invalid Notion URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Notion transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Notion rate limit still exceeded after {retries} retries")]
    RateLimited { retries: u32 },
    #[error("object not found")]
    NotFound,
    #[error("unexpected Notion payload: {0}")]
    Decode(String),
}

impl From<NotionError> for RepoError {
    fn from(error: NotionError) -> Self {
        match error {
            NotionError::NotFound => RepoError::NotFound,
            NotionError::RateLimited { .. } => RepoError::RateLimited,
            NotionError::Api {
                status, message, ..
            } => RepoError::Rejected { status, message },
            NotionError::Decode(message) => RepoError::decode(message),
            other @ (NotionError::Url(_) | NotionError::Transport(_)) => {
                RepoError::Upstream(other.to_string())
            }
        }
    }
}
