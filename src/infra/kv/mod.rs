//! Key-value persistence for view counters and comments.

mod memory;
mod upstash;

use thiserror::Error;

use crate::application::repos::RepoError;

pub use memory::MemoryStore;
pub use upstash::UpstashStore;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("invalid KV URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("KV transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("KV request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("KV command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
    #[error("unexpected KV payload: {0}")]
    Decode(String),
}

impl From<KvError> for RepoError {
    fn from(error: KvError) -> Self {
        match error {
            KvError::Decode(message) => RepoError::decode(message),
            other => RepoError::from_persistence(other),
        }
    }
}

pub(crate) fn views_key(slug: &str) -> String {
    format!("pageviews:{slug}")
}

pub(crate) fn comments_key(post_id: &str) -> String {
    format!("comments:{post_id}")
}
