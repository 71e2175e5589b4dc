//! Repository traits describing content and persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    blocks::Block,
    comments::CommentRecord,
    ids::NotionId,
    posts::PostRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("upstream rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("upstream rate limit still exceeded after retries")]
    RateLimited,
    #[error("unexpected upstream payload: {message}")]
    Decode { message: String },
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// One page of a cursor-paginated upstream listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// Read access to the headless CMS.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// One page of published posts, newest first.
    async fn query_published(
        &self,
        cursor: Option<&str>,
    ) -> Result<CursorPage<PostRecord>, RepoError>;

    /// `Ok(None)` when the page does not exist or is not shared with the integration.
    async fn retrieve_post(&self, id: &NotionId) -> Result<Option<PostRecord>, RepoError>;

    /// Direct children of a page or block, without their descendants.
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<CursorPage<Block>, RepoError>;
}

#[async_trait]
pub trait ViewsRepo: Send + Sync {
    async fn get_views(&self, slug: &str) -> Result<u64, RepoError>;

    /// Returns the count after incrementing.
    async fn increment_views(&self, slug: &str) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, RepoError>;

    async fn find_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<CommentRecord>, RepoError>;

    /// Insert or replace by comment id.
    async fn put_comment(&self, comment: &CommentRecord) -> Result<(), RepoError>;

    /// Returns whether a comment was removed.
    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<bool, RepoError>;
}
