//! Reader comments attached to posts.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// A comment as persisted in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub username: String,
    /// `salt$sha256hex`; never leaves the service layer.
    #[serde(rename = "password")]
    pub password_hash: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A comment as exposed to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicComment {
    pub id: String,
    pub post_id: String,
    pub username: String,
    pub content: String,
    pub created_at: i64,
}

impl From<CommentRecord> for PublicComment {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            username: record.username,
            content: record.content,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentLimits {
    pub max_username_chars: usize,
    pub max_content_chars: usize,
}

impl Default for CommentLimits {
    fn default() -> Self {
        Self {
            max_username_chars: 40,
            max_content_chars: 2000,
        }
    }
}

impl CommentLimits {
    pub fn check_username(&self, username: &str) -> Result<(), DomainError> {
        check_len("username", username, self.max_username_chars)
    }

    pub fn check_content(&self, content: &str) -> Result<(), DomainError> {
        check_len("content", content, self.max_content_chars)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), DomainError> {
    let count = value.trim().chars().count();
    if count == 0 {
        return Err(DomainError::validation(format!("{field} must not be blank")));
    }
    if count > max {
        return Err(DomainError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

/// Newest first; ties broken by id so the order is stable.
pub fn sort_newest_first(comments: &mut [CommentRecord]) {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
