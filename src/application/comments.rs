//! Reader comments with per-comment passwords.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::repos::{CommentsRepo, RepoError},
    domain::{
        comments::{CommentLimits, CommentRecord, PublicComment, sort_newest_first},
        error::DomainError,
    },
};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment not found")]
    NotFound,
    #[error("incorrect password")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: String,
    pub username: String,
    pub password: String,
    pub content: String,
}

#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn CommentsRepo>,
    admin_password: Option<String>,
    limits: CommentLimits,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentsRepo>,
        admin_password: Option<String>,
        limits: CommentLimits,
    ) -> Self {
        Self {
            repo,
            admin_password,
            limits,
        }
    }

    pub async fn list(&self, post_id: &str) -> Result<Vec<PublicComment>, CommentError> {
        let mut comments = self.repo.list_comments(post_id).await?;
        sort_newest_first(&mut comments);
        Ok(comments.into_iter().map(PublicComment::from).collect())
    }

    pub async fn create(&self, input: NewComment) -> Result<PublicComment, CommentError> {
        self.limits.check_username(&input.username)?;
        self.limits.check_content(&input.content)?;
        if input.password.is_empty() {
            return Err(DomainError::validation("password must not be empty").into());
        }

        let record = CommentRecord {
            id: Uuid::new_v4().to_string(),
            post_id: input.post_id,
            username: input.username.trim().to_string(),
            password_hash: hash_password(&input.password),
            content: input.content.trim().to_string(),
            created_at: now_millis(),
        };
        self.repo.put_comment(&record).await?;
        info!(post_id = %record.post_id, comment_id = %record.id, "Comment created");

        Ok(record.into())
    }

    pub async fn update(
        &self,
        post_id: &str,
        comment_id: &str,
        password: &str,
        content: &str,
    ) -> Result<(), CommentError> {
        self.limits.check_content(content)?;
        let mut record = self.authorize(post_id, comment_id, password).await?;

        record.content = content.trim().to_string();
        self.repo.put_comment(&record).await?;
        info!(post_id, comment_id, "Comment updated");
        Ok(())
    }

    pub async fn delete(
        &self,
        post_id: &str,
        comment_id: &str,
        password: &str,
    ) -> Result<(), CommentError> {
        self.authorize(post_id, comment_id, password).await?;

        if !self.repo.delete_comment(post_id, comment_id).await? {
            return Err(CommentError::NotFound);
        }
        info!(post_id, comment_id, "Comment deleted");
        Ok(())
    }

    /// The admin password unlocks every comment.
    async fn authorize(
        &self,
        post_id: &str,
        comment_id: &str,
        password: &str,
    ) -> Result<CommentRecord, CommentError> {
        let record = self
            .repo
            .find_comment(post_id, comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;

        let is_admin = self
            .admin_password
            .as_deref()
            .is_some_and(|admin| bool::from(admin.as_bytes().ct_eq(password.as_bytes())));
        if is_admin || verify_password(password, &record.password_hash) {
            Ok(record)
        } else {
            Err(CommentError::Unauthorized)
        }
    }
}

fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, password);
    format!("{salt}${}", hex::encode(digest))
}

fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    let actual = salted_digest(salt, password);
    actual.ct_eq(&expected).into()
}

fn salted_digest(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
