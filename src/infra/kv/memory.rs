use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    application::repos::{CommentsRepo, RepoError, ViewsRepo},
    domain::comments::CommentRecord,
};

use super::{comments_key, views_key};

/// Process-local store used when no KV endpoint is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, u64>,
    hashes: DashMap<String, HashMap<String, CommentRecord>>,
}

#[async_trait]
impl ViewsRepo for MemoryStore {
    async fn get_views(&self, slug: &str) -> Result<u64, RepoError> {
        Ok(self
            .counters
            .get(&views_key(slug))
            .map(|count| *count)
            .unwrap_or(0))
    }

    async fn increment_views(&self, slug: &str) -> Result<u64, RepoError> {
        let mut count = self.counters.entry(views_key(slug)).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRecord>, RepoError> {
        Ok(self
            .hashes
            .get(&comments_key(post_id))
            .map(|comments| comments.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self
            .hashes
            .get(&comments_key(post_id))
            .and_then(|comments| comments.get(comment_id).cloned()))
    }

    async fn put_comment(&self, comment: &CommentRecord) -> Result<(), RepoError> {
        self.hashes
            .entry(comments_key(&comment.post_id))
            .or_default()
            .insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<bool, RepoError> {
        Ok(self
            .hashes
            .get_mut(&comments_key(post_id))
            .is_some_and(|mut comments| comments.remove(comment_id).is_some()))
    }
}
