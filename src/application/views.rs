//! Page view counters.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;

use crate::{
    application::repos::{RepoError, ViewsRepo},
    infra::telemetry::VIEW_INCREMENTS,
};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("slug is required")]
    MissingSlug,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ViewService {
    repo: Arc<dyn ViewsRepo>,
}

impl ViewService {
    pub fn new(repo: Arc<dyn ViewsRepo>) -> Self {
        Self { repo }
    }

    pub async fn views(&self, slug: &str) -> Result<u64, ViewError> {
        let slug = require_slug(slug)?;
        Ok(self.repo.get_views(slug).await?)
    }

    pub async fn record_view(&self, slug: &str) -> Result<u64, ViewError> {
        let slug = require_slug(slug)?;
        let views = self.repo.increment_views(slug).await?;
        counter!(VIEW_INCREMENTS).increment(1);
        Ok(views)
    }
}

fn require_slug(slug: &str) -> Result<&str, ViewError> {
    let slug = slug.trim();
    if slug.is_empty() {
        Err(ViewError::MissingSlug)
    } else {
        Ok(slug)
    }
}
