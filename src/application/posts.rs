//! Published posts: listing, detail rendering and caching.

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use metrics::counter;
use thiserror::Error;
use tracing::{error, instrument, warn};

use crate::{
    application::{
        blocks::BlockTreeLoader,
        render::render_blocks,
        repos::{ContentSource, RepoError},
    },
    domain::{
        blocks::Block,
        ids::NotionId,
        posts::{BlogPost, PostFacets, PostFilter, PostPage, paginate},
        toc::{TocItem, extract_toc},
    },
    infra::{
        cache::{Lookup, TtlCache},
        telemetry::CACHE_STALE_SERVED,
    },
};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetail {
    pub post: BlogPost,
    pub body_html: String,
    pub toc: Vec<TocItem>,
}

#[derive(Debug, Clone)]
pub struct PostListing {
    pub page: PostPage,
    pub facets: PostFacets,
    pub filter: PostFilter,
    /// Set when the listing could not be loaded and is shown empty.
    pub unavailable: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PostCacheConfig {
    pub revalidate: Duration,
    pub capacity: NonZeroUsize,
}

pub struct PostService {
    source: Arc<dyn ContentSource>,
    loader: BlockTreeLoader,
    per_page: usize,
    listing: TtlCache<(), Arc<Vec<BlogPost>>>,
    details: TtlCache<NotionId, Arc<PostDetail>>,
}

impl PostService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        loader: BlockTreeLoader,
        per_page: usize,
        cache: PostCacheConfig,
    ) -> Self {
        Self {
            source,
            loader,
            per_page: per_page.max(1),
            listing: TtlCache::new("post_listing", cache.revalidate, NonZeroUsize::MIN),
            details: TtlCache::new("post_detail", cache.revalidate, cache.capacity),
        }
    }

    /// Every published post, newest first.
    #[instrument(skip(self))]
    pub async fn all_posts(&self) -> Result<Arc<Vec<BlogPost>>, PostError> {
        let cached = self.listing.lookup(&());
        if let Lookup::Fresh(posts) = cached {
            return Ok(posts);
        }

        match self.fetch_published().await {
            Ok(posts) => {
                let posts = Arc::new(posts);
                self.listing.insert((), posts.clone());
                Ok(posts)
            }
            Err(err) => match cached.any() {
                Some(stale) => {
                    warn!(error = %err, "Serving stale post listing after refresh failure");
                    counter!(CACHE_STALE_SERVED, "cache" => "post_listing").increment(1);
                    Ok(stale)
                }
                None => Err(err.into()),
            },
        }
    }

    /// One page of the listing with facets over all published posts.
    pub async fn list(&self, filter: PostFilter, page: usize) -> PostListing {
        let (posts, unavailable) = match self.all_posts().await {
            Ok(posts) => (posts, false),
            Err(err) => {
                error!(error = %err, "Failed to load post listing");
                (Arc::new(Vec::new()), true)
            }
        };

        let facets = PostFacets::collect(&posts);
        let matching: Vec<BlogPost> = posts
            .iter()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect();

        PostListing {
            page: paginate(matching, self.per_page, page),
            facets,
            filter,
            unavailable,
        }
    }

    /// A published post with its rendered body and table of contents.
    #[instrument(skip(self), fields(post_id = %id))]
    pub async fn detail(&self, id: &NotionId) -> Result<Arc<PostDetail>, PostError> {
        let cached = self.details.lookup(id);
        if let Lookup::Fresh(detail) = cached {
            return Ok(detail);
        }

        match self.fetch_detail(id).await {
            Ok(detail) => {
                let detail = Arc::new(detail);
                self.details.insert(id.clone(), detail.clone());
                Ok(detail)
            }
            Err(PostError::Repo(err)) => match cached.any() {
                Some(stale) => {
                    warn!(error = %err, "Serving stale post after refresh failure");
                    counter!(CACHE_STALE_SERVED, "cache" => "post_detail").increment(1);
                    Ok(stale)
                }
                None => Err(PostError::Repo(err)),
            },
            Err(err) => Err(err),
        }
    }

    /// Raw block tree of any page, uncached.
    pub async fn block_tree(&self, id: &NotionId) -> Result<Vec<Block>, PostError> {
        Ok(self.loader.load(id.as_str()).await?)
    }

    async fn fetch_published(&self) -> Result<Vec<BlogPost>, RepoError> {
        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.source.query_published(cursor.as_deref()).await?;
            posts.extend(
                page.items
                    .into_iter()
                    .filter(|record| record.is_published())
                    .map(|record| record.post),
            );
            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(posts)
    }

    async fn fetch_detail(&self, id: &NotionId) -> Result<PostDetail, PostError> {
        let record = self
            .source
            .retrieve_post(id)
            .await?
            .ok_or(PostError::NotFound)?;
        if !record.is_published() {
            return Err(PostError::NotFound);
        }

        let blocks = match self.loader.load(id.as_str()).await {
            Ok(blocks) => blocks,
            Err(RepoError::NotFound) => return Err(PostError::NotFound),
            Err(err) => return Err(err.into()),
        };

        Ok(PostDetail {
            post: record.post,
            body_html: render_blocks(&blocks, 0),
            toc: extract_toc(&blocks),
        })
    }
}
