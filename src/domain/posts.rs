//! Blog posts as published in the Notion data source.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::ids::NotionId;

pub const UNTITLED: &str = "Untitled";
pub const PUBLISHED_STATUS: &str = "Published";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: NotionId,
    pub title: String,
    pub description: String,
    /// `createdAt` date property, ISO-8601 date or datetime; empty when unset.
    pub created_at: String,
    /// Notion `last_edited_time`; empty when unavailable.
    pub updated_at: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub project: Option<String>,
}

/// A post together with its workflow status, as read from Notion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post: BlogPost,
    pub status: Option<String>,
}

impl PostRecord {
    /// Pages without a status property are treated as published.
    pub fn is_published(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|status| status == PUBLISHED_STATUS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub category: Option<String>,
    pub project: Option<String>,
    pub tag: Option<String>,
}

impl PostFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.project.is_none() && self.tag.is_none()
    }

    pub fn matches(&self, post: &BlogPost) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|wanted| post.category.as_deref() == Some(wanted));
        let project_ok = self
            .project
            .as_deref()
            .is_none_or(|wanted| post.project.as_deref() == Some(wanted));
        let tag_ok = self
            .tag
            .as_deref()
            .is_none_or(|wanted| post.tags.iter().any(|tag| tag == wanted));

        category_ok && project_ok && tag_ok
    }
}

/// Distinct facet values across a set of posts, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFacets {
    pub categories: Vec<String>,
    pub projects: Vec<String>,
    pub tags: Vec<String>,
}

impl PostFacets {
    pub fn collect(posts: &[BlogPost]) -> Self {
        let mut categories = BTreeSet::new();
        let mut projects = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for post in posts {
            if let Some(category) = &post.category {
                categories.insert(category.clone());
            }
            if let Some(project) = &post.project {
                projects.insert(project.clone());
            }
            tags.extend(post.tags.iter().cloned());
        }

        Self {
            categories: categories.into_iter().collect(),
            projects: projects.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }
}

/// One page of a numbered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPage {
    pub posts: Vec<BlogPost>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
}

/// Slice `posts` into page `requested` (1-based). Out-of-range pages clamp to
/// the nearest valid page; an empty list still has one (empty) page.
pub fn paginate(posts: Vec<BlogPost>, per_page: usize, requested: usize) -> PostPage {
    let per_page = per_page.max(1);
    let total_posts = posts.len();
    let total_pages = total_posts.div_ceil(per_page).max(1);
    let current_page = requested.clamp(1, total_pages);

    let posts = posts
        .into_iter()
        .skip((current_page - 1) * per_page)
        .take(per_page)
        .collect();

    PostPage {
        posts,
        current_page,
        total_pages,
        total_posts,
    }
}

/// The calendar date portion (`YYYY-MM-DD`) of an ISO-8601 timestamp.
pub fn date_part(value: &str) -> &str {
    value.get(..10).unwrap_or(value)
}
