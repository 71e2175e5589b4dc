use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    application::{
        error::{AppError, ErrorReport, HttpError},
        pagination::{Pagination, facet_href},
        posts::{PostDetail, PostListing},
    },
    config::SiteSettings,
    domain::{
        posts::{BlogPost, PostFilter, date_part},
        profile::Profile,
        toc::TocItem,
    },
};

const INDEX_PATH: &str = "/";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err.error,
        )
    }
}

pub fn render_template<T: Template>(template: &T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|error| TemplateRenderError {
        source: "presentation::views::render_template",
        public_message: "Template rendering failed",
        error,
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(&template) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.titled("Page Not Found"), ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// HTML page for a failed page request; the report keeps the error chain.
pub fn render_error_response(chrome: LayoutChrome, error: AppError) -> Response {
    let status = error.status_code();
    if status == StatusCode::NOT_FOUND {
        return render_not_found_response(chrome);
    }

    let content = ErrorPageView {
        title: "Something went wrong".to_string(),
        message: error.presentation_message().to_string(),
    };
    let view = LayoutContext::new(chrome.titled(&content.title), content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    error.report().attach(&mut response);
    response
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub author: String,
    pub description: String,
    pub page_title: String,
    pub base_url: String,
    pub canonical: String,
    pub year: i32,
}

impl LayoutChrome {
    pub fn from_site(site: &SiteSettings) -> Self {
        Self {
            site_title: site.title.clone(),
            author: site.author.clone(),
            description: site.description.clone(),
            page_title: site.title.clone(),
            base_url: site.base_url.as_str().trim_end_matches('/').to_string(),
            canonical: site.base_url.as_str().to_string(),
            year: OffsetDateTime::now_utc().year(),
        }
    }

    pub fn titled(self, title: &str) -> Self {
        Self {
            page_title: format!("{title} | {}", self.site_title),
            ..self
        }
    }

    pub fn described(self, description: &str) -> Self {
        if description.trim().is_empty() {
            return self;
        }
        Self {
            description: description.to_string(),
            ..self
        }
    }

    pub fn with_path(self, path: &str) -> Self {
        Self {
            canonical: format!("{}{path}", self.base_url),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub category: Option<FacetLink>,
    pub project: Option<FacetLink>,
    pub tags: Vec<FacetLink>,
}

impl PostCard {
    fn from_post(post: &BlogPost, filter: &PostFilter) -> Self {
        Self {
            href: post_href(post),
            title: post.title.clone(),
            description: post.description.clone(),
            date: date_part(&post.created_at).to_string(),
            category: post
                .category
                .as_deref()
                .map(|value| facet_link("category", value, filter.category.as_deref())),
            project: post
                .project
                .as_deref()
                .map(|value| facet_link("project", value, filter.project.as_deref())),
            tags: post
                .tags
                .iter()
                .map(|tag| facet_link("tag", tag, filter.tag.as_deref()))
                .collect(),
        }
    }
}

pub struct IndexView {
    pub posts: Vec<PostCard>,
    pub total_posts: usize,
    pub pagination: Pagination,
    pub categories: Vec<FacetLink>,
    pub projects: Vec<FacetLink>,
    pub tags: Vec<FacetLink>,
    pub filter_label: Option<String>,
    pub unavailable: bool,
}

impl IndexView {
    pub fn from_listing(listing: &PostListing) -> Self {
        let filter = &listing.filter;
        let links = |key: &str, values: &[String], active: Option<&str>| -> Vec<FacetLink> {
            values
                .iter()
                .map(|value| facet_link(key, value, active))
                .collect()
        };

        Self {
            posts: listing
                .page
                .posts
                .iter()
                .map(|post| PostCard::from_post(post, filter))
                .collect(),
            total_posts: listing.page.total_posts,
            pagination: Pagination::for_page(INDEX_PATH, filter, &listing.page),
            categories: links(
                "category",
                &listing.facets.categories,
                filter.category.as_deref(),
            ),
            projects: links("project", &listing.facets.projects, filter.project.as_deref()),
            tags: links("tag", &listing.facets.tags, filter.tag.as_deref()),
            filter_label: filter_label(filter),
            unavailable: listing.unavailable,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

pub struct TocEntryView {
    pub id: String,
    pub text: String,
    pub level: u8,
}

impl From<&TocItem> for TocEntryView {
    fn from(item: &TocItem) -> Self {
        Self {
            id: item.id.clone(),
            text: item.text.clone(),
            level: item.level,
        }
    }
}

pub struct PostView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created: String,
    pub updated: String,
    pub category: Option<FacetLink>,
    pub project: Option<FacetLink>,
    pub tags: Vec<FacetLink>,
    pub body_html: String,
    pub toc: Vec<TocEntryView>,
}

impl PostView {
    pub fn from_detail(detail: &PostDetail) -> Self {
        let post = &detail.post;
        let card = PostCard::from_post(post, &PostFilter::default());
        let updated = date_part(&post.updated_at);
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            description: post.description.clone(),
            created: card.date,
            updated: if updated == date_part(&post.created_at) {
                String::new()
            } else {
                updated.to_string()
            },
            category: card.category,
            project: card.project,
            tags: card.tags,
            body_html: detail.body_html.clone(),
            toc: detail.toc.iter().map(TocEntryView::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostView>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<Profile>,
}

#[derive(Template)]
#[template(path = "resume.html")]
pub struct ResumeTemplate {
    pub view: LayoutContext<Profile>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Fully rendered pages shared by the server and the static export.
pub mod pages {
    use super::*;

    pub fn index(chrome: LayoutChrome, listing: &PostListing) -> IndexTemplate {
        let content = IndexView::from_listing(listing);
        let chrome = match &content.filter_label {
            Some(label) => chrome.titled(label),
            None => chrome,
        };
        IndexTemplate {
            view: LayoutContext::new(chrome.with_path(INDEX_PATH), content),
        }
    }

    pub fn post(chrome: LayoutChrome, detail: &PostDetail) -> PostTemplate {
        let chrome = chrome
            .titled(&detail.post.title)
            .described(&detail.post.description)
            .with_path(&post_href(&detail.post));
        PostTemplate {
            view: LayoutContext::new(chrome, PostView::from_detail(detail)),
        }
    }

    pub fn about(chrome: LayoutChrome, profile: &Profile) -> AboutTemplate {
        AboutTemplate {
            view: LayoutContext::new(
                chrome.titled("About").with_path("/about"),
                profile.clone(),
            ),
        }
    }

    pub fn resume(chrome: LayoutChrome, profile: &Profile) -> ResumeTemplate {
        ResumeTemplate {
            view: LayoutContext::new(
                chrome.titled("Resume").with_path("/resume"),
                profile.clone(),
            ),
        }
    }

    pub fn not_found(chrome: LayoutChrome) -> ErrorTemplate {
        ErrorTemplate {
            view: LayoutContext::new(chrome.titled("Page Not Found"), ErrorPageView::not_found()),
        }
    }
}

pub fn post_href(post: &BlogPost) -> String {
    format!("/post/{}", post.id)
}

fn facet_link(key: &str, value: &str, active: Option<&str>) -> FacetLink {
    FacetLink {
        label: value.to_string(),
        href: facet_href(INDEX_PATH, key, value),
        active: active == Some(value),
    }
}

fn filter_label(filter: &PostFilter) -> Option<String> {
    let parts: Vec<String> = [
        ("Category", &filter.category),
        ("Project", &filter.project),
        ("Tag", &filter.tag),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|value| format!("{label}: {value}")))
    .collect();

    (!parts.is_empty()).then(|| parts.join(" · "))
}
