//! HTTP surface: HTML pages, the JSON API and embedded assets.

mod api;
mod middleware;
mod public;

use std::sync::Arc;

use crate::{
    application::{comments::CommentService, posts::PostService, views::ViewService},
    config::SiteSettings,
    domain::profile::Profile,
    presentation::views::LayoutChrome,
};

pub use api::rate_limit::ApiRateLimiter;
pub use public::build_router;

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub views: Arc<ViewService>,
    pub comments: Arc<CommentService>,
    pub site: Arc<SiteSettings>,
    pub profile: Arc<Profile>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}

impl HttpState {
    pub fn chrome(&self) -> LayoutChrome {
        LayoutChrome::from_site(&self.site)
    }
}
