use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use bytes::Bytes;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        error::{AppError, HttpError},
        render::{DEFAULT_THEME, RenderError, stylesheet},
        sitemap,
    },
    domain::{ids::NotionId, posts::PostFilter},
    infra::assets,
    presentation::views::{
        pages, render_error_response, render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    api::build_api_router,
    middleware::{log_responses, set_request_context},
};

static SYNTAX_CSS: Lazy<Result<String, RenderError>> = Lazy::new(|| stylesheet(DEFAULT_THEME));

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/post/{id}", get(post_detail))
        .route("/blog", get(blog_index_redirect))
        .route("/blog/{id}", get(blog_post_redirect))
        .route("/about", get(about))
        .route("/resume", get(resume))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/robots.txt", get(robots_txt))
        .route("/_health", get(health))
        .route("/static/syntax.css", get(syntax_css))
        .route("/static/{*path}", get(assets::serve))
        .merge(build_api_router(state.clone()))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IndexQuery {
    page: Option<String>,
    category: Option<String>,
    project: Option<String>,
    tag: Option<String>,
}

impl IndexQuery {
    fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1)
    }

    fn filter(self) -> PostFilter {
        let clean = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        PostFilter {
            category: clean(self.category),
            project: clean(self.project),
            tag: clean(self.tag),
        }
    }
}

async fn index(State(state): State<HttpState>, Query(query): Query<IndexQuery>) -> Response {
    let page = query.page();
    let listing = state.posts.list(query.filter(), page).await;
    render_template_response(pages::index(state.chrome(), &listing), StatusCode::OK)
}

async fn post_detail(State(state): State<HttpState>, Path(raw_id): Path<String>) -> Response {
    let id = match NotionId::parse(&raw_id) {
        Ok(id) => id,
        Err(_) => return render_not_found_response(state.chrome()),
    };

    match state.posts.detail(&id).await {
        Ok(detail) => render_template_response(pages::post(state.chrome(), &detail), StatusCode::OK),
        Err(err) => render_error_response(state.chrome(), AppError::from(err)),
    }
}

async fn blog_index_redirect() -> Redirect {
    Redirect::permanent("/")
}

async fn blog_post_redirect(State(state): State<HttpState>, Path(raw_id): Path<String>) -> Response {
    match NotionId::parse(&raw_id) {
        Ok(id) => Redirect::permanent(&format!("/post/{id}")).into_response(),
        Err(_) => render_not_found_response(state.chrome()),
    }
}

async fn about(State(state): State<HttpState>) -> Response {
    render_template_response(pages::about(state.chrome(), &state.profile), StatusCode::OK)
}

async fn resume(State(state): State<HttpState>) -> Response {
    render_template_response(pages::resume(state.chrome(), &state.profile), StatusCode::OK)
}

async fn sitemap_xml(State(state): State<HttpState>) -> Response {
    let posts = match state.posts.all_posts().await {
        Ok(posts) => posts,
        Err(err) => {
            warn!(error = %err, "Sitemap generated without posts");
            Arc::new(Vec::new())
        }
    };
    let body = sitemap::sitemap_xml(&state.site.base_url, &posts, sitemap::today());
    text_response(body, "application/xml; charset=utf-8")
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    text_response(
        sitemap::robots_txt(&state.site.base_url),
        "text/plain; charset=utf-8",
    )
}

async fn syntax_css() -> Response {
    match SYNTAX_CSS.as_ref() {
        Ok(css) => assets::asset_response(
            Bytes::from(css.clone()),
            &mime_guess::mime::TEXT_CSS_UTF_8,
            false,
        ),
        Err(err) => HttpError::from_error(
            "infra::http::public::syntax_css",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stylesheet unavailable",
            err,
        )
        .into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome())
}

fn text_response(body: String, content_type: &'static str) -> Response {
    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
