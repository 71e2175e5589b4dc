use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use folio::application::blocks::BlockTreeLoader;
use folio::application::comments::CommentService;
use folio::application::posts::{PostCacheConfig, PostService};
use folio::application::repos::{ContentSource, CursorPage, RepoError};
use folio::application::views::ViewService;
use folio::config::SiteSettings;
use folio::domain::blocks::{Block, BlockKind, RichText};
use folio::domain::comments::CommentLimits;
use folio::domain::ids::NotionId;
use folio::domain::posts::{BlogPost, PostRecord};
use folio::domain::profile::Profile;
use folio::infra::http::{ApiRateLimiter, HttpState, build_router};
use folio::infra::kv::MemoryStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

const PUBLISHED: &str = "11111111111111111111111111111111";
const DRAFT: &str = "22222222222222222222222222222222";
const UNKNOWN: &str = "33333333333333333333333333333333";
const ADMIN_PASSWORD: &str = "let-me-in";

struct StaticSource {
    records: Vec<PostRecord>,
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn query_published(
        &self,
        _cursor: Option<&str>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        Ok(CursorPage::last(self.records.clone()))
    }

    async fn retrieve_post(&self, id: &NotionId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.records.iter().find(|r| &r.post.id == id).cloned())
    }

    async fn list_children(
        &self,
        _block_id: &str,
        _cursor: Option<&str>,
    ) -> Result<CursorPage<Block>, RepoError> {
        Ok(CursorPage::last(vec![
            Block::new(
                "heading-block",
                BlockKind::Heading {
                    level: 2,
                    text: vec![RichText::plain("Getting started")],
                    toggleable: false,
                },
            ),
            Block::new(
                "para-block",
                BlockKind::Paragraph {
                    text: vec![RichText::plain("Welcome!")],
                },
            ),
        ]))
    }
}

fn record(raw_id: &str, title: &str, status: &str) -> PostRecord {
    PostRecord {
        post: BlogPost {
            id: NotionId::parse(raw_id).expect("valid id"),
            title: title.to_string(),
            description: format!("About {title}"),
            created_at: "2026-03-01".to_string(),
            updated_at: "2026-03-02T09:00:00.000Z".to_string(),
            tags: vec!["rust".to_string()],
            category: Some("Dev".to_string()),
            project: Some("Folio".to_string()),
        },
        status: Some(status.to_string()),
    }
}

fn app_with_limit(max_writes: u32) -> Router {
    let source: Arc<dyn ContentSource> = Arc::new(StaticSource {
        records: vec![
            record(PUBLISHED, "Shipping Folio", "Published"),
            record(DRAFT, "Half written", "Draft"),
        ],
    });
    let loader = BlockTreeLoader::new(source.clone(), 4, 2);
    let posts = Arc::new(PostService::new(
        source,
        loader,
        10,
        PostCacheConfig {
            revalidate: Duration::from_secs(60),
            capacity: NonZeroUsize::new(8).expect("non-zero"),
        },
    ));
    let store = Arc::new(MemoryStore::default());

    build_router(HttpState {
        posts,
        views: Arc::new(ViewService::new(store.clone())),
        comments: Arc::new(CommentService::new(
            store,
            Some(ADMIN_PASSWORD.to_string()),
            CommentLimits::default(),
        )),
        site: Arc::new(SiteSettings {
            base_url: Url::parse("https://blog.example.com").expect("url"),
            title: "Example Blog".to_string(),
            author: "Sam".to_string(),
            description: "Notes".to_string(),
            posts_per_page: NonZeroU32::new(10).expect("non-zero"),
        }),
        profile: Arc::new(Profile {
            name: "Sam Example".to_string(),
            headline: "Backend engineer".to_string(),
            ..Profile::default()
        }),
        rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), max_writes)),
    })
}

fn app() -> Router {
    app_with_limit(100)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[tokio::test]
async fn views_require_slug_and_count_up() {
    let app = app();

    let response = send(&app, Method::GET, "/api/view", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Slug is required");

    let response = send(&app, Method::POST, "/api/view", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, Method::GET, "/api/view?slug=hello", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "views": 0 }));

    for expected in 1..=2 {
        let response = send(
            &app,
            Method::POST,
            "/api/view",
            Some(json!({ "slug": "hello" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "views": expected }));
    }

    let response = send(&app, Method::GET, "/api/view?slug=hello", None).await;
    assert_eq!(body_json(response).await, json!({ "views": 2 }));
}

#[tokio::test]
async fn comment_lifecycle_checks_passwords() {
    let app = app();

    let response = send(&app, Method::GET, "/api/comments", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Post ID is required");

    let response = send(
        &app,
        Method::POST,
        "/api/comments",
        Some(json!({ "postId": "p1", "username": "ana" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing required fields");

    let response = send(
        &app,
        Method::POST,
        "/api/comments",
        Some(json!({
            "postId": "p1",
            "username": "ana",
            "password": "pw1",
            "content": "First!"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let response = send(&app, Method::GET, "/api/comments?postId=p1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let comments = body_json(response).await;
    let listed = comments.as_array().expect("array of comments");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["username"], "ana");
    assert_eq!(listed[0]["content"], "First!");
    assert!(listed[0].get("password").is_none());
    let comment_id = listed[0]["id"].as_str().expect("comment id").to_string();

    let response = send(
        &app,
        Method::PUT,
        "/api/comments",
        Some(json!({
            "postId": "p1",
            "commentId": comment_id,
            "password": "wrong",
            "content": "Edited"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::PUT,
        "/api/comments",
        Some(json!({
            "postId": "p1",
            "commentId": comment_id,
            "password": "pw1",
            "content": "Edited"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/api/comments?postId=p1", None).await;
    assert_eq!(body_json(response).await[0]["content"], "Edited");

    let response = send(
        &app,
        Method::DELETE,
        "/api/comments",
        Some(json!({ "postId": "p1", "commentId": "missing", "password": "pw1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        Method::DELETE,
        "/api/comments",
        Some(json!({ "postId": "p1", "commentId": comment_id, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::GET, "/api/comments?postId=p1", None).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn write_endpoints_are_rate_limited() {
    let app = app_with_limit(2);

    for _ in 0..2 {
        let response = send(
            &app,
            Method::POST,
            "/api/view",
            Some(json!({ "slug": "limited" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(
        &app,
        Method::POST,
        "/api/view",
        Some(json!({ "slug": "limited" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("60")
    );
    assert_eq!(body_json(response).await["code"], "rate_limited");

    let response = send(&app, Method::GET, "/api/view?slug=limited", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_lists_published_posts_only() {
    let app = app();

    let response = send(&app, Method::GET, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Shipping Folio"));
    assert!(!html.contains("Half written"));
    assert!(html.contains("Example Blog"));

    let response = send(&app, Method::GET, "/?category=Nope", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains("Shipping Folio"));
}

#[tokio::test]
async fn post_page_renders_body_and_toc() {
    let app = app();

    let response = send(&app, Method::GET, &format!("/post/{PUBLISHED}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Shipping Folio"));
    assert!(html.contains("<p>Welcome!</p>"));
    assert!(html.contains("Getting started"));
    assert!(html.contains("data-post-id"));
}

#[tokio::test]
async fn unpublished_unknown_and_malformed_posts_are_not_found() {
    let app = app();

    for uri in [
        format!("/post/{DRAFT}"),
        format!("/post/{UNKNOWN}"),
        "/post/not-an-id".to_string(),
        "/no/such/route".to_string(),
    ] {
        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {uri}");
    }
}

#[tokio::test]
async fn legacy_blog_paths_redirect() {
    let app = app();

    let response = send(&app, Method::GET, "/blog", None).await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );

    let response = send(&app, Method::GET, &format!("/blog/{PUBLISHED}"), None).await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    let expected = format!(
        "/post/{}",
        NotionId::parse(PUBLISHED).expect("valid id")
    );
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some(expected.as_str())
    );
}

#[tokio::test]
async fn about_and_resume_render_profile() {
    let app = app();

    for uri in ["/about", "/resume"] {
        let response = send(&app, Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
        assert!(body_text(response).await.contains("Sam Example"), "uri: {uri}");
    }
}

#[tokio::test]
async fn sitemap_lists_static_routes_and_posts() {
    let app = app();

    let response = send(&app, Method::GET, "/sitemap.xml", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("<loc>https://blog.example.com/about</loc>"));
    assert!(xml.contains("<loc>https://blog.example.com/resume</loc>"));
    assert!(xml.contains(&format!(
        "<loc>https://blog.example.com/post/{}</loc>",
        NotionId::parse(PUBLISHED).expect("valid id")
    )));
    assert!(xml.contains("<lastmod>2026-03-02</lastmod>"));
    assert!(!xml.contains(&NotionId::parse(DRAFT).expect("valid id").to_string()));
}

#[tokio::test]
async fn graph_connects_posts_to_tags_and_projects() {
    let app = app();

    let response = send(&app, Method::GET, "/api/graph", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let graph = body_json(response).await;
    let nodes = graph["nodes"].as_array().expect("nodes");
    assert!(nodes.iter().any(|node| node["name"] == "Shipping Folio"));
    assert!(!nodes.iter().any(|node| node["name"] == "Half written"));
    assert!(!graph["links"].as_array().expect("links").is_empty());
}

#[tokio::test]
async fn static_assets_are_served() {
    let app = app();

    let response = send(&app, Method::GET, "/static/style.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, Method::GET, "/static/syntax.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, Method::GET, "/static/missing.css", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
