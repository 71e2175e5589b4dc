pub mod error;
mod handlers;
mod middleware;
pub mod rate_limit;

use axum::{Router, middleware as axum_middleware, routing::get};

use super::HttpState;

pub fn build_api_router(state: HttpState) -> Router<HttpState> {
    Router::new()
        .route(
            "/api/view",
            get(handlers::get_views).post(handlers::record_view),
        )
        .route(
            "/api/comments",
            get(handlers::list_comments)
                .post(handlers::create_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route("/api/graph", get(handlers::graph))
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::api_rate_limit,
        ))
}
