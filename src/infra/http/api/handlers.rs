use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{application::comments::NewComment, domain::graph::build_graph};

use super::{super::HttpState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewQuery {
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewBody {
    slug: Option<String>,
}

#[derive(Debug, Serialize)]
struct ViewsResponse {
    views: u64,
}

pub async fn get_views(State(state): State<HttpState>, Query(query): Query<ViewQuery>) -> Response {
    let slug = query.slug.unwrap_or_default();
    match state.views.views(&slug).await {
        Ok(views) => Json(ViewsResponse { views }).into_response(),
        Err(err) => ApiError::from_view_error(err, "Error fetching views").into_response(),
    }
}

pub async fn record_view(
    State(state): State<HttpState>,
    body: Result<Json<ViewBody>, JsonRejection>,
) -> Response {
    let slug = match body {
        Ok(Json(body)) => body.slug.unwrap_or_default(),
        Err(_) => String::new(),
    };
    match state.views.record_view(&slug).await {
        Ok(views) => Json(ViewsResponse { views }).into_response(),
        Err(err) => ApiError::from_view_error(err, "Error incrementing views").into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentsQuery {
    post_id: Option<String>,
}

/// Shared shape of the comment write bodies; each handler checks its own fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentBody {
    post_id: Option<String>,
    comment_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
    content: Option<String>,
}

pub async fn list_comments(
    State(state): State<HttpState>,
    Query(query): Query<CommentsQuery>,
) -> Response {
    let Some(post_id) = present(query.post_id) else {
        return ApiError::bad_request("Post ID is required").into_response();
    };
    match state.comments.list(&post_id).await {
        Ok(comments) => Json(comments).into_response(),
        Err(err) => ApiError::from_comment_error(err, "Failed to fetch comments").into_response(),
    }
}

pub async fn create_comment(
    State(state): State<HttpState>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Response {
    let body = comment_body(body);
    let (Some(post_id), Some(username), Some(password), Some(content)) = (
        present(body.post_id),
        present(body.username),
        present(body.password),
        present(body.content),
    ) else {
        return ApiError::missing_fields().into_response();
    };

    let input = NewComment {
        post_id,
        username,
        password,
        content,
    };
    match state.comments.create(input).await {
        Ok(_) => success(),
        Err(err) => ApiError::from_comment_error(err, "Failed to create comment").into_response(),
    }
}

pub async fn update_comment(
    State(state): State<HttpState>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Response {
    let body = comment_body(body);
    let (Some(post_id), Some(comment_id), Some(password), Some(content)) = (
        present(body.post_id),
        present(body.comment_id),
        present(body.password),
        present(body.content),
    ) else {
        return ApiError::missing_fields().into_response();
    };

    match state
        .comments
        .update(&post_id, &comment_id, &password, &content)
        .await
    {
        Ok(()) => success(),
        Err(err) => ApiError::from_comment_error(err, "Failed to update comment").into_response(),
    }
}

pub async fn delete_comment(
    State(state): State<HttpState>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Response {
    let body = comment_body(body);
    let (Some(post_id), Some(comment_id), Some(password)) = (
        present(body.post_id),
        present(body.comment_id),
        present(body.password),
    ) else {
        return ApiError::missing_fields().into_response();
    };

    match state.comments.delete(&post_id, &comment_id, &password).await {
        Ok(()) => success(),
        Err(err) => ApiError::from_comment_error(err, "Failed to delete comment").into_response(),
    }
}

pub async fn graph(State(state): State<HttpState>) -> Response {
    match state.posts.all_posts().await {
        Ok(posts) => Json(build_graph(&posts)).into_response(),
        Err(err) => ApiError::from_post_error(err).into_response(),
    }
}

fn comment_body(body: Result<Json<CommentBody>, JsonRejection>) -> CommentBody {
    body.map(|Json(body)| body).unwrap_or_default()
}

/// Missing and empty values are treated alike.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn success() -> Response {
    Json(json!({ "success": true })).into_response()
}
