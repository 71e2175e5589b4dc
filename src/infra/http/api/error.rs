use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    application::{
        comments::CommentError, error::ErrorReport, posts::PostError, views::ViewError,
    },
    domain::error::DomainError,
};

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const STORE: &str = "store_error";
    pub const UNAVAILABLE: &str = "unavailable";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn missing_fields() -> Self {
        Self::bad_request("Missing required fields")
    }

    /// Store failure; `detail` goes to the logs only.
    pub fn store(message: &'static str, detail: impl ToString) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::STORE, message)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let mut response = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::RATE_LIMITED,
            "Too many requests",
        )
        .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }

    pub fn from_view_error(error: ViewError, failure: &'static str) -> Self {
        match error {
            ViewError::MissingSlug => Self::bad_request("Slug is required"),
            ViewError::Repo(err) => Self::store(failure, err),
        }
    }

    pub fn from_comment_error(error: CommentError, failure: &'static str) -> Self {
        match error {
            CommentError::NotFound => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Comment not found")
            }
            CommentError::Unauthorized => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Incorrect password",
            ),
            CommentError::Validation(DomainError::Validation { message }) => {
                Self::bad_request(message)
            }
            CommentError::Validation(other) => Self::bad_request(other.to_string()),
            CommentError::Repo(err) => Self::store(failure, err),
        }
    }

    pub fn from_post_error(error: PostError) -> Self {
        Self {
            detail: Some(error.to_string()),
            ..Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UNAVAILABLE,
                "Failed to load posts",
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .detail
            .map(|detail| format!("{}: {detail}", self.code))
            .unwrap_or_else(|| format!("{}: {}", self.code, self.message));
        let body = ApiErrorBody {
            error: self.message,
            code: self.code,
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(SOURCE, self.status, detail).attach(&mut response);
        response
    }
}
