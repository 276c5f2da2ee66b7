use crate::fetcher::FetchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the proxy pipeline.
///
/// Every variant maps onto a bare status code; the local HTTP caller never
/// receives a structured error body.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid proxy request: {0}")]
    InvalidRequest(String),

    #[error("Failed to build proxy URL: {0}")]
    Encode(String),

    #[error("Origin fetch failed: {0}")]
    OriginFetch(#[from] FetchError),

    #[error("Manifest rewrite failed: {0}")]
    Rewrite(String),

    #[error("Proxy is shutting down")]
    ShuttingDown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// HTTP status returned to the local caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Encode(_)
            | ProxyError::OriginFetch(_)
            | ProxyError::Rewrite(_)
            | ProxyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        status.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_is_bad_request() {
        let err = ProxyError::InvalidRequest("missing origin".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn fetch_and_rewrite_failures_are_server_errors() {
        let fetch = ProxyError::from(FetchError::MissingContentType);
        assert_eq!(fetch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let rewrite = ProxyError::Rewrite("not utf-8".to_string());
        assert_eq!(rewrite.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn shutting_down_is_unavailable() {
        assert_eq!(
            ProxyError::ShuttingDown.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn response_has_empty_body() {
        use http_body_util::BodyExt;

        let resp = ProxyError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
