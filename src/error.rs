//! Request-level error taxonomy shared by handlers and service clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request body did not carry a document URL.
    #[error("Document URL is required")]
    MissingDocumentUrl,

    /// A collaborator service was unreachable, timed out, or returned a
    /// non-success status. Not retried.
    #[error("{service} request failed: {detail}")]
    ServiceUnavailable {
        service: &'static str,
        detail: String,
    },

    /// A collaborator answered successfully but with a shape we cannot use.
    #[error("unexpected {service} response: {detail}")]
    UnexpectedResponse {
        service: &'static str,
        detail: String,
    },
}

impl Error {
    pub fn unavailable(service: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable {
            service,
            detail: detail.to_string(),
        }
    }

    pub fn unexpected(service: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::UnexpectedResponse {
            service,
            detail: detail.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::MissingDocumentUrl => StatusCode::BAD_REQUEST,
            Error::ServiceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Error::UnexpectedResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_message_is_exact() {
        assert_eq!(
            Error::MissingDocumentUrl.to_string(),
            "Document URL is required"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::MissingDocumentUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::unavailable("document analysis", "connection refused").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::unexpected("completion", "no choices").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
