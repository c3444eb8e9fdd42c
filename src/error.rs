use axum::http::header::WWW_AUTHENTICATE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// type alias for all operations on the prize store, services and client that could fail
/// with a [`NobelError`]
pub type Result<T> = std::result::Result<T, NobelError>;

/// The error variants used throughout this crate.
///
/// Each variant maps onto a single HTTP status code (see [`NobelError::status`]), so the
/// backend and gateway can surface an error to the caller by simply returning it from a
/// handler.
#[derive(Error, Debug)]
pub enum NobelError {
    /// the presented credentials were missing, malformed or did not match
    #[error("invalid or missing credentials")]
    Unauthorized,

    /// the caller's role is not allowed to perform the operation
    #[error("forbidden, this operation requires one of the roles: {allowed}")]
    Forbidden {
        /// comma separated list of the roles that are allowed
        allowed: String,
    },

    /// no prize (or laureate) matched the request
    #[error("not found: {0}")]
    NotFound(String),

    /// the client exceeded its request quota
    #[error("too many requests")]
    RateLimited,

    /// the request payload was malformed
    #[error("invalid payload: {0}")]
    Validation(String),

    /// a remote service (the public dataset, or the backend) could not be reached
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// the prize collection could not be persisted
    #[error("storage failure: {0}")]
    Storage(String),

    /// a command line option or configuration value could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// an error status returned by a remote service, as seen by the [`NobelClient`]
    ///
    /// [`NobelClient`]: crate::NobelClient
    #[error("{status} {body}")]
    Remote {
        /// the HTTP status code
        status: u16,
        /// the raw response body
        body: String,
    },

    /// variant for errors caused by file IO
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// serde_json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl NobelError {
    /// the HTTP status code that this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            NobelError::Unauthorized => StatusCode::UNAUTHORIZED,
            NobelError::Forbidden { .. } => StatusCode::FORBIDDEN,
            NobelError::NotFound(_) => StatusCode::NOT_FOUND,
            NobelError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            NobelError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NobelError::Upstream(_) => StatusCode::BAD_GATEWAY,
            NobelError::Parsing(_) => StatusCode::BAD_REQUEST,
            NobelError::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            NobelError::Storage(_)
            | NobelError::Io(_)
            | NobelError::Json(_)
            | NobelError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// description of the error
    pub error: String,
    /// the HTTP status code
    pub code: u16,
}

impl IntoResponse for NobelError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
            code: status.as_u16(),
        });

        if let NobelError::Unauthorized = self {
            return (status, [(WWW_AUTHENTICATE, "Basic")], body).into_response();
        }
        (status, body).into_response()
    }
}
