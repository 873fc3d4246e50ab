use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use placementlog_db::StoreError;
use placementlog_types::api::Envelope;

use crate::token::TokenError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    #[error("invalid action '{0}': must be 'approve' or 'reject'")]
    InvalidAction(String),

    /// Login against an identifier that has no account.
    #[error("no such account exists")]
    UnknownAccount,

    #[error("incorrect password")]
    InvalidCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Edit or delete of a post that is missing or owned by someone else.
    /// The two cases are never told apart.
    #[error("post not found or not owned by caller")]
    NotFoundOrForbidden,

    #[error("{0} already exists")]
    Conflict(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidAction(_) => StatusCode::BAD_REQUEST,
            Self::UnknownAccount | Self::InvalidCredentials | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Token(e) => match e {
                TokenError::MissingSecret | TokenError::Signing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                TokenError::Invalid(_) | TokenError::Expired | TokenError::WrongRole { .. } => {
                    StatusCode::UNAUTHORIZED
                }
            },
            Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the envelope. Database internals stay in the log.
    fn client_message(&self) -> String {
        match self {
            Self::Token(TokenError::MissingSecret | TokenError::Signing(_)) => {
                "failed to issue token".to_string()
            }
            Self::Token(e) => format!("unauthorized: {e}"),
            Self::Store(StoreError::Conflict(_)) => "resource already exists".to_string(),
            Self::Store(_) => "internal database error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            Self::Store(StoreError::Conflict(msg)) => debug!(conflict = %msg, "Store conflict"),
            Self::Store(e) => error!(error = %e, "Store error"),
            Self::Internal(msg) => error!(message = %msg, "Internal error"),
            Self::Token(TokenError::MissingSecret | TokenError::Signing(_)) => {
                error!(error = %self, "Token issuance failed")
            }
            Self::InvalidCredentials | Self::UnknownAccount => warn!("Failed login attempt"),
            Self::Unauthorized(_) | Self::Token(_) => warn!(error = %self, "Rejected request"),
            _ => debug!(error = %self, "Request error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(Envelope::error(self.client_message()))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
