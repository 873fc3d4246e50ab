use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use placementlog_types::models::Role;

use crate::error::ApiError;
use crate::state::AppState;
use crate::token::{TokenError, TokenService};

/// Overwritten on every authorized request, so a client-supplied value never
/// reaches a handler.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// Identity injected into request extensions once the bearer token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub subject: String,
    pub role: Role,
}

/// Any valid token, whatever its role.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state.tokens, req, next, None).await
}

/// A valid token with role `user`.
pub async fn require_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state.tokens, req, next, Some(Role::User)).await
}

/// A valid token with role `admin`.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state.tokens, req, next, Some(Role::Admin)).await
}

async fn authorize(
    tokens: &TokenService,
    mut req: Request,
    next: Next,
    required: Option<Role>,
) -> Result<Response, ApiError> {
    let claims = tokens.validate(bearer_token(req.headers())?)?;

    if let Some(expected) = required {
        if claims.role != expected {
            return Err(TokenError::WrongRole {
                expected,
                actual: claims.role,
            }
            .into());
        }
    }

    let subject = HeaderValue::from_str(&claims.sub)
        .map_err(|_| TokenError::Invalid("subject is not a valid header value".into()))?;

    let headers = req.headers_mut();
    headers.insert(USER_ID_HEADER, subject);
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(claims.role.as_str()));

    debug!(subject = %claims.sub, role = %claims.role, "Request authorized");
    req.extensions_mut().insert(AuthContext {
        subject: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("malformed Authorization header".into()))
}
