use std::sync::{Arc, LazyLock};

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use placementlog_db::models::NewUser;
use placementlog_db::{CredentialStore, StoreError};
use placementlog_types::api::{
    AdminAuthResponse, AdminCredentialsRequest, MessageResponse, UserAuthResponse,
    UserLoginRequest, UserRegisterRequest,
};
use placementlog_types::models::{Admin, Role, User};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::password::{hash_password, verify_password};
use crate::response::respond;
use crate::state::{AppState, run_blocking};
use crate::token::TokenService;

/// A freshly issued token and the account it belongs to.
#[derive(Debug)]
pub struct Session<T> {
    pub token: String,
    pub account: T,
}

static REGISTRATION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[a-z]{3}[0-9]{4}$").expect("registration number pattern is valid")
});

/// Lowercases a student registration number and checks its format.
pub fn normalize_registration_number(raw: &str) -> ApiResult<String> {
    let regno = raw.to_lowercase();
    if !REGISTRATION_NUMBER.is_match(&regno) {
        return Err(ApiError::Validation("not a valid registration number".into()));
    }
    Ok(regno)
}

fn require_fields(fields: &[&str]) -> ApiResult<()> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(ApiError::Validation("all fields are required".into()));
    }
    Ok(())
}

fn conflict_as(what: &str) -> impl FnOnce(StoreError) -> ApiError + '_ {
    move |e| match e {
        StoreError::Conflict(_) => ApiError::Conflict(what.to_string()),
        other => ApiError::Store(other),
    }
}

// -- Students --

pub struct UserAuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
}

impl UserAuthService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn login(&self, registration_number: &str, password: &str) -> ApiResult<Session<User>> {
        require_fields(&[registration_number, password])?;
        let regno = normalize_registration_number(registration_number)?;

        let row = self
            .store
            .find_user_by_registration_number(&regno)?
            .ok_or(ApiError::UnknownAccount)?;

        if !verify_password(password, &row.password)? {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(&row.id, Role::User)?;
        info!(user_id = %row.id, "Student logged in");
        Ok(Session {
            token,
            account: row.into_user(),
        })
    }

    pub fn register(
        &self,
        registration_number: &str,
        display_name: Option<&str>,
        password: &str,
    ) -> ApiResult<Session<User>> {
        require_fields(&[registration_number, password])?;
        let regno = normalize_registration_number(registration_number)?;
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();

        let row = self
            .store
            .insert_user(&NewUser {
                id: &id,
                registration_number: &regno,
                display_name,
                password_hash: &password_hash,
            })
            .map_err(conflict_as("user"))?;

        let token = self.tokens.issue(&row.id, Role::User)?;
        info!(user_id = %row.id, "Student registered");
        Ok(Session {
            token,
            account: row.into_user(),
        })
    }
}

// -- Admins --

pub struct AdminAuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
}

impl AdminAuthService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn login(&self, username: &str, password: &str) -> ApiResult<Session<Admin>> {
        require_fields(&[username, password])?;

        let row = self
            .store
            .find_admin_by_username(username)?
            .ok_or(ApiError::UnknownAccount)?;

        if !verify_password(password, &row.password)? {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(&row.id, Role::Admin)?;
        info!(admin_id = %row.id, "Admin logged in");
        Ok(Session {
            token,
            account: row.into_admin(),
        })
    }

    /// Callers must already hold an admin token; the route enforces that.
    pub fn register(&self, username: &str, password: &str) -> ApiResult<Session<Admin>> {
        require_fields(&[username, password])?;

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();

        let row = self
            .store
            .insert_admin(&id, username, &password_hash)
            .map_err(conflict_as("admin"))?;

        let token = self.tokens.issue(&row.id, Role::Admin)?;
        info!(admin_id = %row.id, "Admin registered");
        Ok(Session {
            token,
            account: row.into_admin(),
        })
    }

    /// Creates the configured bootstrap admin unless that username already
    /// exists. Returns whether an account was created.
    pub fn ensure_admin(&self, username: &str, password: &str) -> ApiResult<bool> {
        if self.store.find_admin_by_username(username)?.is_some() {
            return Ok(false);
        }
        self.register(username, password)?;
        Ok(true)
    }
}

impl From<Session<User>> for UserAuthResponse {
    fn from(session: Session<User>) -> Self {
        Self {
            id: session.account.id,
            registration_number: session.account.registration_number,
            display_name: session.account.display_name,
            created_at: session.account.created_at,
            token: session.token,
        }
    }
}

impl From<Session<Admin>> for AdminAuthResponse {
    fn from(session: Session<Admin>) -> Self {
        Self {
            id: session.account.id,
            username: session.account.username,
            created_at: session.account.created_at,
            token: session.token,
        }
    }
}

// -- Handlers --

/// POST /auth/login
pub async fn user_login(
    State(state): State<AppState>,
    payload: Result<Json<UserLoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session =
        run_blocking(move || state.users.login(&req.registration_number, &req.password)).await?;

    Ok(respond(StatusCode::OK, UserAuthResponse::from(session)))
}

/// POST /auth/register
pub async fn user_register(
    State(state): State<AppState>,
    payload: Result<Json<UserRegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = run_blocking(move || {
        state.users.register(
            &req.registration_number,
            req.display_name.as_deref(),
            &req.password,
        )
    })
    .await?;

    Ok(respond(StatusCode::CREATED, UserAuthResponse::from(session)))
}

/// POST /auth/logout. Tokens are stateless, so nothing changes server side.
pub async fn user_logout(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    info!(user_id = %ctx.subject, "Student logged out");
    respond(StatusCode::OK, MessageResponse::new("logged out successfully"))
}

/// POST /admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Json<AdminCredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = run_blocking(move || state.admins.login(&req.username, &req.password)).await?;

    Ok(respond(StatusCode::OK, AdminAuthResponse::from(session)))
}

/// POST /admin/register, behind `require_admin`.
pub async fn admin_register(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<AdminCredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session =
        run_blocking(move || state.admins.register(&req.username, &req.password)).await?;

    info!(by = %ctx.subject, admin_id = %session.account.id, "Admin account created");
    Ok(respond(StatusCode::CREATED, AdminAuthResponse::from(session)))
}

/// POST /admin/logout
pub async fn admin_logout(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    info!(admin_id = %ctx.subject, "Admin logged out");
    respond(StatusCode::OK, MessageResponse::new("admin logged out successfully"))
}

/// GET /auth/me. Echoes the identity behind any valid token.
pub async fn whoami(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    respond(
        StatusCode::OK,
        serde_json::json!({ "id": ctx.subject, "role": ctx.role }),
    )
}
