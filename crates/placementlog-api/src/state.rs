use std::sync::Arc;

use tracing::error;

use placementlog_db::{CredentialStore, Database, PlacementStore, PostStore};

use crate::auth::{AdminAuthService, UserAuthService};
use crate::error::ApiError;
use crate::placements::PlacementService;
use crate::posts::PostService;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs. Built once at startup and read-only after.
pub struct AppStateInner {
    pub tokens: TokenService,
    pub users: UserAuthService,
    pub admins: AdminAuthService,
    pub posts: PostService,
    pub placements: PlacementService,
}

impl AppStateInner {
    pub fn new(
        tokens: TokenService,
        credentials: Arc<dyn CredentialStore>,
        posts: Arc<dyn PostStore>,
        placements: Arc<dyn PlacementStore>,
    ) -> AppState {
        Arc::new(Self {
            users: UserAuthService::new(credentials.clone(), tokens.clone()),
            admins: AdminAuthService::new(credentials, tokens.clone()),
            posts: PostService::new(posts),
            placements: PlacementService::new(placements),
            tokens,
        })
    }

    /// One SQLite database backing every store.
    pub fn with_database(tokens: TokenService, db: Arc<Database>) -> AppState {
        Self::new(tokens, db.clone(), db.clone(), db)
    }
}

/// Runs store calls and password hashing off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("background task failed".into())
    })?
}
