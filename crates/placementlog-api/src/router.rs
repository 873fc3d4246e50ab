use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{require_admin, require_auth, require_user};
use crate::response::respond;
use crate::state::AppState;
use crate::{auth, placements, posts};

async fn health() -> impl IntoResponse {
    respond(StatusCode::OK, json!({ "status": "ok" }))
}

/// Builds the full HTTP surface. Each gated group carries its own auth
/// middleware; groups sharing a path are merged per method.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::user_login))
        .route("/auth/register", post(auth::user_register))
        .route("/admin/login", post(auth::admin_login))
        .route("/posts", get(posts::list_public))
        .route("/placements", get(placements::list))
        .route("/placements/company-branch", get(placements::company_branch))
        .route("/placements/branch-company", get(placements::branch_company));

    let any_role_routes = Router::new()
        .route("/auth/me", get(auth::whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let user_routes = Router::new()
        .route("/auth/logout", post(auth::user_logout))
        .route(
            "/posts",
            post(posts::create).put(posts::update).delete(posts::delete),
        )
        .route("/posts/user", get(posts::list_own))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin_routes = Router::new()
        .route("/admin/register", post(auth::admin_register))
        .route("/admin/logout", post(auth::admin_logout))
        .route(
            "/admin/posts",
            get(posts::list_for_admin).delete(posts::delete_as_admin),
        )
        .route("/admin/posts/review", put(posts::review))
        .route("/admin/placements", post(placements::create))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(any_role_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
