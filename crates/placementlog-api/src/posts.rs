use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use placementlog_db::PostStore;
use placementlog_types::api::{MessageResponse, PostRequest};
use placementlog_types::models::Post;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::response::respond;
use crate::state::{AppState, run_blocking};

/// What an admin can do to a post under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    fn reviewed(self) -> bool {
        matches!(self, ReviewAction::Approve)
    }
}

impl FromStr for ReviewAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            other => Err(ApiError::InvalidAction(format!(
                "unknown review action '{other}', expected approve or reject"
            ))),
        }
    }
}

fn require_id(id: &str) -> ApiResult<()> {
    if id.is_empty() {
        return Err(ApiError::Validation("post id is required".into()));
    }
    Ok(())
}

fn require_object(body: &Value) -> ApiResult<()> {
    if !body.is_object() {
        return Err(ApiError::Validation("post_body must be a JSON object".into()));
    }
    Ok(())
}

pub struct PostService {
    store: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, owner_id: &str, body: &Value) -> ApiResult<Post> {
        if owner_id.is_empty() {
            return Err(ApiError::Validation("owner id is required".into()));
        }
        require_object(body)?;

        let id = Uuid::new_v4().to_string();
        let post = self.store.insert_post(&id, owner_id, body)?;
        info!(post_id = %post.id, user_id = %owner_id, "Post created");
        Ok(post)
    }

    /// Replaces the body and sends the post back to review.
    pub fn edit(&self, post_id: &str, owner_id: &str, body: &Value) -> ApiResult<Post> {
        require_id(post_id)?;
        require_object(body)?;

        self.store
            .update_post_body(post_id, owner_id, body)?
            .ok_or(ApiError::NotFoundOrForbidden)
    }

    pub fn review(&self, post_id: &str, action: &str) -> ApiResult<ReviewAction> {
        require_id(post_id)?;
        let action: ReviewAction = action.parse()?;

        if !self.store.set_reviewed(post_id, action.reviewed())? {
            return Err(ApiError::NotFound("post".into()));
        }
        info!(post_id, ?action, "Post reviewed");
        Ok(action)
    }

    pub fn delete(&self, post_id: &str, owner_id: &str) -> ApiResult<()> {
        require_id(post_id)?;
        if !self.store.delete_post(post_id, owner_id)? {
            return Err(ApiError::NotFoundOrForbidden);
        }
        Ok(())
    }

    pub fn delete_as_admin(&self, post_id: &str) -> ApiResult<()> {
        require_id(post_id)?;
        if !self.store.delete_post_unchecked(post_id)? {
            return Err(ApiError::NotFound("post".into()));
        }
        Ok(())
    }

    pub fn list_public(&self) -> ApiResult<Vec<Post>> {
        Ok(self.store.approved_posts()?)
    }

    /// Only approved posts; pending ones are not shown to their owner.
    pub fn list_own(&self, owner_id: &str) -> ApiResult<Vec<Post>> {
        Ok(self.store.approved_posts_by_user(owner_id)?)
    }

    pub fn list_all_for_admin(&self) -> ApiResult<Vec<Post>> {
        Ok(self.store.all_posts()?)
    }
}

// -- Query strings --

#[derive(Debug, Deserialize)]
pub struct PostIdQuery {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct UserPostsQuery {
    #[serde(default)]
    pub user_id: String,
}

// -- Handlers --

/// GET /posts
pub async fn list_public(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = run_blocking(move || state.posts.list_public()).await?;
    Ok(respond(StatusCode::OK, posts))
}

/// POST /posts
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let post = run_blocking(move || state.posts.create(&ctx.subject, &req.post_body)).await?;
    Ok(respond(StatusCode::CREATED, post))
}

/// PUT /posts?id=
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<PostIdQuery>, QueryRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    let Json(req) = payload?;
    let post =
        run_blocking(move || state.posts.edit(&q.id, &ctx.subject, &req.post_body)).await?;
    Ok(respond(StatusCode::OK, post))
}

/// DELETE /posts?id=
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    run_blocking(move || state.posts.delete(&q.id, &ctx.subject)).await?;
    Ok(respond(StatusCode::OK, MessageResponse::new("post deleted")))
}

/// GET /posts/user?user_id=. Students may only list their own posts.
pub async fn list_own(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<UserPostsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    if q.user_id.is_empty() {
        return Err(ApiError::Validation("user_id is required".into()));
    }
    if q.user_id != ctx.subject {
        return Err(ApiError::Forbidden(
            "cannot list posts of another user".into(),
        ));
    }

    let posts = run_blocking(move || state.posts.list_own(&ctx.subject)).await?;
    Ok(respond(StatusCode::OK, posts))
}

/// GET /admin/posts
pub async fn list_for_admin(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = run_blocking(move || state.posts.list_all_for_admin()).await?;
    Ok(respond(StatusCode::OK, posts))
}

/// PUT /admin/posts/review?id=&action=
pub async fn review(
    State(state): State<AppState>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    let action = run_blocking(move || state.posts.review(&q.id, &q.action)).await?;

    let message = match action {
        ReviewAction::Approve => "post approved",
        ReviewAction::Reject => "post rejected",
    };
    Ok(respond(StatusCode::OK, MessageResponse::new(message)))
}

/// DELETE /admin/posts?id=
pub async fn delete_as_admin(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    query: Result<Query<PostIdQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(q) = query?;
    let post_id = q.id.clone();
    run_blocking(move || state.posts.delete_as_admin(&q.id)).await?;

    info!(admin_id = %ctx.subject, %post_id, "Post deleted by admin");
    Ok(respond(StatusCode::OK, MessageResponse::new("post deleted by admin")))
}
