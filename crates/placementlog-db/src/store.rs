//! Store contracts. Services only see these traits; `Database` is the
//! production implementation and `MemoryStore` the in-process one.
//!
//! All methods are blocking. Async callers go through `spawn_blocking`.

use placementlog_types::models::{PlacementEvent, Post};

use crate::error::StoreResult;
use crate::models::{AdminRow, NewPlacement, NewUser, TotalRow, UserRow};

/// Student and admin credentials. The two namespaces never overlap: a
/// registration number and an admin username may be equal without conflict.
pub trait CredentialStore: Send + Sync {
    /// Fails with `StoreError::Conflict` if the registration number is taken.
    fn insert_user(&self, user: &NewUser<'_>) -> StoreResult<UserRow>;

    fn find_user_by_registration_number(&self, registration_number: &str)
    -> StoreResult<Option<UserRow>>;

    /// Fails with `StoreError::Conflict` if the username is taken.
    fn insert_admin(&self, id: &str, username: &str, password_hash: &str)
    -> StoreResult<AdminRow>;

    fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminRow>>;
}

pub trait PostStore: Send + Sync {
    /// Inserts an unreviewed post.
    fn insert_post(&self, id: &str, user_id: &str, body: &serde_json::Value) -> StoreResult<Post>;

    /// Replaces the body and clears `reviewed`, only when `user_id` owns the
    /// post. `None` covers both "no such post" and "not yours".
    fn update_post_body(
        &self,
        id: &str,
        user_id: &str,
        body: &serde_json::Value,
    ) -> StoreResult<Option<Post>>;

    /// Returns false when no post has this id.
    fn set_reviewed(&self, id: &str, reviewed: bool) -> StoreResult<bool>;

    /// Returns false when the post is absent or owned by someone else.
    fn delete_post(&self, id: &str, user_id: &str) -> StoreResult<bool>;

    fn delete_post_unchecked(&self, id: &str) -> StoreResult<bool>;

    /// Reviewed posts, newest first.
    fn approved_posts(&self) -> StoreResult<Vec<Post>>;

    /// Reviewed posts owned by `user_id`, newest first.
    fn approved_posts_by_user(&self, user_id: &str) -> StoreResult<Vec<Post>>;

    /// Every post, newest first.
    fn all_posts(&self) -> StoreResult<Vec<Post>>;
}

pub trait PlacementStore: Send + Sync {
    /// Writes the event and its tallies atomically.
    fn insert_placement(&self, placement: &NewPlacement) -> StoreResult<PlacementEvent>;

    /// Newest placement date first, tallies sorted by branch.
    fn placements(&self) -> StoreResult<Vec<PlacementEvent>>;

    /// Summed counts grouped by (company, branch), ordered company then branch.
    fn company_branch_totals(&self) -> StoreResult<Vec<TotalRow>>;

    /// Summed counts grouped by (branch, company), ordered branch then company.
    fn branch_company_totals(&self) -> StoreResult<Vec<TotalRow>>;
}
