//! In-process store with the same semantics as `Database`. Used to exercise
//! services without SQLite.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use placementlog_types::models::{PlacementEvent, Post};

use crate::error::{StoreError, StoreResult};
use crate::models::{AdminRow, NewPlacement, NewUser, TotalRow, UserRow};
use crate::store::{CredentialStore, PlacementStore, PostStore};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by registration number.
    users: HashMap<String, UserRow>,
    /// Keyed by username.
    admins: HashMap<String, AdminRow>,
    /// Insertion order; listings walk it backwards for newest first.
    posts: Vec<Post>,
    placements: Vec<PlacementEvent>,
    next_placement_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn insert_user(&self, user: &NewUser<'_>) -> StoreResult<UserRow> {
        let mut inner = self.lock()?;
        if inner.users.contains_key(user.registration_number) {
            return Err(StoreError::Conflict(format!(
                "registration number {}",
                user.registration_number
            )));
        }
        let row = UserRow {
            id: user.id.to_string(),
            registration_number: user.registration_number.to_string(),
            display_name: user.display_name.map(str::to_string),
            password: user.password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner
            .users
            .insert(row.registration_number.clone(), row.clone());
        Ok(row)
    }

    fn find_user_by_registration_number(
        &self,
        registration_number: &str,
    ) -> StoreResult<Option<UserRow>> {
        Ok(self.lock()?.users.get(registration_number).cloned())
    }

    fn insert_admin(&self, id: &str, username: &str, password_hash: &str) -> StoreResult<AdminRow> {
        let mut inner = self.lock()?;
        if inner.admins.contains_key(username) {
            return Err(StoreError::Conflict(format!("admin username {username}")));
        }
        let row = AdminRow {
            id: id.to_string(),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.admins.insert(row.username.clone(), row.clone());
        Ok(row)
    }

    fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminRow>> {
        Ok(self.lock()?.admins.get(username).cloned())
    }
}

impl PostStore for MemoryStore {
    fn insert_post(&self, id: &str, user_id: &str, body: &serde_json::Value) -> StoreResult<Post> {
        let mut inner = self.lock()?;
        if inner.posts.iter().any(|p| p.id == id) {
            return Err(StoreError::Conflict(format!("post {id}")));
        }
        let post = Post {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_body: body.clone(),
            reviewed: false,
            created_at: Utc::now(),
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    fn update_post_body(
        &self,
        id: &str,
        user_id: &str,
        body: &serde_json::Value,
    ) -> StoreResult<Option<Post>> {
        let mut inner = self.lock()?;
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id);
        Ok(post.map(|p| {
            p.post_body = body.clone();
            p.reviewed = false;
            p.clone()
        }))
    }

    fn set_reviewed(&self, id: &str, reviewed: bool) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.reviewed = reviewed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_post(&self, id: &str, user_id: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let before = inner.posts.len();
        inner.posts.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(inner.posts.len() < before)
    }

    fn delete_post_unchecked(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let before = inner.posts.len();
        inner.posts.retain(|p| p.id != id);
        Ok(inner.posts.len() < before)
    }

    fn approved_posts(&self) -> StoreResult<Vec<Post>> {
        let inner = self.lock()?;
        Ok(inner.posts.iter().rev().filter(|p| p.reviewed).cloned().collect())
    }

    fn approved_posts_by_user(&self, user_id: &str) -> StoreResult<Vec<Post>> {
        let inner = self.lock()?;
        Ok(inner
            .posts
            .iter()
            .rev()
            .filter(|p| p.reviewed && p.user_id == user_id)
            .cloned()
            .collect())
    }

    fn all_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.lock()?.posts.iter().rev().cloned().collect())
    }
}

impl PlacementStore for MemoryStore {
    fn insert_placement(&self, placement: &NewPlacement) -> StoreResult<PlacementEvent> {
        let mut inner = self.lock()?;
        inner.next_placement_id += 1;

        let mut branch_counts = placement.branch_counts.clone();
        branch_counts.sort_by(|a, b| a.branch.cmp(&b.branch));

        let event = PlacementEvent {
            id: inner.next_placement_id,
            company: placement.company.clone(),
            ctc: placement.ctc,
            placement_date: placement.placement_date,
            created_at: Utc::now(),
            branch_counts,
        };
        inner.placements.push(event.clone());
        Ok(event)
    }

    fn placements(&self) -> StoreResult<Vec<PlacementEvent>> {
        let mut events = self.lock()?.placements.clone();
        events.sort_by(|a, b| {
            b.placement_date
                .cmp(&a.placement_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(events)
    }

    fn company_branch_totals(&self) -> StoreResult<Vec<TotalRow>> {
        let totals = self.totals()?;
        Ok(totals
            .into_iter()
            .map(|((company, branch), total)| TotalRow {
                company,
                branch,
                total,
            })
            .collect())
    }

    fn branch_company_totals(&self) -> StoreResult<Vec<TotalRow>> {
        let mut rows = self.company_branch_totals()?;
        rows.sort_by(|a, b| (&a.branch, &a.company).cmp(&(&b.branch, &b.company)));
        Ok(rows)
    }
}

impl MemoryStore {
    fn totals(&self) -> StoreResult<BTreeMap<(String, String), i64>> {
        let inner = self.lock()?;
        let mut totals = BTreeMap::new();
        for event in &inner.placements {
            for bc in &event.branch_counts {
                *totals
                    .entry((event.company.clone(), bc.branch.clone()))
                    .or_insert(0) += bc.count;
            }
        }
        Ok(totals)
    }
}
