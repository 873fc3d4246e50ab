//! Row types that carry more than the public records do (password hashes) or
//! that only exist on the write path. Distinct from placementlog-types so the
//! hash never reaches a serializer by accident.

use chrono::{DateTime, NaiveDate, Utc};
use placementlog_types::models::{Admin, BranchCount, User};

#[derive(Clone)]
pub struct UserRow {
    pub id: String,
    pub registration_number: String,
    pub display_name: Option<String>,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            registration_number: self.registration_number,
            display_name: self.display_name,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AdminRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl AdminRow {
    pub fn into_admin(self) -> Admin {
        Admin {
            id: self.id,
            username: self.username,
            created_at: self.created_at,
        }
    }
}

/// Input for `insert_user`. `password_hash` must already be a PHC string.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub registration_number: &'a str,
    pub display_name: Option<&'a str>,
    pub password_hash: &'a str,
}

/// A placement event plus its already-derived branch tallies, written in one
/// transaction.
pub struct NewPlacement {
    pub company: String,
    pub ctc: f64,
    pub placement_date: NaiveDate,
    pub branch_counts: Vec<BranchCount>,
}

/// One row of the grouped-by-(company, branch) aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalRow {
    pub company: String,
    pub branch: String,
    pub total: i64,
}
