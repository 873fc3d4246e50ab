use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Token role. Students and admins live in separate credential tables and
/// never share a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered student. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub registration_number: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A placement-experience post. `post_body` is stored as opaque JSON;
/// clients conventionally send `{company, role, rounds: [{content}]}`.
/// Only posts with `reviewed == true` are publicly visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub post_body: serde_json::Value,
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
}

/// Number of students from one branch placed in one placement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCount {
    pub branch: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementEvent {
    pub id: i64,
    pub company: String,
    pub ctc: f64,
    pub placement_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub branch_counts: Vec<BranchCount>,
}

/// One entry of the company -> branches view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTotal {
    pub branch: String,
    pub total: i64,
}

/// One entry of the branch -> companies view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyTotal {
    pub company: String,
    pub total: i64,
}
