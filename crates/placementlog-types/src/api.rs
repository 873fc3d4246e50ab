use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BranchCount, PlacementEvent, Role};

// -- Envelope --

/// Every response body has this shape. On failure `data` holds the error
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub err: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { err: false, data }
    }
}

impl Envelope<String> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            err: true,
            data: message.into(),
        }
    }
}

// -- JWT Claims --

/// Claims carried by every access token. `exp` is always `iat + 24h`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

// -- Student auth --

#[derive(Debug, Deserialize)]
pub struct UserLoginRequest {
    #[serde(alias = "regno")]
    pub registration_number: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRegisterRequest {
    #[serde(alias = "regno")]
    pub registration_number: String,
    /// Older clients send the display name as `username`.
    #[serde(default, alias = "username")]
    pub display_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserAuthResponse {
    pub id: String,
    pub registration_number: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub token: String,
}

// -- Admin auth --

/// Used for both admin login and admin registration.
#[derive(Debug, Deserialize)]
pub struct AdminCredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminAuthResponse {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub post_body: serde_json::Value,
}

// -- Placements --

#[derive(Debug, Deserialize)]
pub struct PlacementRequest {
    pub company: String,
    pub ctc: f64,
    /// Defaults to today's date when omitted.
    #[serde(default)]
    pub placement_date: Option<NaiveDate>,
    #[serde(default)]
    pub students: Vec<String>,
}

/// Body of `POST /admin/placements`. Listings use `PlacementEvent` instead,
/// keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementCreatedResponse {
    pub placement_id: i64,
    pub company: String,
    pub ctc: f64,
    pub placement_date: NaiveDate,
    pub branch_counts: Vec<BranchCount>,
}

impl From<PlacementEvent> for PlacementCreatedResponse {
    fn from(event: PlacementEvent) -> Self {
        Self {
            placement_id: event.id,
            company: event.company,
            ctc: event.ctc,
            placement_date: event.placement_date,
            branch_counts: event.branch_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_value(Envelope::error("no such account")).unwrap();
        assert_eq!(json, serde_json::json!({ "err": true, "data": "no such account" }));
    }

    #[test]
    fn login_accepts_regno_alias() {
        let req: UserLoginRequest =
            serde_json::from_str(r#"{"regno":"22bcs1234","password":"pw"}"#).unwrap();
        assert_eq!(req.registration_number, "22bcs1234");
    }

    #[test]
    fn claims_role_is_lowercase() {
        let claims = Claims {
            sub: "abc".into(),
            role: Role::Admin,
            iat: 0,
            exp: 86_400,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn placement_date_is_optional() {
        let req: PlacementRequest =
            serde_json::from_str(r#"{"company":"Acme","ctc":12.5,"students":["22bcs1"]}"#)
                .unwrap();
        assert!(req.placement_date.is_none());
        assert_eq!(req.students.len(), 1);
    }

    #[test]
    fn register_accepts_legacy_field_names() {
        let req: UserRegisterRequest = serde_json::from_str(
            r#"{"regno":"22bcs1111","username":"John","password":"pw","device":"web"}"#,
        )
        .unwrap();
        assert_eq!(req.registration_number, "22bcs1111");
        assert_eq!(req.display_name.as_deref(), Some("John"));
    }

    #[test]
    fn created_placement_is_keyed_by_placement_id() {
        let event = PlacementEvent {
            id: 7,
            company: "Acme".into(),
            ctc: 12.5,
            placement_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
            branch_counts: vec![BranchCount {
                branch: "bcs".into(),
                count: 2,
            }],
        };
        let json = serde_json::to_value(PlacementCreatedResponse::from(event)).unwrap();
        assert_eq!(json["placement_id"], 7);
        assert!(json.get("id").is_none());
        assert_eq!(json["branch_counts"][0]["count"], 2);
    }
}
