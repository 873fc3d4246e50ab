//! End-to-end flows through the router, backed by an in-memory SQLite
//! database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use placementlog_api::{AppState, AppStateInner, TokenService, router};
use placementlog_db::Database;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    state: AppState,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let tokens = TokenService::new(SECRET).unwrap();
        let state = AppStateInner::with_database(tokens, db);
        let app = router(state.clone());
        Self { state, app }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let res = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register_student(&self, regno: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "registration_number": regno, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["id"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn admin_token(&self) -> String {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.admins.ensure_admin("root", "root-pw"))
            .await
            .unwrap()
            .unwrap();

        let (status, body) = self
            .request(
                Method::POST,
                "/admin/login",
                None,
                Some(json!({ "username": "root", "password": "root-pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

fn post_body(company: &str) -> Value {
    json!({
        "post_body": {
            "company": company,
            "role": "SDE",
            "rounds": [{ "content": "Online assessment" }, { "content": "Interview" }]
        }
    })
}

// -- Auth --

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "regno": "22BCS1111", "display_name": "Asha", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["err"], false);
    assert_eq!(body["data"]["registration_number"], "22bcs1111");
    assert_eq!(body["data"]["display_name"], "Asha");
    assert!(body["data"].get("password").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "registration_number": "22bcs1111", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_register_accepts_legacy_field_names() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "regno": "22bcs1111", "username": "John", "password": "pw", "client": "web" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["display_name"], "John");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register_student("22bcs1111", "pw").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "registration_number": "22BCS1111", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["err"], true);
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.register_student("22bcs1111", "pw").await;

    let cases = [
        (json!({ "registration_number": "22bcs1111", "password": "wrong" }), StatusCode::UNAUTHORIZED),
        (json!({ "registration_number": "22bcs9999", "password": "pw" }), StatusCode::UNAUTHORIZED),
        (json!({ "registration_number": "", "password": "pw" }), StatusCode::BAD_REQUEST),
        (json!({ "registration_number": "not-a-regno", "password": "pw" }), StatusCode::BAD_REQUEST),
    ];
    for (payload, expected) in cases {
        let (status, body) = app
            .request(Method::POST, "/auth/login", None, Some(payload.clone()))
            .await;
        assert_eq!(status, expected, "{payload} -> {body}");
        assert_eq!(body["err"], true);
    }
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let app = TestApp::new();
    let res = app
        .app
        .clone()
        .oneshot(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["err"], true);
    assert!(body["data"].is_string());
}

#[tokio::test]
async fn test_token_roles_are_enforced() {
    let app = TestApp::new();
    let (user_id, user_token) = app.register_student("22bcs1111", "pw").await;
    let admin_token = app.admin_token().await;

    let (status, _) = app
        .request(Method::GET, "/admin/posts", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/posts", Some(&admin_token), Some(post_body("Acme")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.request(Method::GET, "/auth/me", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "id": user_id, "role": "user" }));

    let (status, body) = app.request(Method::GET, "/auth/me", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let (status, body) = app
        .request(Method::GET, "/auth/me", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"].as_str().unwrap().starts_with("unauthorized"));
}

#[tokio::test]
async fn test_logout_is_stateless() {
    let app = TestApp::new();
    let (_, token) = app.register_student("22bcs1111", "pw").await;

    let (status, body) = app.request(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["message"].is_string());

    let (status, _) = app.request(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_registration_requires_admin() {
    let app = TestApp::new();
    let creds = json!({ "username": "second", "password": "pw" });

    let (status, _) = app
        .request(Method::POST, "/admin/register", None, Some(creds.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin_token = app.admin_token().await;
    let (status, body) = app
        .request(Method::POST, "/admin/register", Some(&admin_token), Some(creds.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["username"], "second");

    let (status, _) = app
        .request(Method::POST, "/admin/register", Some(&admin_token), Some(creds))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// -- Posts --

#[tokio::test]
async fn test_post_moderation_flow() {
    let app = TestApp::new();
    let (user_id, user_token) = app.register_student("22bcs1111", "pw").await;
    let admin_token = app.admin_token().await;

    let (status, body) = app
        .request(Method::POST, "/posts", Some(&user_token), Some(post_body("Acme")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["reviewed"], false);
    assert_eq!(body["data"]["user_id"], user_id.as_str());
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.request(Method::GET, "/posts", None, None).await;
    assert_eq!(body["data"], json!([]));

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/admin/posts/review?id={post_id}&action=approve"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "post approved");

    let (_, body) = app.request(Method::GET, "/posts", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], post_id.as_str());

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/posts/user?user_id={user_id}"),
            Some(&user_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/posts?id={post_id}"),
            Some(&user_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.request(Method::GET, "/admin/posts", Some(&admin_token), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_edit_resets_review() {
    let app = TestApp::new();
    let (_, user_token) = app.register_student("22bcs1111", "pw").await;
    let admin_token = app.admin_token().await;

    let (_, body) = app
        .request(Method::POST, "/posts", Some(&user_token), Some(post_body("Acme")))
        .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    app.request(
        Method::PUT,
        &format!("/admin/posts/review?id={post_id}&action=approve"),
        Some(&admin_token),
        None,
    )
    .await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/posts?id={post_id}"),
            Some(&user_token),
            Some(post_body("Globex")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reviewed"], false);
    assert_eq!(body["data"]["post_body"]["company"], "Globex");

    let (_, body) = app.request(Method::GET, "/posts", None, None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_ownership_is_enforced() {
    let app = TestApp::new();
    let (owner_id, owner_token) = app.register_student("22bcs1111", "pw").await;
    let (_, other_token) = app.register_student("22mec2222", "pw").await;

    let (_, body) = app
        .request(Method::POST, "/posts", Some(&owner_token), Some(post_body("Acme")))
        .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/posts?id={post_id}"),
            Some(&other_token),
            Some(post_body("Globex")),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/posts?id={post_id}"),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/posts/user?user_id={owner_id}"),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_review_errors() {
    let app = TestApp::new();
    let (_, user_token) = app.register_student("22bcs1111", "pw").await;
    let admin_token = app.admin_token().await;

    let (_, body) = app
        .request(Method::POST, "/posts", Some(&user_token), Some(post_body("Acme")))
        .await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/admin/posts/review?id={post_id}&action=publish"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            "/admin/posts/review?id=missing&action=approve",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.request(Method::GET, "/admin/posts", Some(&admin_token), None).await;
    assert_eq!(body["data"][0]["reviewed"], false);

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/admin/posts?id={post_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "post deleted by admin");
}

#[tokio::test]
async fn test_own_posts_ignore_spoofed_identity_header() {
    let app = TestApp::new();
    let (victim_id, victim_token) = app.register_student("22bcs1111", "pw").await;
    let (_, attacker_token) = app.register_student("22mec2222", "pw").await;

    app.request(Method::POST, "/posts", Some(&victim_token), Some(post_body("Acme")))
        .await;

    let res = app
        .app
        .clone()
        .oneshot(
            Request::get(format!("/posts/user?user_id={victim_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {attacker_token}"))
                .header("x-user-id", victim_id.as_str())
                .header("x-user-role", "admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_own_posts_require_user_id() {
    let app = TestApp::new();
    let (_, token) = app.register_student("22bcs1111", "pw").await;

    let (status, body) = app.request(Method::GET, "/posts/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["err"], true);
}

// -- Placements --

#[tokio::test]
async fn test_placement_aggregation() {
    let app = TestApp::new();
    let admin_token = app.admin_token().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/admin/placements",
            Some(&admin_token),
            Some(json!({
                "company": "Acme",
                "ctc": 12.5,
                "placement_date": "2024-03-01",
                "students": ["22bcs1", "22mec2", "22bcs3"],
                "note": "campus drive"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["placement_id"].as_i64().is_some());
    assert_eq!(
        body["data"]["branch_counts"],
        json!([{ "branch": "bcs", "count": 2 }, { "branch": "mec", "count": 1 }])
    );

    let (status, body) = app
        .request(Method::GET, "/placements/company-branch", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["Acme"],
        json!([{ "branch": "bcs", "total": 2 }, { "branch": "mec", "total": 1 }])
    );

    let (_, body) = app
        .request(Method::GET, "/placements/branch-company", None, None)
        .await;
    assert_eq!(body["data"]["bcs"], json!([{ "company": "Acme", "total": 2 }]));

    let (_, body) = app.request(Method::GET, "/placements", None, None).await;
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0]["id"].as_i64().is_some());
    assert_eq!(events[0]["placement_date"], "2024-03-01");
}

#[tokio::test]
async fn test_placements_need_admin() {
    let app = TestApp::new();
    let (_, user_token) = app.register_student("22bcs1111", "pw").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/placements",
            Some(&user_token),
            Some(json!({ "company": "Acme", "ctc": 10.0, "students": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app.request(Method::GET, "/placements", None, None).await;
    assert_eq!(body["data"], json!([]));
}
