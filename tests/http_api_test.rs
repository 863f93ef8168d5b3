mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use helpdesk::core::shared::User;
use helpdesk::core::store::HelpdeskStore;
use helpdesk::main_module::build_router;

use common::{world, World};

fn app(w: &World) -> Router {
    build_router(w.state.clone())
}

fn request(method: Method, uri: &str, as_user: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        builder = builder.header("x-helpdesk-user", user.id.to_string());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_actor() {
    let w = world();
    let (status, body) = send(app(&w), request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "helpdesk");
}

#[tokio::test]
async fn test_api_requires_known_active_user() {
    let w = world();

    let (status, body) = send(app(&w), request(Method::GET, "/api/tickets", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let req = Request::builder()
        .uri("/api/tickets")
        .header("x-helpdesk-user", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&w), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/tickets")
        .header("x-helpdesk-user", "4242")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&w), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        app(&w),
        request(
            Method::PUT,
            &format!("/api/users/{}/active", w.branch_user.id),
            Some(&w.branch_admin),
            Some(json!({ "is_active": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app(&w),
        request(Method::GET, "/api/tickets", Some(&w.branch_user), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ticket_flow_over_http() {
    let w = world();

    let (status, ticket) = send(
        app(&w),
        request(
            Method::POST,
            "/api/tickets",
            Some(&w.branch_user),
            Some(json!({
                "title": "Monitor is dead",
                "description": "No power LED",
                "category": "bug",
                "urgency": "high"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["company_id"], w.branch.id);
    let id = ticket["id"].as_i64().unwrap();

    let (status, moved) = send(
        app(&w),
        request(
            Method::PUT,
            &format!("/api/tickets/{id}/status"),
            Some(&w.branch_tech),
            Some(json!({ "status": "in_progress", "comment": "taking it" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "in_progress");

    let (status, comment) = send(
        app(&w),
        request(
            Method::POST,
            &format!("/api/tickets/{id}/comments"),
            Some(&w.branch_user),
            Some(json!({ "comment": "thanks!" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["comment"], "thanks!");

    let (status, history) = send(
        app(&w),
        request(
            Method::GET,
            &format!("/api/tickets/{id}/history"),
            Some(&w.branch_user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["action_type"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["status_change", "comment_added"]);

    let (status, stats) = send(
        app(&w),
        request(Method::GET, "/api/tickets/stats", Some(&w.branch_admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["by_status"]["in_progress"], 1);
}

#[tokio::test]
async fn test_errors_map_to_status_codes() {
    let w = world();
    let id = w.open_ticket(&w.branch_user, "Chair squeaks");

    // Validation
    let (status, body) = send(
        app(&w),
        request(
            Method::PUT,
            &format!("/api/tickets/{id}/status"),
            Some(&w.branch_tech),
            Some(json!({ "status": "in_progress", "comment": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Comment"));

    let (status, _) = send(
        app(&w),
        request(
            Method::POST,
            "/api/tickets",
            Some(&w.branch_user),
            Some(json!({ "title": "x", "category": "gossip", "urgency": "low" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Authorization
    let (status, _) = send(
        app(&w),
        request(
            Method::PUT,
            &format!("/api/tickets/{id}/status"),
            Some(&w.branch_tech),
            Some(json!({ "status": "hidden", "comment": "noise" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        app(&w),
        request(Method::GET, "/api/companies", Some(&w.branch_admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Not found
    let (status, _) = send(
        app(&w),
        request(Method::GET, "/api/tickets/9999", Some(&w.owner), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Conflict
    let (status, _) = send(
        app(&w),
        request(
            Method::POST,
            "/api/users",
            Some(&w.branch_admin),
            Some(json!({
                "email": "USER@branch.test",
                "password": "long-enough-secret",
                "full_name": "Someone Else",
                "role": "user"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let w = world();
    let id = w.open_ticket(&w.branch_user, "Broken JSON");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/tickets")
        .header("x-helpdesk-user", w.branch_user.id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": \"unterminated"))
        .unwrap();
    let (status, body) = send(app(&w), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let (status, body) = send(
        app(&w),
        request(
            Method::PUT,
            &format!("/api/tickets/{id}/status"),
            Some(&w.branch_tech),
            Some(json!({ "comment": "status is missing" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        app(&w),
        request(Method::GET, "/api/tickets/abc", Some(&w.branch_user), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid path parameter"));

    let (status, body) = send(
        app(&w),
        request(Method::GET, "/api/users/x1", Some(&w.branch_admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        app(&w),
        request(
            Method::GET,
            "/api/tickets/recent?limit=many",
            Some(&w.branch_user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));
}

#[tokio::test]
async fn test_soft_and_hard_delete_over_http() {
    let w = world();
    let id = w.open_ticket(&w.branch_user, "Old request");

    let (status, _) = send(
        app(&w),
        request(
            Method::DELETE,
            &format!("/api/tickets/{id}"),
            Some(&w.branch_admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&w),
        request(
            Method::DELETE,
            &format!("/api/tickets/{id}?comment=obsolete"),
            Some(&w.branch_admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        app(&w),
        request(
            Method::GET,
            &format!("/api/tickets/{id}"),
            Some(&w.branch_user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&w),
        request(
            Method::DELETE,
            &format!("/api/tickets/{id}?hard=true"),
            Some(&w.owner),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(w.store.get_ticket(id as i32).unwrap().is_none());
}

#[tokio::test]
async fn test_profile_update_cannot_touch_role() {
    let w = world();

    let (status, profile) = send(
        app(&w),
        request(
            Method::PUT,
            "/api/profile",
            Some(&w.branch_user),
            Some(json!({ "full_name": "Renamed User", "role": "owner" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["full_name"], "Renamed User");
    assert_eq!(profile["role"], "user");
    assert!(profile.get("password_hash").is_none());
}
