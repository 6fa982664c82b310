//! Router-level behaviour that is decided before any query runs.

mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use foodgram_api::{app::build_app, services::auth_service::issue_token};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = build_app(common::offline_state())
        .oneshot(request)
        .await
        .expect("infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn token() -> String {
    issue_token(Uuid::new_v4(), common::JWT_SECRET, 1).expect("token")
}

#[tokio::test]
async fn anonymous_recipe_create_is_unauthorized() {
    let (status, body) = send(json_request("POST", "/api/recipes/", None, json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized_everywhere() {
    let id = Uuid::new_v4();
    let cases = [
        ("POST", format!("/api/recipes/{id}/favorite/")),
        ("DELETE", format!("/api/recipes/{id}/shopping_cart")),
        ("POST", format!("/api/users/{id}/subscribe/")),
        ("POST", "/api/tags/".to_string()),
        ("GET", "/api/users/me/".to_string()),
        ("GET", "/api/recipes/download_shopping_cart/".to_string()),
    ];
    for (method, uri) in cases {
        let (status, _) = send(json_request(method, &uri, None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let forged = issue_token(Uuid::new_v4(), "another-secret", 1).expect("token");
    let (status, _) = send(json_request("GET", "/api/users/me", Some(&forged), json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recipe_validation_reports_fields() {
    let payload = json!({
        "name": "Soup",
        "text": "Boil",
        "cooking_time": 0,
        "tags": [],
        "ingredients": [{ "id": Uuid::new_v4(), "amount": 1 }]
    });
    let (status, body) =
        send(json_request("POST", "/api/recipes/", Some(&token()), payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["cooking_time"].is_array());
}

#[tokio::test]
async fn tag_color_outside_palette_is_rejected() {
    let payload = json!({ "name": "Night", "color": "#000000", "slug": "night" });
    let (status, body) = send(json_request("POST", "/api/tags", Some(&token()), payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["color"].is_array());
}

#[tokio::test]
async fn wrongly_typed_fields_are_field_errors() {
    let payload = json!({
        "name": "Soup",
        "text": "Boil",
        "cooking_time": "abc",
        "tags": [],
        "ingredients": []
    });
    let (status, body) =
        send(json_request("POST", "/api/recipes/", Some(&token()), payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["cooking_time"].is_array());

    let payload = json!({ "tags": ["not-a-uuid"] });
    let id = Uuid::new_v4();
    let (status, body) = send(json_request(
        "PATCH",
        &format!("/api/recipes/{id}"),
        Some(&token()),
        payload,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["tags"].is_array());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/tags/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token()))
        .body(Body::from("{\"name\": "))
        .expect("request");
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request");
}

#[tokio::test]
async fn me_accepts_get_and_post() {
    for method in ["GET", "POST"] {
        let (status, _) = send(json_request(method, "/api/users/me/", None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method}");
    }
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let request = Request::builder()
        .uri("/api/nothing-here")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nothing-here");
}
