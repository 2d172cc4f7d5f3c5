mod common;

use axum::body::Body;
use http::{Method, Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn test_healthcheck_reports_database() {
    let app = common::test_app().await;
    let response = app
        .oneshot(common::request(Method::GET, "/healthcheck"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["database"]["healthy"], true);
}

#[tokio::test]
async fn test_version_endpoint() {
    let app = common::test_app().await;
    let response = app
        .oneshot(common::request(Method::GET, "/version"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_sha"].is_string());
}

#[tokio::test]
async fn test_not_found() {
    let app = common::test_app().await;
    let response = app
        .oneshot(common::request(Method::GET, "/nonexistent"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = common::test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .header("Origin", "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/v1/api/services")
                .header("Origin", "http://example.com")
                .header("Access-Control-Request-Method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
    assert!(response
        .headers()
        .contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn test_role_catalog() {
    let app = common::test_app().await;
    let response = app
        .oneshot(common::request(Method::GET, "/v1/api/roles"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|role| role["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "admin",
            "view-and-refund",
            "view-and-initiate-moto",
            "view-only"
        ]
    );
    assert_eq!(body["data"][0]["description"], "Administrator");
}
