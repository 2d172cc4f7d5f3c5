mod common;

use common::{json_request, parse_body, request, TestServer};
use http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_create_service_with_defaults() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(json_request(Method::POST, "/v1/api/services", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["name"], "System Generated");
    assert_eq!(body["data"]["service_names"]["en"], "System Generated");
    assert_eq!(body["data"]["gateway_account_ids"], json!([]));
}

#[tokio::test]
async fn test_create_service_with_welsh_name() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(json_request(
            Method::POST,
            "/v1/api/services",
            &json!({ "service_name": { "en": "Pay for parking", "cy": "Talu am barcio" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["name"], "Pay for parking");
    assert_eq!(body["data"]["service_names"]["cy"], "Talu am barcio");
}

#[tokio::test]
async fn test_create_service_rejects_non_numeric_gateway_ids() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(json_request(
            Method::POST,
            "/v1/api/services",
            &json!({ "gateway_account_ids": ["1", "abc"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(
        body["errors"],
        json!(["Field [gateway_account_ids] must contain numeric values"])
    );
}

#[tokio::test]
async fn test_malformed_service_body_is_bad_request() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/v1/api/services")
                .header("Content-Type", "application/json")
                .body(axum::body::Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_find_service_by_gateway_account_id() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&["42"]).await;

    let response = server
        .router()
        .oneshot(request(Method::GET, "/v1/api/services?gatewayAccountId=42"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["id"], service_id.as_str());

    let response = server
        .router()
        .oneshot(request(Method::GET, "/v1/api/services?gatewayAccountId=43"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_find_services_query_validation() {
    let server = TestServer::new().await;

    let response = server
        .router()
        .oneshot(request(Method::GET, "/v1/api/services"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(
        body["errors"],
        json!(["Find services currently support only by gatewayAccountId"])
    );

    let response = server
        .router()
        .oneshot(request(Method::GET, "/v1/api/services?gatewayAccountId=4x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(
        body["errors"],
        json!(["Query param [gatewayAccountId] must be numeric"])
    );
}

#[tokio::test]
async fn test_patch_service_name() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&[]).await;

    let response = server
        .router()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/v1/api/services/{service_id}"),
            &json!({ "op": "replace", "path": "name", "value": "Pay your council tax" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["name"], "Pay your council tax");
}

#[tokio::test]
async fn test_patch_validation_errors() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&[]).await;
    let uri = format!("/v1/api/services/{service_id}");

    let cases = [
        (
            json!({ "path": "name", "value": "x" }),
            "Field [op] is required",
        ),
        (
            json!({ "op": "replace", "path": "name" }),
            "Field [value] is required",
        ),
        (
            json!({ "op": "replace", "path": "custom_branding", "value": "blue" }),
            "Value for path [custom_branding] must be a JSON",
        ),
        (
            json!({ "op": "replace", "path": "colour", "value": "x" }),
            "Path [colour] is invalid",
        ),
        (
            json!({ "op": "add", "path": "name", "value": "x" }),
            "Operation [add] is invalid for path [name]",
        ),
    ];

    for (payload, message) in cases {
        let response = server
            .router()
            .oneshot(json_request(Method::PATCH, &uri, &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body = parse_body(response).await;
        assert_eq!(body["errors"], json!([message]), "{payload}");
    }
}

#[tokio::test]
async fn test_patch_empty_batch_is_rejected() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&[]).await;

    let response = server
        .router()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/v1/api/services/{service_id}"),
            &json!([]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(
        body["errors"],
        json!(["Field [op] is required", "Field [path] is required"])
    );
}

#[tokio::test]
async fn test_patch_batch_adds_gateway_accounts_and_branding() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&["1"]).await;

    let response = server
        .router()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/v1/api/services/{service_id}"),
            &json!([
                { "op": "add", "path": "gateway_account_ids", "value": ["2", "3"] },
                { "op": "replace", "path": "custom_branding", "value": { "image_url": "logo.png" } }
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["gateway_account_ids"], json!(["1", "2", "3"]));
    assert_eq!(body["data"]["custom_branding"]["image_url"], "logo.png");
}

#[tokio::test]
async fn test_patch_gateway_account_owned_elsewhere_conflicts() {
    let server = TestServer::new().await;
    server.create_service(&["9"]).await;
    let service_id = server.create_service(&[]).await;

    let response = server
        .router()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/v1/api/services/{service_id}"),
            &json!({ "op": "add", "path": "gateway_account_ids", "value": ["9"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patch_unknown_service_is_not_found() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(json_request(
            Method::PATCH,
            "/v1/api/services/123",
            &json!({ "op": "replace", "path": "name", "value": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_merchant_details() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&[]).await;
    let uri = format!("/v1/api/services/{service_id}/merchant-details");

    let response = server
        .router()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            &json!({ "name": "Council", "address_line1": "1 High St", "address_city": "Leeds" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(
        body["errors"],
        json!([
            "Field [address_postcode] is required",
            "Field [address_country] is required"
        ])
    );

    let response = server
        .router()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            &json!({
                "name": "Council",
                "address_line1": "1 High St",
                "address_line2": "Floor 2",
                "address_city": "Leeds",
                "address_postcode": "LS1 1AA",
                "address_country": "GB"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["merchant_details"]["address_line2"], "Floor 2");
    assert_eq!(body["data"]["merchant_details"]["address_postcode"], "LS1 1AA");
}

#[tokio::test]
async fn test_delete_service_removes_memberships() {
    let server = TestServer::new().await;
    let service_id = server.create_service(&["5"]).await;
    server
        .create_member("admin@example.com", &service_id, tenantgate::models::role::RoleName::Admin)
        .await;

    let response = server
        .router()
        .oneshot(request(Method::DELETE, &format!("/v1/api/services/{service_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_roles")
        .fetch_one(server.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let response = server
        .router()
        .oneshot(request(Method::GET, &format!("/v1/api/services/{service_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
