use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::Value;

use crate::db;
use crate::error::AppError;
use crate::routes::payload::Payload;
use crate::state::AppState;
use crate::validation::patch::validate_attribute_patches;
use crate::validation::service::{
    parse_create_service, validate_find_query, validate_merchant_details,
    QUERY_GATEWAY_ACCOUNT_ID,
};

pub async fn create_service(
    state: State<AppState>,
    Payload(payload): Payload<Value>,
) -> Result<Json<Value>, AppError> {
    let input = parse_create_service(&payload)?;
    let service = db::services::create_service(&state.db, &input).await?;
    Ok(Json(serde_json::json!({ "data": service })))
}

pub async fn find_services(
    state: State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let gateway_account_id =
        validate_find_query(params.get(QUERY_GATEWAY_ACCOUNT_ID).map(String::as_str))?;
    let service = db::services::find_by_gateway_account_id(&state.db, &gateway_account_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no service for gateway account id {gateway_account_id}"
            ))
        })?;
    Ok(Json(serde_json::json!({ "data": service })))
}

pub async fn get_service(
    state: State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let mut conn = state.db.acquire().await?;
    let service = db::services::get_service(&mut conn, &service_id).await?;
    Ok(Json(serde_json::json!({ "data": service })))
}

pub async fn update_service(
    state: State<AppState>,
    Path(service_id): Path<String>,
    Payload(payload): Payload<Value>,
) -> Result<Json<Value>, AppError> {
    let patches = validate_attribute_patches(&payload)?;
    let service = db::services::apply_patches(&state.db, &service_id, &patches).await?;
    Ok(Json(serde_json::json!({ "data": service })))
}

pub async fn update_merchant_details(
    state: State<AppState>,
    Path(service_id): Path<String>,
    Payload(payload): Payload<Value>,
) -> Result<Json<Value>, AppError> {
    let details = validate_merchant_details(&payload)?;
    let service = db::services::update_merchant_details(&state.db, &service_id, &details).await?;
    Ok(Json(serde_json::json!({ "data": service })))
}

pub async fn delete_service(
    state: State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    db::services::delete_service(&state.db, &service_id).await?;
    Ok(Json(serde_json::json!({ "data": null })))
}

pub async fn list_members(
    state: State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let members = db::members::list_service_members(&state.db, &service_id).await?;
    Ok(Json(serde_json::json!({ "data": members })))
}

pub async fn remove_member(
    state: State<AppState>,
    Path((service_id, user_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    db::members::remove_membership(&state.db, &state.admin_guard, &service_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "data": null })))
}

pub async fn can_remove_member(
    state: State<AppState>,
    Path((service_id, user_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let removable =
        db::members::can_remove_or_demote(&state.db, &state.admin_guard, &service_id, &user_id)
            .await?;
    Ok(Json(serde_json::json!({ "data": { "removable": removable } })))
}
