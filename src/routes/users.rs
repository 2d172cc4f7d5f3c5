use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::member::{AssignServiceRole, UpdateServiceRole};
use crate::models::role::RoleName;
use crate::models::user::CreateUser;
use crate::routes::payload::Payload;
use crate::state::AppState;
use crate::validation::require_fields;

pub(crate) fn parse_role(role_name: &str) -> Result<RoleName, AppError> {
    role_name.parse().map_err(AppError::BadRequest)
}

pub async fn create_user(
    state: State<AppState>,
    Payload(input): Payload<CreateUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(&[("email", &input.email)])?;
    let mut conn = state.db.acquire().await?;
    let user = db::users::create_user(&mut conn, &input).await?;
    Ok(Json(serde_json::json!({ "data": user })))
}

pub async fn get_user(
    state: State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = db::users::get_user(&state.db, &user_id).await?;
    let service_roles = db::members::list_user_memberships(&state.db, &user_id).await?;
    Ok(Json(serde_json::json!({
        "data": { "user": user, "service_roles": service_roles }
    })))
}

pub async fn assign_service_role(
    state: State<AppState>,
    Path(user_id): Path<String>,
    Payload(input): Payload<AssignServiceRole>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(&[
        ("service_id", &input.service_id),
        ("role_name", &input.role_name),
    ])?;
    let role = parse_role(&input.role_name)?;
    let mut conn = state.db.acquire().await?;
    let membership =
        db::members::insert_membership(&mut conn, &user_id, &input.service_id, role).await?;
    Ok(Json(serde_json::json!({ "data": membership })))
}

pub async fn update_service_role(
    state: State<AppState>,
    Path((user_id, service_id)): Path<(String, String)>,
    Payload(input): Payload<UpdateServiceRole>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(&[("role_name", &input.role_name)])?;
    let role = parse_role(&input.role_name)?;
    let member = db::members::update_service_role(
        &state.db,
        &state.admin_guard,
        &service_id,
        &user_id,
        role,
    )
    .await?;
    Ok(Json(serde_json::json!({ "data": member })))
}
