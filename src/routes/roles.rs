use axum::extract::State;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_roles(state: State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let roles = db::roles::list_roles(&state.db).await?;
    Ok(Json(serde_json::json!({ "data": roles })))
}
