use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::invite::InviteState;
use crate::validation::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    Database(sqlx::Error),
    Internal(String),
    Validation(ValidationErrors),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    AdminLimitReached { required: i64 },
    InviteNotUsable(InviteState),
    InvalidOtp { remaining: u32 },
    AttemptsExhausted,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AdminLimitReached { .. } => StatusCode::PRECONDITION_FAILED,
            AppError::InviteNotUsable(_) => StatusCode::GONE,
            AppError::InvalidOtp { .. } => StatusCode::UNAUTHORIZED,
            AppError::AttemptsExhausted => StatusCode::GONE,
        }
    }

    /// Human-readable messages surfaced under the `errors` key.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                vec!["internal database error".to_string()]
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                vec!["internal server error".to_string()]
            }
            AppError::Validation(errors) => errors.messages(),
            AppError::BadRequest(msg) => vec![msg.clone()],
            AppError::NotFound(msg) => vec![msg.clone()],
            AppError::Conflict(msg) => vec![msg.clone()],
            AppError::AdminLimitReached { required } => vec![format!(
                "Service admin limit reached. At least {required} admin(s) required"
            )],
            // Expired and disabled invites look the same from the outside.
            AppError::InviteNotUsable(_) => vec!["Invite is no longer usable".to_string()],
            AppError::InvalidOtp { remaining } => vec![format!(
                "Invalid OTP code, {remaining} attempt(s) remaining"
            )],
            AppError::AttemptsExhausted => {
                vec!["Invite disabled after too many invalid OTP attempts".to_string()]
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::InviteNotUsable(state) = &self {
            tracing::debug!(?state, "rejected unusable invite");
        }
        let body = json!({ "errors": self.messages() });
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound("resource not found".to_string()),
            _ => AppError::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {rejection}");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_admin_limit_message_and_status() {
        let err = AppError::AdminLimitReached { required: 1 };
        assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(
            err.messages(),
            vec!["Service admin limit reached. At least 1 admin(s) required"]
        );
    }

    #[test]
    fn test_expired_and_disabled_invites_share_a_message() {
        let expired = AppError::InviteNotUsable(InviteState::Expired);
        let disabled = AppError::InviteNotUsable(InviteState::Disabled);
        assert_eq!(expired.status(), disabled.status());
        assert_eq!(expired.messages(), disabled.messages());
    }

    #[test]
    fn test_validation_errors_keep_order() {
        let err = AppError::from(ValidationErrors::from(vec![
            ValidationError::MissingField("op".to_string()),
            ValidationError::MissingField("path".to_string()),
        ]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.messages(),
            vec!["Field [op] is required", "Field [path] is required"]
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
