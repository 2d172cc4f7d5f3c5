use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::db;
use crate::db::invites::{Completion, CreatedInvite};
use crate::error::AppError;
use crate::models::invite::{CreateSelfSignupInvite, CreateServiceInvite, GenerateOtp, ValidateOtp};
use crate::notify::Notification;
use crate::routes::payload::Payload;
use crate::routes::users::parse_role;
use crate::state::AppState;
use crate::validation::require_fields;

fn send_invite(state: &AppState, created: &CreatedInvite) -> serde_json::Value {
    let invite_link = state.invite_link(&created.code);
    state.notifier.notify(Notification::InviteEmail {
        email: created.invite.email.clone(),
        invite_link: invite_link.clone(),
        service_id: created.invite.target.as_ref().map(|t| t.service_id.clone()),
    });
    serde_json::json!({ "data": created.invite.view(Some(invite_link)) })
}

fn completion_body(completion: Completion) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "user": completion.user,
            "service_role": completion.membership,
        }
    })
}

pub async fn create_service_invite(
    state: State<AppState>,
    Payload(input): Payload<CreateServiceInvite>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_fields(&[
        ("email", &input.email),
        ("role_name", &input.role_name),
        ("service_id", &input.service_id),
    ])?;
    let role = parse_role(&input.role_name)?;
    let created = db::invites::create_service_invite(&state.db, &input, role, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(send_invite(&state, &created))))
}

pub async fn create_self_signup_invite(
    state: State<AppState>,
    Payload(input): Payload<CreateSelfSignupInvite>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_fields(&[("email", &input.email)])?;
    let created = db::invites::create_self_signup_invite(&state.db, &input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(send_invite(&state, &created))))
}

pub async fn get_invite(
    state: State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let invite = db::invites::get_invite_by_code(&state.db, &code).await?;
    let now = Utc::now();
    if !invite.is_usable(now, &state.invite_policy) {
        return Err(AppError::InviteNotUsable(invite.state(now, &state.invite_policy)));
    }
    Ok(Json(serde_json::json!({ "data": invite.view(None) })))
}

pub async fn generate_otp(
    state: State<AppState>,
    Payload(input): Payload<GenerateOtp>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(&[("code", &input.code)])?;
    let dispatch = db::invites::generate_otp(
        &state.db,
        &state.invite_policy,
        &input.code,
        input.telephone_number.as_deref(),
        Utc::now(),
    )
    .await?;
    state.notifier.notify(Notification::OtpSms {
        telephone_number: dispatch.telephone_number,
        code: dispatch.otp_code,
    });
    Ok(Json(serde_json::json!({ "data": dispatch.invite.view(None) })))
}

pub async fn validate_otp(
    state: State<AppState>,
    Payload(input): Payload<ValidateOtp>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_fields(&[("code", &input.code), ("otp", &input.otp)])?;
    let completion = db::invites::validate_otp(
        &state.db,
        &state.invite_policy,
        &input.code,
        &input.otp,
        Utc::now(),
    )
    .await?;
    Ok(Json(completion_body(completion)))
}

pub async fn complete_invite(
    state: State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let completion =
        db::invites::complete_for_existing_user(&state.db, &state.invite_policy, &code, Utc::now())
            .await?;
    Ok(Json(completion_body(completion)))
}
