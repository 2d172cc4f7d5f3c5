use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::db::{format_timestamp, members, parse_timestamp, services, users};
use crate::error::AppError;
use crate::models::invite::{
    CreateSelfSignupInvite, CreateServiceInvite, Invite, InviteDelta, InvitePolicy, InviteTarget,
    OtpTransition,
};
use crate::models::member::Membership;
use crate::models::role::RoleName;
use crate::models::user::User;
use crate::otp;
use crate::snowflake;
use crate::validation::{ValidationError, ValidationErrors};

const CODE_LENGTH: usize = 32;
/// Re-reads allowed when another request changes the invite between our
/// read and our compare-and-swap.
const CAS_ATTEMPTS: usize = 3;

/// A freshly created invite together with its code. The code is only ever
/// available here; the store keeps its hash.
#[derive(Debug)]
pub struct CreatedInvite {
    pub invite: Invite,
    pub code: String,
}

/// Result of consuming an invite.
#[derive(Debug)]
pub struct Completion {
    pub user: User,
    pub membership: Option<Membership>,
}

pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

fn unix_secs(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp()).unwrap_or(0)
}

const SELECT_INVITES: &str = "SELECT id, email, telephone_number, disabled, login_counter, created_at, otp_key, service_id, role_id, sender_id FROM invites";

fn row_to_invite(row: sqlx::sqlite::SqliteRow) -> Result<Invite, AppError> {
    let service_id: Option<String> = row.get("service_id");
    let role_id: Option<i64> = row.get("role_id");
    let target = match (service_id, role_id) {
        (Some(service_id), Some(role_id)) => Some(InviteTarget {
            service_id,
            role: RoleName::from_id(role_id)
                .ok_or_else(|| AppError::Internal(format!("unknown role id {role_id}")))?,
        }),
        _ => None,
    };
    let login_counter: i64 = row.get("login_counter");

    Ok(Invite {
        id: row.get("id"),
        email: row.get("email"),
        telephone_number: row.get("telephone_number"),
        disabled: row.get("disabled"),
        login_counter: u32::try_from(login_counter)
            .map_err(|_| AppError::Internal(format!("invalid login counter {login_counter}")))?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        otp_key: row.get("otp_key"),
        target,
        sender_id: row.get("sender_id"),
    })
}

pub async fn get_invite_by_code<'c>(
    conn: impl SqliteExecutor<'c>,
    code: &str,
) -> Result<Invite, AppError> {
    let row = sqlx::query(&format!("{SELECT_INVITES} WHERE code_hash = ?"))
        .bind(hash_code(code))
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("invite not found".to_string()))?;

    row_to_invite(row)
}

async fn get_invite<'c>(conn: impl SqliteExecutor<'c>, invite_id: &str) -> Result<Invite, AppError> {
    let row = sqlx::query(&format!("{SELECT_INVITES} WHERE id = ?"))
        .bind(invite_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("invite not found".to_string()))?;

    row_to_invite(row)
}

async fn insert_invite(
    conn: &mut SqliteConnection,
    email: &str,
    telephone_number: Option<&str>,
    target: Option<&InviteTarget>,
    sender_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CreatedInvite, AppError> {
    let id = snowflake::generate();
    let code = generate_code();
    let otp_key = otp::generate_otp_key()?;

    sqlx::query(
        "INSERT INTO invites (id, code_hash, otp_key, email, telephone_number, service_id, role_id, sender_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(hash_code(&code))
    .bind(&otp_key)
    .bind(users::normalize_email(email))
    .bind(telephone_number)
    .bind(target.map(|t| t.service_id.as_str()))
    .bind(target.map(|t| t.role.id()))
    .bind(sender_id)
    .bind(format_timestamp(now))
    .execute(&mut *conn)
    .await?;

    let invite = get_invite(&mut *conn, &id).await?;
    Ok(CreatedInvite { invite, code })
}

/// Invite an email address onto a service with a role. Any earlier invite
/// for the same email and service that is still open is disabled.
pub async fn create_service_invite(
    pool: &SqlitePool,
    input: &CreateServiceInvite,
    role: RoleName,
    now: DateTime<Utc>,
) -> Result<CreatedInvite, AppError> {
    let mut tx = pool.begin().await?;

    if !services::service_exists(&mut *tx, &input.service_id).await? {
        return Err(AppError::NotFound(format!(
            "service {} not found",
            input.service_id
        )));
    }
    if let Some(sender_id) = input.sender_id.as_deref() {
        users::get_user(&mut *tx, sender_id).await?;
    }
    if let Some(user) = users::get_user_by_email(&mut *tx, &input.email).await? {
        if members::find_membership(&mut *tx, &user.id, &input.service_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "user [{}] is already a member of service {}",
                user.email, input.service_id
            )));
        }
    }

    let replaced = sqlx::query(
        "UPDATE invites SET disabled = 1 WHERE email = ? AND service_id = ? AND disabled = 0",
    )
    .bind(users::normalize_email(&input.email))
    .bind(&input.service_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let target = InviteTarget {
        service_id: input.service_id.clone(),
        role,
    };
    let created = insert_invite(
        &mut tx,
        &input.email,
        None,
        Some(&target),
        input.sender_id.as_deref(),
        now,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        invite_id = %created.invite.id,
        service_id = %input.service_id,
        role = %role,
        replaced,
        "service invite created"
    );
    Ok(created)
}

/// Invite a new person to sign up. Fails when the email already has an
/// account.
pub async fn create_self_signup_invite(
    pool: &SqlitePool,
    input: &CreateSelfSignupInvite,
    now: DateTime<Utc>,
) -> Result<CreatedInvite, AppError> {
    let mut tx = pool.begin().await?;

    if users::get_user_by_email(&mut *tx, &input.email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "email [{}] already exists",
            users::normalize_email(&input.email)
        )));
    }

    sqlx::query("UPDATE invites SET disabled = 1 WHERE email = ? AND service_id IS NULL AND disabled = 0")
        .bind(users::normalize_email(&input.email))
        .execute(&mut *tx)
        .await?;

    let created = insert_invite(
        &mut tx,
        &input.email,
        input.telephone_number.as_deref(),
        None,
        None,
        now,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(invite_id = %created.invite.id, "self-signup invite created");
    Ok(created)
}

/// Persist a transition, but only if the invite still looks the way it did
/// when the transition was computed.
pub async fn save_delta<'c>(
    conn: impl SqliteExecutor<'c>,
    invite: &Invite,
    delta: InviteDelta,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE invites SET login_counter = ?, disabled = ? WHERE id = ? AND disabled = 0 AND login_counter = ?",
    )
    .bind(i64::from(delta.login_counter))
    .bind(delta.disabled)
    .bind(&invite.id)
    .bind(i64::from(invite.login_counter))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Consume the invite and place the user. Returns `None` when the invite
/// changed since it was read; nothing is written in that case.
pub async fn complete_invite(
    pool: &SqlitePool,
    invite: &Invite,
    delta: InviteDelta,
) -> Result<Option<Completion>, AppError> {
    let mut tx = pool.begin().await?;

    if !save_delta(&mut *tx, invite, delta).await? {
        return Ok(None);
    }

    let user = users::find_or_create_by_email(
        &mut tx,
        &invite.email,
        invite.telephone_number.as_deref(),
    )
    .await?;

    let membership = match &invite.target {
        Some(target) => Some(
            members::insert_membership(&mut tx, &user.id, &target.service_id, target.role).await?,
        ),
        None => None,
    };
    tx.commit().await?;

    tracing::info!(invite_id = %invite.id, user_id = %user.id, "invite completed");
    Ok(Some(Completion { user, membership }))
}

pub async fn update_telephone_number<'c>(
    conn: impl SqliteExecutor<'c>,
    invite_id: &str,
    telephone_number: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE invites SET telephone_number = ? WHERE id = ?")
        .bind(telephone_number.trim())
        .bind(invite_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// The OTP to send for an invite, and the number to send it to.
#[derive(Debug)]
pub struct OtpDispatch {
    pub invite: Invite,
    pub telephone_number: String,
    pub otp_code: String,
}

/// Produce the current OTP for a usable invite, recording a new telephone
/// number when one is given.
pub async fn generate_otp(
    pool: &SqlitePool,
    policy: &InvitePolicy,
    code: &str,
    telephone_number: Option<&str>,
    now: DateTime<Utc>,
) -> Result<OtpDispatch, AppError> {
    let mut invite = get_invite_by_code(pool, code).await?;
    let state = invite.state(now, policy);
    if !invite.is_usable(now, policy) {
        return Err(AppError::InviteNotUsable(state));
    }

    if let Some(number) = telephone_number.map(str::trim).filter(|n| !n.is_empty()) {
        update_telephone_number(pool, &invite.id, number).await?;
        invite.telephone_number = Some(number.to_string());
    }

    let Some(telephone_number) = invite.telephone_number.clone() else {
        return Err(ValidationErrors::from(ValidationError::MissingField("telephone_number".to_string())).into());
    };
    let otp_code = otp::code_at(&invite.otp_key, unix_secs(now))?;

    tracing::debug!(invite_id = %invite.id, "otp generated");
    Ok(OtpDispatch {
        invite,
        telephone_number,
        otp_code,
    })
}

/// Check an OTP against an invite. A match consumes the invite; a miss
/// counts against it and disables it once the attempts run out.
pub async fn validate_otp(
    pool: &SqlitePool,
    policy: &InvitePolicy,
    code: &str,
    otp_code: &str,
    now: DateTime<Utc>,
) -> Result<Completion, AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let invite = get_invite_by_code(pool, code).await?;
        let matches = otp::verify(&invite.otp_key, otp_code, unix_secs(now))?;
        let transition = invite
            .attempt_otp(matches, now, policy)
            .map_err(AppError::InviteNotUsable)?;

        match transition {
            OtpTransition::Complete(delta) => {
                if let Some(completion) = complete_invite(pool, &invite, delta).await? {
                    return Ok(completion);
                }
            }
            OtpTransition::Retry { remaining, delta } => {
                if save_delta(pool, &invite, delta).await? {
                    tracing::info!(invite_id = %invite.id, remaining, "invalid otp");
                    return Err(AppError::InvalidOtp { remaining });
                }
            }
            OtpTransition::Exhausted(delta) => {
                if save_delta(pool, &invite, delta).await? {
                    tracing::warn!(invite_id = %invite.id, "invite disabled after too many otp attempts");
                    return Err(AppError::AttemptsExhausted);
                }
            }
        }
        tracing::debug!(invite_id = %invite.id, "invite changed concurrently, re-evaluating");
    }

    Err(AppError::Conflict(
        "invite is being used by another request".to_string(),
    ))
}

/// Complete a service invite for someone who already has an account. New
/// accounts have to go through OTP validation.
pub async fn complete_for_existing_user(
    pool: &SqlitePool,
    policy: &InvitePolicy,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Completion, AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let invite = get_invite_by_code(pool, code).await?;
        let delta = invite
            .complete(now, policy)
            .map_err(AppError::InviteNotUsable)?;

        if invite.target.is_none()
            || users::get_user_by_email(pool, &invite.email).await?.is_none()
        {
            return Err(AppError::BadRequest(
                "invite requires otp verification".to_string(),
            ));
        }

        if let Some(completion) = complete_invite(pool, &invite, delta).await? {
            return Ok(completion);
        }
    }

    Err(AppError::Conflict(
        "invite is being used by another request".to_string(),
    ))
}
