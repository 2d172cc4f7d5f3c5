use sqlx::{Row, SqliteConnection, SqliteExecutor};

use crate::db::is_unique_violation;
use crate::error::AppError;
use crate::models::user::{CreateUser, User};
use crate::snowflake;

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        telephone_number: row.get("telephone_number"),
        disabled: row.get("disabled"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str = "SELECT id, email, telephone_number, disabled, created_at FROM users";

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn get_user<'c>(conn: impl SqliteExecutor<'c>, user_id: &str) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    Ok(row_to_user(row))
}

pub async fn get_user_by_email<'c>(
    conn: impl SqliteExecutor<'c>,
    email: &str,
) -> Result<Option<User>, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE email = ?"))
        .bind(normalize_email(email))
        .fetch_optional(conn)
        .await?;

    Ok(row.map(row_to_user))
}

async fn insert_user(
    conn: &mut SqliteConnection,
    email: &str,
    telephone_number: Option<&str>,
) -> Result<User, AppError> {
    let id = snowflake::generate();
    let email = normalize_email(email);

    sqlx::query("INSERT INTO users (id, email, telephone_number) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&email)
        .bind(telephone_number)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("email [{email}] already exists"))
            } else {
                AppError::from(e)
            }
        })?;

    get_user(&mut *conn, &id).await
}

pub async fn create_user(conn: &mut SqliteConnection, input: &CreateUser) -> Result<User, AppError> {
    let user = insert_user(conn, &input.email, input.telephone_number.as_deref()).await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok(user)
}

/// Resolve the account for an email, creating it when none exists.
/// An existing account keeps its telephone number.
pub async fn find_or_create_by_email(
    conn: &mut SqliteConnection,
    email: &str,
    telephone_number: Option<&str>,
) -> Result<User, AppError> {
    if let Some(user) = get_user_by_email(&mut *conn, email).await? {
        return Ok(user);
    }
    let user = insert_user(conn, email, telephone_number).await?;
    tracing::info!(user_id = %user.id, "user created from invite");
    Ok(user)
}
