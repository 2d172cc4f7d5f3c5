use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::db::{is_unique_violation, services, users};
use crate::error::AppError;
use crate::guard::{AdminGuard, MembershipChange};
use crate::models::member::{Membership, ServiceMember};
use crate::models::role::RoleName;

/// How many times a guarded change is re-evaluated after losing a race.
const GUARDED_WRITE_ATTEMPTS: usize = 3;

fn role_from_row(role_id: i64) -> Result<RoleName, AppError> {
    RoleName::from_id(role_id).ok_or_else(|| AppError::Internal(format!("unknown role id {role_id}")))
}

fn row_to_member(row: sqlx::sqlite::SqliteRow) -> Result<ServiceMember, AppError> {
    Ok(ServiceMember {
        user_id: row.get("user_id"),
        email: row.get("email"),
        service_id: row.get("service_id"),
        role: role_from_row(row.get("role_id"))?.role(),
    })
}

const SELECT_MEMBERS: &str = "SELECT sr.user_id, u.email, sr.service_id, sr.role_id FROM service_roles sr INNER JOIN users u ON sr.user_id = u.id";

fn not_a_member(user_id: &str, service_id: &str) -> AppError {
    AppError::NotFound(format!("user {user_id} is not a member of service {service_id}"))
}

pub async fn find_membership<'c>(
    conn: impl SqliteExecutor<'c>,
    user_id: &str,
    service_id: &str,
) -> Result<Option<Membership>, AppError> {
    let role_id: Option<i64> = sqlx::query_scalar(
        "SELECT role_id FROM service_roles WHERE user_id = ? AND service_id = ?",
    )
    .bind(user_id)
    .bind(service_id)
    .fetch_optional(conn)
    .await?;

    role_id
        .map(|id| -> Result<Membership, AppError> {
            Ok(Membership {
                user_id: user_id.to_string(),
                service_id: service_id.to_string(),
                role: role_from_row(id)?,
            })
        })
        .transpose()
}

pub async fn count_admins<'c>(conn: impl SqliteExecutor<'c>, service_id: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM service_roles WHERE service_id = ? AND role_id = ?",
    )
    .bind(service_id)
    .bind(RoleName::Admin.id())
    .fetch_one(conn)
    .await?;
    Ok(count)
}

pub async fn get_service_member<'c>(
    conn: impl SqliteExecutor<'c>,
    service_id: &str,
    user_id: &str,
) -> Result<ServiceMember, AppError> {
    let row = sqlx::query(&format!("{SELECT_MEMBERS} WHERE sr.service_id = ? AND sr.user_id = ?"))
        .bind(service_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_a_member(user_id, service_id))?;

    row_to_member(row)
}

pub async fn list_service_members(
    pool: &SqlitePool,
    service_id: &str,
) -> Result<Vec<ServiceMember>, AppError> {
    if !services::service_exists(pool, service_id).await? {
        return Err(AppError::NotFound(format!("service {service_id} not found")));
    }

    let rows = sqlx::query(&format!(
        "{SELECT_MEMBERS} WHERE sr.service_id = ? ORDER BY sr.role_id, u.email"
    ))
    .bind(service_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_member).collect()
}

pub async fn list_user_memberships(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Membership>, AppError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT service_id, role_id FROM service_roles WHERE user_id = ? ORDER BY created_at, service_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(service_id, role_id)| -> Result<Membership, AppError> {
            Ok(Membership {
                user_id: user_id.to_string(),
                service_id,
                role: role_from_row(role_id)?,
            })
        })
        .collect()
}

/// Give a user a role on a service they do not belong to yet.
pub async fn insert_membership(
    conn: &mut SqliteConnection,
    user_id: &str,
    service_id: &str,
    role: RoleName,
) -> Result<Membership, AppError> {
    if !services::service_exists(&mut *conn, service_id).await? {
        return Err(AppError::NotFound(format!("service {service_id} not found")));
    }
    users::get_user(&mut *conn, user_id).await?;

    sqlx::query("INSERT INTO service_roles (user_id, service_id, role_id) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(service_id)
        .bind(role.id())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "user {user_id} already has a role on service {service_id}"
                ))
            } else {
                AppError::from(e)
            }
        })?;

    tracing::info!(user_id, service_id, role = %role, "membership created");
    Ok(Membership {
        user_id: user_id.to_string(),
        service_id: service_id.to_string(),
        role,
    })
}

/// Whether removing or demoting this member would keep the service above
/// its admin minimum. Advisory only; the guarded writes re-check.
pub async fn can_remove_or_demote(
    pool: &SqlitePool,
    guard: &AdminGuard,
    service_id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let mut conn = pool.acquire().await?;
    let membership = find_membership(&mut *conn, user_id, service_id)
        .await?
        .ok_or_else(|| not_a_member(user_id, service_id))?;
    let admins = count_admins(&mut *conn, service_id).await?;
    Ok(guard.allows(membership.role, MembershipChange::Remove, admins))
}

/// Issue the change as one conditional statement. When it drops an admin,
/// the statement only matches while more than `min_admins` admins exist, so
/// the check and the write cannot be split by a concurrent change.
async fn guarded_write(
    conn: &mut SqliteConnection,
    guard: &AdminGuard,
    current: &Membership,
    change: MembershipChange,
) -> Result<bool, AppError> {
    let statement = match change {
        MembershipChange::Remove => "DELETE FROM service_roles",
        MembershipChange::ChangeRole(_) => "UPDATE service_roles SET role_id = ?",
    };
    let admin_condition = if change.drops_admin(current.role) {
        " AND (SELECT COUNT(*) FROM service_roles WHERE service_id = ? AND role_id = ?) > ?"
    } else {
        ""
    };
    let sql = format!(
        "{statement} WHERE user_id = ? AND service_id = ? AND role_id = ?{admin_condition}"
    );

    let mut query = sqlx::query(&sql);
    if let MembershipChange::ChangeRole(role) = change {
        query = query.bind(role.id());
    }
    query = query
        .bind(&current.user_id)
        .bind(&current.service_id)
        .bind(current.role.id());
    if change.drops_admin(current.role) {
        query = query
            .bind(&current.service_id)
            .bind(RoleName::Admin.id())
            .bind(guard.min_admins);
    }

    let result = query.execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

async fn apply_guarded_change(
    pool: &SqlitePool,
    guard: &AdminGuard,
    service_id: &str,
    user_id: &str,
    change: MembershipChange,
) -> Result<Membership, AppError> {
    let mut conn = pool.acquire().await?;

    for _ in 0..GUARDED_WRITE_ATTEMPTS {
        let current = find_membership(&mut *conn, user_id, service_id)
            .await?
            .ok_or_else(|| not_a_member(user_id, service_id))?;

        if change == MembershipChange::ChangeRole(current.role) {
            return Ok(current);
        }

        let admins = count_admins(&mut *conn, service_id).await?;
        if let Err(e) = guard.check(current.role, change, admins) {
            tracing::info!(user_id, service_id, admins, ?change, "admin guard rejected change");
            return Err(e);
        }

        if guarded_write(&mut conn, guard, &current, change).await? {
            return Ok(current);
        }
        tracing::debug!(user_id, service_id, ?change, "membership changed concurrently, re-evaluating");
    }

    Err(AppError::Conflict(format!(
        "membership of user {user_id} on service {service_id} is being modified concurrently"
    )))
}

pub async fn update_service_role(
    pool: &SqlitePool,
    guard: &AdminGuard,
    service_id: &str,
    user_id: &str,
    role: RoleName,
) -> Result<ServiceMember, AppError> {
    let previous =
        apply_guarded_change(pool, guard, service_id, user_id, MembershipChange::ChangeRole(role))
            .await?;
    if previous.role != role {
        tracing::info!(user_id, service_id, from = %previous.role, to = %role, "service role updated");
    }
    get_service_member(pool, service_id, user_id).await
}

pub async fn remove_membership(
    pool: &SqlitePool,
    guard: &AdminGuard,
    service_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let previous =
        apply_guarded_change(pool, guard, service_id, user_id, MembershipChange::Remove).await?;
    tracing::info!(user_id, service_id, role = %previous.role, "membership removed");
    Ok(())
}
