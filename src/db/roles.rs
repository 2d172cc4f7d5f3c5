use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::role::{Role, RoleName};

/// Insert the fixed role catalog. Existing rows are left untouched so the
/// ids stay stable across restarts.
pub async fn seed_roles(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for role in RoleName::ALL {
        sqlx::query("INSERT OR IGNORE INTO roles (id, name, description) VALUES (?, ?, ?)")
            .bind(role.id())
            .bind(role.as_str())
            .bind(role.description())
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn list_roles(pool: &SqlitePool) -> Result<Vec<Role>, AppError> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, name, description FROM roles ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Role {
            id: row.0,
            name: row.1,
            description: row.2,
        })
        .collect())
}
