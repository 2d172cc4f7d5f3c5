use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::db::is_unique_violation;
use crate::error::AppError;
use crate::models::service::{
    CreateService, MerchantDetails, Service, SupportedLanguage, DEFAULT_SERVICE_NAME,
};
use crate::snowflake;
use crate::validation::patch::ServicePatch;

const SELECT_SERVICES: &str = "SELECT id, external_id, custom_branding, merchant_name, merchant_address_line1, merchant_address_line2, merchant_address_city, merchant_address_postcode, merchant_address_country, created_at FROM services";

fn parse_branding(raw: Option<String>) -> Result<Option<Map<String, Value>>, AppError> {
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| AppError::Internal(format!("stored custom branding is not an object: {e}")))
    })
    .transpose()
}

fn encode_branding(branding: &Map<String, Value>) -> Result<String, AppError> {
    serde_json::to_string(branding).map_err(|e| AppError::Internal(e.to_string()))
}

fn row_to_service(row: sqlx::sqlite::SqliteRow) -> Result<Service, AppError> {
    let merchant_name: Option<String> = row.get("merchant_name");
    let merchant_details = merchant_name.map(|name| MerchantDetails {
        name,
        address_line1: row.get::<Option<String>, _>("merchant_address_line1").unwrap_or_default(),
        address_line2: row.get("merchant_address_line2"),
        address_city: row.get::<Option<String>, _>("merchant_address_city").unwrap_or_default(),
        address_postcode: row
            .get::<Option<String>, _>("merchant_address_postcode")
            .unwrap_or_default(),
        address_country: row
            .get::<Option<String>, _>("merchant_address_country")
            .unwrap_or_default(),
    });

    Ok(Service {
        id: row.get("id"),
        external_id: row.get("external_id"),
        name: String::new(),
        service_names: BTreeMap::new(),
        gateway_account_ids: Vec::new(),
        custom_branding: parse_branding(row.get("custom_branding"))?,
        merchant_details,
        created_at: row.get("created_at"),
    })
}

pub async fn service_exists<'c>(
    conn: impl SqliteExecutor<'c>,
    service_id: &str,
) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM services WHERE id = ?")
        .bind(service_id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

pub async fn get_service(conn: &mut SqliteConnection, service_id: &str) -> Result<Service, AppError> {
    let row = sqlx::query(&format!("{SELECT_SERVICES} WHERE id = ?"))
        .bind(service_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("service {service_id} not found")))?;
    let mut service = row_to_service(row)?;

    let names = sqlx::query_as::<_, (String, String)>(
        "SELECT language, name FROM service_names WHERE service_id = ?",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await?;
    for (code, name) in names {
        match SupportedLanguage::from_code(&code) {
            Some(language) => service.add_or_update_service_name(language, &name),
            None => tracing::warn!(service_id, language = %code, "ignoring unsupported service name language"),
        }
    }

    service.gateway_account_ids = sqlx::query_scalar(
        "SELECT gateway_account_id FROM service_gateway_accounts WHERE service_id = ? ORDER BY CAST(gateway_account_id AS INTEGER)",
    )
    .bind(service_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(service)
}

pub async fn find_by_gateway_account_id(
    pool: &SqlitePool,
    gateway_account_id: &str,
) -> Result<Option<Service>, AppError> {
    let mut conn = pool.acquire().await?;
    let service_id: Option<String> = sqlx::query_scalar(
        "SELECT service_id FROM service_gateway_accounts WHERE gateway_account_id = ?",
    )
    .bind(gateway_account_id)
    .fetch_optional(&mut *conn)
    .await?;

    match service_id {
        Some(id) => get_service(&mut conn, &id).await.map(Some),
        None => Ok(None),
    }
}

async fn upsert_service_name(
    conn: &mut SqliteConnection,
    service_id: &str,
    language: SupportedLanguage,
    name: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO service_names (service_id, language, name) VALUES (?, ?, ?) ON CONFLICT(service_id, language) DO UPDATE SET name = excluded.name",
    )
    .bind(service_id)
    .bind(language.code())
    .bind(name)
    .execute(conn)
    .await?;
    Ok(())
}

async fn add_gateway_account_ids(
    conn: &mut SqliteConnection,
    service_id: &str,
    ids: &[String],
) -> Result<(), AppError> {
    for id in ids {
        let owner: Option<String> = sqlx::query_scalar(
            "SELECT service_id FROM service_gateway_accounts WHERE gateway_account_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match owner {
            Some(owner) if owner == service_id => continue,
            Some(_) => {
                return Err(AppError::Conflict(format!(
                    "gateway account id [{id}] is already assigned to a service"
                )))
            }
            None => {}
        }

        sqlx::query(
            "INSERT INTO service_gateway_accounts (gateway_account_id, service_id) VALUES (?, ?)",
        )
        .bind(id)
        .bind(service_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "gateway account id [{id}] is already assigned to a service"
                ))
            } else {
                AppError::from(e)
            }
        })?;
    }
    Ok(())
}

pub async fn create_service(pool: &SqlitePool, input: &CreateService) -> Result<Service, AppError> {
    let id = snowflake::generate();
    let external_id = uuid::Uuid::new_v4().simple().to_string();
    let name = input
        .service_names
        .get(&SupportedLanguage::English)
        .map(String::as_str)
        .or(input.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_SERVICE_NAME);
    let branding = input.custom_branding.as_ref().map(encode_branding).transpose()?;

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO services (id, external_id, custom_branding) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&external_id)
        .bind(branding)
        .execute(&mut *tx)
        .await?;
    upsert_service_name(&mut tx, &id, SupportedLanguage::English, name).await?;
    for (language, translated) in &input.service_names {
        if *language != SupportedLanguage::English {
            upsert_service_name(&mut tx, &id, *language, translated).await?;
        }
    }
    add_gateway_account_ids(&mut tx, &id, &input.gateway_account_ids).await?;
    let service = get_service(&mut tx, &id).await?;
    tx.commit().await?;

    tracing::info!(service_id = %id, external_id = %external_id, "service created");
    Ok(service)
}

/// Apply a validated batch of attribute updates. Either every patch lands
/// or none does.
pub async fn apply_patches(
    pool: &SqlitePool,
    service_id: &str,
    patches: &[ServicePatch],
) -> Result<Service, AppError> {
    let mut tx = pool.begin().await?;
    if !service_exists(&mut *tx, service_id).await? {
        return Err(AppError::NotFound(format!("service {service_id} not found")));
    }

    for patch in patches {
        match patch {
            ServicePatch::ReplaceName(name) => {
                upsert_service_name(&mut tx, service_id, SupportedLanguage::English, name).await?
            }
            ServicePatch::AddGatewayAccountIds(ids) => {
                add_gateway_account_ids(&mut tx, service_id, ids).await?
            }
            ServicePatch::ReplaceCustomBranding(branding) => {
                // An empty object clears the branding.
                let encoded = if branding.is_empty() {
                    None
                } else {
                    Some(encode_branding(branding)?)
                };
                sqlx::query("UPDATE services SET custom_branding = ? WHERE id = ?")
                    .bind(encoded)
                    .bind(service_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    let service = get_service(&mut tx, service_id).await?;
    tx.commit().await?;

    tracing::info!(service_id, patches = patches.len(), "service updated");
    Ok(service)
}

pub async fn update_merchant_details(
    pool: &SqlitePool,
    service_id: &str,
    details: &MerchantDetails,
) -> Result<Service, AppError> {
    let mut conn = pool.acquire().await?;
    let result = sqlx::query(
        "UPDATE services SET merchant_name = ?, merchant_address_line1 = ?, merchant_address_line2 = ?, merchant_address_city = ?, merchant_address_postcode = ?, merchant_address_country = ? WHERE id = ?",
    )
    .bind(&details.name)
    .bind(&details.address_line1)
    .bind(&details.address_line2)
    .bind(&details.address_city)
    .bind(&details.address_postcode)
    .bind(&details.address_country)
    .bind(service_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("service {service_id} not found")));
    }
    get_service(&mut conn, service_id).await
}

/// Memberships, names, gateway accounts and invites go with the service.
pub async fn delete_service(pool: &SqlitePool, service_id: &str) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(service_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("service {service_id} not found")));
    }
    tracing::info!(service_id, "service deleted");
    Ok(())
}
