//! Database operations for the `merchants` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{is_unique_violation, DbError};

/// A row from the `merchants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MerchantRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// External-system linkage key; unique and immutable after creation.
    pub store_url: String,
    /// Lifecycle status: `"pending"` or `"active"`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Inserts a merchant and returns the created row.
///
/// # Errors
///
/// Returns [`DbError::DuplicateMerchant`] when the store URL is already
/// registered, or [`DbError::Sqlx`] for any other failure.
pub async fn insert_merchant(
    pool: &PgPool,
    name: &str,
    email: &str,
    store_url: &str,
    status: &str,
) -> Result<MerchantRow, DbError> {
    let row = sqlx::query_as::<_, MerchantRow>(
        "INSERT INTO merchants (name, email, store_url, status) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, name, email, store_url, status, created_at",
    )
    .bind(name)
    .bind(email)
    .bind(store_url)
    .bind(status)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::DuplicateMerchant
        } else {
            DbError::Sqlx(e)
        }
    })?;

    Ok(row)
}

/// Returns the merchant with the exact `store_url`, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_merchant_by_store_url(
    pool: &PgPool,
    store_url: &str,
) -> Result<Option<MerchantRow>, DbError> {
    let row = sqlx::query_as::<_, MerchantRow>(
        "SELECT id, name, email, store_url, status, created_at \
         FROM merchants \
         WHERE store_url = $1",
    )
    .bind(store_url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
