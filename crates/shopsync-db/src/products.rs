//! Database operations for the `products` and `variants` tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub merchant_id: i64,
    /// Identifier assigned by the source platform; the import idempotency key.
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub product_type: String,
    /// Derived at creation from the first payload variant's price; never
    /// recomputed afterward.
    pub base_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from the `variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub external_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    /// Compare-at / list price; equals `price` when the import payload
    /// carried no compare-at value.
    pub retail_price: Decimal,
    pub quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input filters for product listing. Filters compose conjunctively.
#[derive(Debug, Clone, Default)]
pub struct ProductListFilters<'a> {
    pub merchant_id: Option<i64>,
    pub active: Option<bool>,
    /// Case-insensitive substring match against `title`.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Escape `ILIKE` pattern metacharacters so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ---------------------------------------------------------------------------
// products operations
// ---------------------------------------------------------------------------

/// Returns one page of products matching the filters, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: ProductListFilters<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let search = filters.search.map(escape_like);
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, merchant_id, external_id, title, description, product_type, \
                base_price, is_active, created_at \
         FROM products \
         WHERE ($1::BIGINT IS NULL OR merchant_id = $1) \
           AND ($2::BOOLEAN IS NULL OR is_active = $2) \
           AND ($3::TEXT IS NULL OR title ILIKE '%' || $3 || '%') \
         ORDER BY id \
         LIMIT $4 OFFSET $5",
    )
    .bind(filters.merchant_id)
    .bind(filters.active)
    .bind(search)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the total number of products matching the filters, ignoring
/// pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products(
    pool: &PgPool,
    filters: &ProductListFilters<'_>,
) -> Result<i64, DbError> {
    let search = filters.search.map(escape_like);
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM products \
         WHERE ($1::BIGINT IS NULL OR merchant_id = $1) \
           AND ($2::BOOLEAN IS NULL OR is_active = $2) \
           AND ($3::TEXT IS NULL OR title ILIKE '%' || $3 || '%')",
    )
    .bind(filters.merchant_id)
    .bind(filters.active)
    .bind(search)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Returns a single product by internal id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, merchant_id, external_id, title, description, product_type, \
                base_price, is_active, created_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Sets the active flag on all products whose id is in `ids`, in one
/// statement. Returns the number of rows updated; ids with no matching row
/// are silently skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_products_active(
    pool: &PgPool,
    ids: &[i64],
    active: bool,
) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let updated = sqlx::query(
        "UPDATE products \
         SET is_active = $2 \
         WHERE id = ANY($1::bigint[])",
    )
    .bind(ids)
    .bind(active)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated)
}

/// Soft-deletes a product by setting `is_active = FALSE`, only when it is
/// currently active. Returns the number of rows changed (0 when the product
/// was already inactive or does not exist).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_product(pool: &PgPool, id: i64) -> Result<u64, DbError> {
    let updated = sqlx::query(
        "UPDATE products \
         SET is_active = FALSE \
         WHERE id = $1 AND is_active = TRUE",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated)
}

// ---------------------------------------------------------------------------
// variants operations
// ---------------------------------------------------------------------------

/// Returns all variants of a product, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variants(pool: &PgPool, product_id: i64) -> Result<Vec<VariantRow>, DbError> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, product_id, external_id, title, sku, price, retail_price, \
                quantity, is_active, created_at \
         FROM variants \
         WHERE product_id = $1 \
         ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
