//! Transactional import/reconciliation of an external product payload.
//!
//! The whole operation runs inside one transaction: merchant lookup,
//! get-or-create of the product keyed by (merchant_id, external_id), and the
//! bulk variant insert. Any early return rolls the transaction back, so
//! partial writes never persist.

use rust_decimal::Decimal;
use sqlx::PgPool;

use shopsync_core::ProductPayload;

use crate::{is_unique_violation, DbError, ProductRow};

/// Imports a product payload for the merchant owning `store_url`.
///
/// Returns the product row and whether it was created by this call.
///
/// Re-importing an already-known (merchant, external_id) pair returns the
/// stored row with `created = false` and ignores the payload's variants
/// entirely — the import is idempotent-by-skip, not a merge. Variants are
/// only ever written when the product row is first created.
///
/// Two concurrent imports of the same pair resolve through the unique
/// constraint on `products`: one commits, the other observes the violation
/// and fails with [`DbError::DuplicateProduct`].
///
/// # Errors
///
/// - [`DbError::MerchantNotFound`] when no merchant has `store_url`.
/// - [`DbError::DuplicateProduct`] when a concurrent import won the
///   creation race.
/// - [`DbError::Sqlx`] for any other persistence failure.
pub async fn import_product(
    pool: &PgPool,
    store_url: &str,
    payload: &ProductPayload,
) -> Result<(ProductRow, bool), DbError> {
    let mut tx = pool.begin().await?;

    let merchant_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM merchants WHERE store_url = $1",
    )
    .bind(store_url)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::MerchantNotFound)?;

    // Get-or-create: an existing row short-circuits before any variant work.
    let existing = sqlx::query_as::<_, ProductRow>(
        "SELECT id, merchant_id, external_id, title, description, product_type, \
                base_price, is_active, created_at \
         FROM products \
         WHERE merchant_id = $1 AND external_id = $2",
    )
    .bind(merchant_id)
    .bind(&payload.external_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(product) = existing {
        tx.commit().await?;
        return Ok((product, false));
    }

    let product = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
             (merchant_id, external_id, title, description, product_type, base_price) \
         VALUES ($1, $2, $3, $4, $5, $6::numeric(10,2)) \
         RETURNING id, merchant_id, external_id, title, description, product_type, \
                   base_price, is_active, created_at",
    )
    .bind(merchant_id)
    .bind(&payload.external_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.product_type)
    .bind(payload.base_price())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::DuplicateProduct
        } else {
            DbError::Sqlx(e)
        }
    })?;

    insert_variants(&mut tx, product.id, payload).await?;

    tx.commit().await?;
    Ok((product, true))
}

/// Inserts all payload variants for a freshly created product in one
/// `INSERT … SELECT FROM UNNEST(…)` round-trip.
async fn insert_variants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: i64,
    payload: &ProductPayload,
) -> Result<(), DbError> {
    if payload.variants.is_empty() {
        return Ok(());
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut external_ids: Vec<String> = Vec::with_capacity(payload.variants.len());
    let mut titles: Vec<String> = Vec::with_capacity(payload.variants.len());
    let mut skus: Vec<Option<String>> = Vec::with_capacity(payload.variants.len());
    let mut prices: Vec<Decimal> = Vec::with_capacity(payload.variants.len());
    let mut retail_prices: Vec<Decimal> = Vec::with_capacity(payload.variants.len());
    let mut quantities: Vec<i32> = Vec::with_capacity(payload.variants.len());

    for variant in &payload.variants {
        external_ids.push(variant.external_id.clone());
        titles.push(variant.title.clone());
        skus.push(variant.sku.clone());
        prices.push(variant.price);
        retail_prices.push(variant.retail_price());
        quantities.push(variant.inventory_quantity);
    }

    sqlx::query(
        "INSERT INTO variants \
             (product_id, external_id, title, sku, price, retail_price, quantity) \
         SELECT $1, * FROM UNNEST(\
              $2::text[], $3::text[], $4::text[], \
              $5::numeric(10,2)[], $6::numeric(10,2)[], $7::int[])",
    )
    .bind(product_id)
    .bind(&external_ids)
    .bind(&titles)
    .bind(&skus)
    .bind(&prices)
    .bind(&retail_prices)
    .bind(&quantities)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
