use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Full product detail shape, with nested variants.
#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductDetail {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub product_type: String,
    pub base_price: Decimal,
    pub active: bool,
    pub variants: Vec<VariantBody>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct VariantBody {
    pub external_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub retail_price: Decimal,
    pub quantity: i32,
    pub active: bool,
}

pub(in crate::api) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;

    let product = shopsync_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))?;

    let variants = shopsync_db::list_variants(&state.pool, product.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .into_iter()
        .map(|row| VariantBody {
            external_id: row.external_id,
            title: row.title,
            sku: row.sku,
            price: row.price,
            retail_price: row.retail_price,
            quantity: row.quantity,
            active: row.is_active,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: ProductDetail {
            id: product.id,
            external_id: product.external_id,
            title: product.title,
            description: product.description,
            product_type: product.product_type,
            base_price: product.base_price,
            active: product.is_active,
            variants,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
