use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::super::{
    map_db_error, normalize_page, normalize_page_size, page_offset, ApiError, ApiResponse,
    AppState, ResponseMeta,
};
use super::parse_active_token;

/// Compact product shape for list views.
#[derive(Debug, Serialize)]
pub(in crate::api) struct ProductListItem {
    pub id: i64,
    pub title: String,
    pub product_type: String,
    pub base_price: Decimal,
    pub active: bool,
    /// Image hosting is not wired up yet; always `null`.
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct PaginatedProducts {
    pub items: Vec<ProductListItem>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ProductQuery {
    pub merchant_id: Option<i64>,
    /// Literal `"true"`/`"false"` filter; any other token is ignored.
    pub active: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub(in crate::api) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<PaginatedProducts>>, ApiError> {
    let page = normalize_page(query.page);
    let page_size = normalize_page_size(query.page_size);

    let filters = shopsync_db::ProductListFilters {
        merchant_id: query.merchant_id,
        active: parse_active_token(query.active.as_deref()),
        search: query.search.as_deref(),
        limit: page_size,
        offset: page_offset(page, page_size),
    };

    let total = shopsync_db::count_products(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = shopsync_db::list_products(&state.pool, filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let items = rows
        .into_iter()
        .map(|row| ProductListItem {
            id: row.id,
            title: row.title,
            product_type: row.product_type,
            base_price: row.base_price,
            active: row.is_active,
            image_url: None,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: PaginatedProducts {
            items,
            page,
            page_size,
            total,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
