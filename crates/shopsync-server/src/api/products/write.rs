//! Product activation handlers: bulk activate/deactivate and soft delete.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct BulkActivateOutcome {
    pub updated_count: u64,
    pub active_status: bool,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct RemoveOutcome {
    pub message: &'static str,
}

/// POST /api/v1/products/bulk-activate
///
/// Body: `{ "product_ids": [1, 2, 3], "active": false }`. The body is
/// validated before any storage access: `product_ids` must be a list of
/// integers and `active` a boolean. Missing ids are skipped; the response
/// reports how many rows actually changed.
pub(in crate::api) async fn bulk_activate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<BulkActivateOutcome>>, ApiError> {
    let rid = &req_id.0;

    let ids = match body.get("product_ids").and_then(Value::as_array) {
        Some(items) => {
            let ids: Option<Vec<i64>> = items.iter().map(Value::as_i64).collect();
            ids.ok_or_else(|| {
                ApiError::new(rid, "validation_error", "product_ids must be a list of integers")
            })?
        }
        None => {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "product_ids must be a list of integers",
            ))
        }
    };

    let Some(active) = body.get("active").and_then(Value::as_bool) else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "active must be a boolean",
        ));
    };

    let updated_count = shopsync_db::set_products_active(&state.pool, &ids, active)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkActivateOutcome {
            updated_count,
            active_status: active,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products/{id}/remove — soft delete.
///
/// Removing an already-inactive product is a no-op that still returns 200;
/// an unknown id returns 404.
pub(in crate::api) async fn remove_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RemoveOutcome>>, ApiError> {
    let rid = &req_id.0;

    let product = shopsync_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))?;

    if !product.is_active {
        return Ok(Json(ApiResponse {
            data: RemoveOutcome {
                message: "Product is already inactive.",
            },
            meta: ResponseMeta::new(req_id.0),
        }));
    }

    shopsync_db::deactivate_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: RemoveOutcome {
            message: "Product deactivated.",
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
