//! Import endpoint: hands a validated external payload to the transactional
//! reconciliation service and maps its outcome to a status code.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use serde_json::Value;

use shopsync_core::ProductPayload;

use crate::middleware::RequestId;

use super::super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(in crate::api) struct ImportOutcome {
    pub id: i64,
    pub message: &'static str,
}

/// POST /api/v1/products/import
///
/// Body: `{ "store_url": "...", "product": { ... } }`. Returns 201 when the
/// product was created, 200 when it already existed (in which case the
/// payload's variants are deliberately ignored), 400 for shape/reference
/// failures, and 500 — with the error message in the body — for anything
/// unexpected.
pub(in crate::api) async fn import_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<ImportOutcome>>), ApiError> {
    let rid = &req_id.0;

    let (store_url, payload) = validate_import_body(rid, &body)?;

    let (product, created) = shopsync_db::import_product(&state.pool, store_url, &payload)
        .await
        .map_err(|e| match e {
            shopsync_db::DbError::MerchantNotFound => {
                ApiError::new(rid, "bad_request", e.to_string())
            }
            shopsync_db::DbError::DuplicateProduct => ApiError::new(rid, "duplicate", e.to_string()),
            other => {
                tracing::error!(error = %other, store_url, "product import failed");
                ApiError::new(rid, "internal_error", format!("internal server error: {other}"))
            }
        })?;

    let (status, message) = if created {
        (StatusCode::CREATED, "Product imported successfully.")
    } else {
        (StatusCode::OK, "Product already exists.")
    };

    Ok((
        status,
        Json(ApiResponse {
            data: ImportOutcome {
                id: product.id,
                message,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Validate the outer request shape and the nested product payload, merging
/// all failures into one details map.
fn validate_import_body<'a>(
    rid: &str,
    body: &'a Value,
) -> Result<(&'a str, ProductPayload), ApiError> {
    let store_url = match body.get("store_url") {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err("must be a string"),
        None => Err("is required"),
    };

    let payload = match body.get("product") {
        Some(product) => ProductPayload::from_json(product).map_err(|errors| {
            errors
                .0
                .into_iter()
                .map(|(field, message)| {
                    // The root "must be an object" error already names the field.
                    let key = if field == "product" {
                        field
                    } else {
                        format!("product.{field}")
                    };
                    (key, Value::String(message))
                })
                .collect::<serde_json::Map<String, Value>>()
        }),
        None => {
            let mut details = serde_json::Map::new();
            details.insert("product".into(), Value::String("is required".into()));
            Err(details)
        }
    };

    match (store_url, payload) {
        (Ok(store_url), Ok(payload)) => Ok((store_url, payload)),
        (store_url, payload) => {
            let mut details = payload.err().unwrap_or_default();
            if let Err(message) = store_url {
                details.insert("store_url".into(), Value::String(message.into()));
            }
            Err(ApiError::with_details(
                rid,
                "validation_error",
                "invalid request data",
                Value::Object(details),
            ))
        }
    }
}
