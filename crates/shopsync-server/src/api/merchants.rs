//! Merchant registration handler.

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateMerchantRequest {
    pub name: String,
    pub email: String,
    pub store_url: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct MerchantBody {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub store_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Minimal shape check for a store URL: an http(s) scheme followed by a
/// non-empty host. The URL is a lookup key, not something we dereference.
fn is_valid_store_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) => {
            let host = host.split('/').next().unwrap_or_default();
            !host.is_empty() && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_valid_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// POST /api/v1/merchants — register a new merchant.
pub(super) async fn create_merchant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateMerchantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MerchantBody>>), ApiError> {
    let rid = &req_id.0;

    let mut field_errors: BTreeMap<String, String> = BTreeMap::new();

    let name = body.name.trim().to_owned();
    if name.is_empty() || name.len() > 200 {
        field_errors.insert("name".into(), "must be 1-200 characters".into());
    }
    if !is_valid_email(body.email.trim()) {
        field_errors.insert("email".into(), "must be a valid email address".into());
    }
    if !is_valid_store_url(&body.store_url) {
        field_errors.insert("store_url".into(), "must be an http(s) URL".into());
    }
    let status = body.status.unwrap_or_else(|| "pending".to_owned());
    if status != "pending" && status != "active" {
        field_errors.insert("status".into(), "must be 'pending' or 'active'".into());
    }

    if !field_errors.is_empty() {
        return Err(ApiError::with_details(
            rid,
            "validation_error",
            "invalid request data",
            serde_json::json!(field_errors),
        ));
    }

    let row = shopsync_db::insert_merchant(
        &state.pool,
        &name,
        body.email.trim(),
        &body.store_url,
        &status,
    )
    .await
    .map_err(|e| match e {
        shopsync_db::DbError::DuplicateMerchant => {
            ApiError::new(rid, "duplicate", e.to_string())
        }
        other => map_db_error(rid.clone(), &other),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: MerchantBody {
                id: row.id,
                name: row.name,
                email: row.email,
                store_url: row.store_url,
                status: row.status,
                created_at: row.created_at,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_url_validation_accepts_http_and_https() {
        assert!(is_valid_store_url("https://acme.example.com"));
        assert!(is_valid_store_url("http://acme.example.com/shop"));
        assert!(!is_valid_store_url("ftp://acme.example.com"));
        assert!(!is_valid_store_url("acme.example.com"));
        assert!(!is_valid_store_url("https://"));
        assert!(!is_valid_store_url("https://bad host.com"));
    }

    #[test]
    fn email_validation_requires_local_and_domain() {
        assert!(is_valid_email("owner@acme.example"));
        assert!(!is_valid_email("owner"));
        assert!(!is_valid_email("@acme.example"));
        assert!(!is_valid_email("owner@nodot"));
    }
}
