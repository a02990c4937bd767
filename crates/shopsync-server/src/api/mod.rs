mod merchants;
mod products;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Field→message map for shape validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub fn with_details(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" | "duplicate" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Default page size 5; clients may request up to 20.
pub(super) fn normalize_page_size(page_size: Option<i64>) -> i64 {
    page_size.unwrap_or(5).clamp(1, 20)
}

pub(super) fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset for a 1-based page. Saturates so an absurd `page` value falls
/// off the end of the result set instead of overflowing.
pub(super) fn page_offset(page: i64, page_size: i64) -> i64 {
    (page - 1).saturating_mul(page_size)
}

pub(super) fn map_db_error(request_id: String, error: &shopsync_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/merchants", post(merchants::create_merchant))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/import", post(products::import_product))
        .route(
            "/api/v1/products/bulk-activate",
            post(products::bulk_activate),
        )
        .route("/api/v1/products/{id}", get(products::get_product))
        .route(
            "/api/v1/products/{id}/remove",
            post(products::remove_product),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match shopsync_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use shopsync_core::{ProductPayload, VariantPayload};
    use tower::ServiceExt;

    // -------------------------------------------------------------------------
    // Pure unit tests (no DB)
    // -------------------------------------------------------------------------

    #[test]
    fn normalize_page_size_applies_defaults_and_bounds() {
        assert_eq!(normalize_page_size(None), 5);
        assert_eq!(normalize_page_size(Some(0)), 1);
        assert_eq!(normalize_page_size(Some(100)), 20);
        assert_eq!(normalize_page_size(Some(12)), 12);
    }

    #[test]
    fn normalize_page_floors_at_one() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }

    #[test]
    fn page_offset_saturates_for_huge_pages() {
        assert_eq!(page_offset(1, 5), 0);
        assert_eq!(page_offset(3, 5), 10);
        assert_eq!(
            page_offset(normalize_page(Some(i64::MAX)), normalize_page_size(None)),
            i64::MAX
        );
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_duplicate_maps_to_bad_request() {
        let response = ApiError::new("req-1", "duplicate", "already exists").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_omits_details_when_absent() {
        let error = ApiError::new("req-1", "bad_request", "nope");
        let json = serde_json::to_value(&error).expect("serialize");
        assert!(json["error"].get("details").is_none());
    }

    // -------------------------------------------------------------------------
    // Integration helpers
    // -------------------------------------------------------------------------

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        build_app(AppState { pool }, auth)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    /// Insert a merchant row for product tests and return its id.
    async fn seed_merchant(pool: &sqlx::PgPool, store_url: &str) -> i64 {
        shopsync_db::insert_merchant(pool, "Seed Merchant", "seed@test.example", store_url, "active")
            .await
            .expect("seed_merchant failed")
            .id
    }

    /// Import a product through the service layer and return its id.
    async fn seed_product(pool: &sqlx::PgPool, store_url: &str, external_id: &str, title: &str) -> i64 {
        let payload = ProductPayload {
            external_id: external_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            product_type: String::new(),
            variants: vec![VariantPayload {
                external_id: format!("{external_id}-v1"),
                title: "Default".to_string(),
                sku: None,
                price: "9.99".parse().expect("decimal"),
                compare_at_price: None,
                inventory_quantity: 0,
            }],
        };
        let (product, _) = shopsync_db::import_product(pool, store_url, &payload)
            .await
            .expect("seed_product failed");
        product.id
    }

    fn import_body(store_url: &str, external_id: &str) -> serde_json::Value {
        serde_json::json!({
            "store_url": store_url,
            "product": {
                "id": external_id,
                "title": "Red Shirt",
                "description": "A very red shirt.",
                "product_type": "Apparel",
                "variants": [
                    {"id": "v1", "title": "Small", "sku": "SHIRT-S", "price": "10.00",
                     "compare_at_price": "39.99", "inventory_quantity": 3},
                    {"id": "v2", "title": "Large", "price": "15.00"}
                ]
            }
        })
    }

    // -------------------------------------------------------------------------
    // Import — route integration tests (with DB)
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_returns_201_then_200_and_one_row(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let app = test_app(pool);

        let first = app
            .clone()
            .oneshot(post_json(
                "/api/v1/products/import",
                &import_body("https://acme.example.com", "EXT-1"),
            ))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::CREATED);
        let first_json = body_json(first).await;
        assert_eq!(
            first_json["data"]["message"].as_str(),
            Some("Product imported successfully.")
        );
        let product_id = first_json["data"]["id"].as_i64().expect("product id");

        let second = app
            .clone()
            .oneshot(post_json(
                "/api/v1/products/import",
                &import_body("https://acme.example.com", "EXT-1"),
            ))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::OK);
        let second_json = body_json(second).await;
        assert_eq!(second_json["data"]["id"].as_i64(), Some(product_id));
        assert_eq!(
            second_json["data"]["message"].as_str(),
            Some("Product already exists.")
        );

        let list = app
            .oneshot(get_request("/api/v1/products"))
            .await
            .expect("response");
        let list_json = body_json(list).await;
        assert_eq!(list_json["data"]["total"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_unknown_store_url_returns_400(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(post_json(
                "/api/v1/products/import",
                &import_body("https://nobody.example.com", "EXT-1"),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(
            json["error"]["message"].as_str(),
            Some("merchant with the given store_url does not exist")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_invalid_shape_returns_400_with_details(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(post_json(
                "/api/v1/products/import",
                &serde_json::json!({
                    "store_url": "https://acme.example.com",
                    "product": {"id": "EXT-1", "variants": "not-a-list"}
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
        assert_eq!(
            json["error"]["details"]["product.title"].as_str(),
            Some("is required")
        );
        assert_eq!(
            json["error"]["details"]["product.variants"].as_str(),
            Some("must be a list")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn import_derives_base_and_retail_prices(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let app = test_app(pool);

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/v1/products/import",
                &import_body("https://acme.example.com", "EXT-1"),
            ))
            .await
            .expect("response");
        let id = body_json(created).await["data"]["id"]
            .as_i64()
            .expect("product id");

        let detail = app
            .oneshot(get_request(&format!("/api/v1/products/{id}")))
            .await
            .expect("response");
        assert_eq!(detail.status(), StatusCode::OK);
        let json = body_json(detail).await;

        // base_price comes from the first variant, regardless of later prices.
        assert_eq!(json["data"]["base_price"].as_str(), Some("10.00"));

        let variants = json["data"]["variants"].as_array().expect("variants");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0]["retail_price"].as_str(), Some("39.99"));
        assert_eq!(variants[0]["quantity"].as_i64(), Some(3));
        // No compare_at_price: retail falls back to the variant's own price.
        assert_eq!(variants[1]["retail_price"].as_str(), Some("15.00"));
        assert_eq!(variants[1]["quantity"].as_i64(), Some(0));
    }

    // -------------------------------------------------------------------------
    // Listing — filters and pagination
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_products_filters_and_ignores_invalid_active_token(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        seed_product(&pool, "https://acme.example.com", "E1", "Red Shirt").await;
        seed_product(&pool, "https://acme.example.com", "E2", "shirt-123").await;
        let pants_id = seed_product(&pool, "https://acme.example.com", "E3", "Pants").await;
        shopsync_db::deactivate_product(&pool, pants_id)
            .await
            .expect("deactivate");

        let app = test_app(pool);

        // Invalid token: no filtering applied, not an error.
        let all = app
            .clone()
            .oneshot(get_request("/api/v1/products?active=banana"))
            .await
            .expect("response");
        assert_eq!(all.status(), StatusCode::OK);
        assert_eq!(body_json(all).await["data"]["total"].as_i64(), Some(3));

        let active_only = app
            .clone()
            .oneshot(get_request("/api/v1/products?active=true"))
            .await
            .expect("response");
        assert_eq!(body_json(active_only).await["data"]["total"].as_i64(), Some(2));

        let search = app
            .oneshot(get_request("/api/v1/products?search=shirt"))
            .await
            .expect("response");
        let json = body_json(search).await;
        assert_eq!(json["data"]["total"].as_i64(), Some(2));
        let titles: Vec<&str> = json["data"]["items"]
            .as_array()
            .expect("items")
            .iter()
            .map(|item| item["title"].as_str().expect("title"))
            .collect();
        assert_eq!(titles, vec!["Red Shirt", "shirt-123"]);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_products_paginates_with_default_and_max_page_size(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        for i in 0..6 {
            seed_product(
                &pool,
                "https://acme.example.com",
                &format!("E{i}"),
                &format!("Product {i}"),
            )
            .await;
        }

        let app = test_app(pool);

        let default_page = app
            .clone()
            .oneshot(get_request("/api/v1/products"))
            .await
            .expect("response");
        let json = body_json(default_page).await;
        assert_eq!(json["data"]["page_size"].as_i64(), Some(5));
        assert_eq!(json["data"]["items"].as_array().map(Vec::len), Some(5));
        assert_eq!(json["data"]["total"].as_i64(), Some(6));

        let second_page = app
            .clone()
            .oneshot(get_request("/api/v1/products?page=2"))
            .await
            .expect("response");
        let json = body_json(second_page).await;
        assert_eq!(json["data"]["items"].as_array().map(Vec::len), Some(1));

        let oversized = app
            .oneshot(get_request("/api/v1/products?page_size=100"))
            .await
            .expect("response");
        let json = body_json(oversized).await;
        assert_eq!(json["data"]["page_size"].as_i64(), Some(20));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_product_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(get_request("/api/v1/products/424242"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Merchants
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_merchant_returns_201_with_representation(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(post_json(
                "/api/v1/merchants",
                &serde_json::json!({
                    "name": "Acme Outfitters",
                    "email": "owner@acme.example",
                    "store_url": "https://acme.example.com",
                    "status": "active"
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["name"].as_str(), Some("Acme Outfitters"));
        assert_eq!(
            json["data"]["store_url"].as_str(),
            Some("https://acme.example.com")
        );
        assert_eq!(json["data"]["status"].as_str(), Some("active"));
        assert!(json["data"]["id"].as_i64().is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_merchant_rejects_invalid_fields(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let response = app
            .oneshot(post_json(
                "/api/v1/merchants",
                &serde_json::json!({
                    "name": "",
                    "email": "not-an-email",
                    "store_url": "acme.example.com"
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
        let details = &json["error"]["details"];
        assert_eq!(details["name"].as_str(), Some("must be 1-200 characters"));
        assert!(details["email"].is_string());
        assert!(details["store_url"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_merchant_rejects_duplicate_store_url(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let app = test_app(pool);

        let response = app
            .oneshot(post_json(
                "/api/v1/merchants",
                &serde_json::json!({
                    "name": "Copycat",
                    "email": "copy@cat.example",
                    "store_url": "https://acme.example.com"
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("duplicate"));
    }

    // -------------------------------------------------------------------------
    // Bulk activate and soft delete
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_activate_updates_matching_rows_and_reports_count(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let p1 = seed_product(&pool, "https://acme.example.com", "E1", "One").await;
        let p2 = seed_product(&pool, "https://acme.example.com", "E2", "Two").await;
        let app = test_app(pool.clone());

        let response = app
            .oneshot(post_json(
                "/api/v1/products/bulk-activate",
                &serde_json::json!({"product_ids": [p1, p2, 999_999], "active": false}),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["updated_count"].as_u64(), Some(2));
        assert_eq!(json["data"]["active_status"].as_bool(), Some(false));

        let row = shopsync_db::get_product(&pool, p1)
            .await
            .expect("get")
            .expect("row");
        assert!(!row.is_active);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_activate_rejects_malformed_bodies(pool: sqlx::PgPool) {
        let app = test_app(pool);

        for body in [
            serde_json::json!({"product_ids": "not-a-list", "active": true}),
            serde_json::json!({"product_ids": [1, "two"], "active": true}),
            serde_json::json!({"product_ids": [1, 2]}),
            serde_json::json!({"product_ids": [1, 2], "active": null}),
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/v1/products/bulk-activate", &body))
                .await
                .expect("response");
            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "body should be rejected: {body}"
            );
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn remove_product_soft_deletes_then_noops(pool: sqlx::PgPool) {
        seed_merchant(&pool, "https://acme.example.com").await;
        let id = seed_product(&pool, "https://acme.example.com", "E1", "One").await;
        let app = test_app(pool);

        let first = app
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/products/{id}/remove"),
                &serde_json::json!({}),
            ))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            body_json(first).await["data"]["message"].as_str(),
            Some("Product deactivated.")
        );

        let second = app
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/products/{id}/remove"),
                &serde_json::json!({}),
            ))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(
            body_json(second).await["data"]["message"].as_str(),
            Some("Product is already inactive.")
        );

        let missing = app
            .oneshot(post_json(
                "/api/v1/products/424242/remove",
                &serde_json::json!({}),
            ))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
