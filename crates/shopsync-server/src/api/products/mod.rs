//! Product API handlers.
//!
//! - `GET  /api/v1/products`                — filtered, paginated list
//! - `GET  /api/v1/products/{id}`           — full detail with variants
//! - `POST /api/v1/products/import`         — import from external payload
//! - `POST /api/v1/products/bulk-activate`  — set active flag on many ids
//! - `POST /api/v1/products/{id}/remove`    — soft delete one product

mod detail;
mod import;
mod list;
mod write;

pub(super) use detail::get_product;
pub(super) use import::import_product;
pub(super) use list::list_products;
pub(super) use write::{bulk_activate, remove_product};

/// Parse the `active` query token. Only the literal strings `"true"` and
/// `"false"` filter; any other value is ignored rather than rejected.
fn parse_active_token(token: Option<&str>) -> Option<bool> {
    match token {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}
