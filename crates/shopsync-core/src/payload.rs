//! Normalized import payload for products fetched from an external storefront.
//!
//! The HTTP layer hands the `product` key of an import request over as a
//! free-form JSON object; [`ProductPayload::from_json`] validates its shape
//! and produces a typed payload or a field→message map of what was wrong.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product as supplied by the source platform, validated and normalized
/// for the import service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    /// Source-platform product ID, stored as a string to avoid precision loss.
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub product_type: String,
    pub variants: Vec<VariantPayload>,
}

/// A single purchasable variant of a [`ProductPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPayload {
    /// Source-platform variant ID, stored as a string to avoid precision loss.
    pub external_id: String,
    pub title: String,
    pub sku: Option<String>,
    /// Unit price. Rounded to `NUMERIC(10,2)` at persistence time.
    pub price: Decimal,
    /// Compare-at / list price, if the platform supplied one.
    pub compare_at_price: Option<Decimal>,
    /// Stock on hand; platforms omit this for untracked inventory.
    pub inventory_quantity: i32,
}

/// Field-level validation failures from [`ProductPayload::from_json`].
///
/// Keyed by field path (e.g. `"title"`, `"variants[2].price"`), ordered for
/// stable serialization into error response bodies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayloadErrors(pub BTreeMap<String, String>);

impl PayloadErrors {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ProductPayload {
    /// Validate and normalize the `product` object of an import request.
    ///
    /// Required keys: `id`, `title`, `variants` (a list). Each variant
    /// requires `id`, `title`, and `price`; `sku`, `compare_at_price`, and
    /// `inventory_quantity` are optional (quantity defaults to 0).
    ///
    /// # Errors
    ///
    /// Returns [`PayloadErrors`] mapping each offending field to a message
    /// when the shape is invalid. All failures are collected in one pass.
    pub fn from_json(value: &Value) -> Result<Self, PayloadErrors> {
        let mut errors = PayloadErrors::default();

        let Some(object) = value.as_object() else {
            errors.push("product", "must be an object");
            return Err(errors);
        };

        let external_id = require_id(object.get("id"), "id", &mut errors);
        let title = require_string(object.get("title"), "title", &mut errors);
        let description = optional_string(object.get("description"));
        let product_type = optional_string(object.get("product_type"));

        let mut variants = Vec::new();
        match object.get("variants") {
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Some(variant) = parse_variant(item, index, &mut errors) {
                        variants.push(variant);
                    }
                }
            }
            Some(_) => errors.push("variants", "must be a list"),
            None => errors.push("variants", "is required"),
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            external_id: external_id.unwrap_or_default(),
            title: title.unwrap_or_default(),
            description,
            product_type,
            variants,
        })
    }

    /// The product's derived base price: the first variant's price, or zero
    /// when the payload carries no variants. Fixed at creation time and
    /// never recomputed.
    #[must_use]
    pub fn base_price(&self) -> Decimal {
        self.variants
            .first()
            .map_or(Decimal::ZERO, |variant| variant.price)
    }
}

impl VariantPayload {
    /// The compare-at price when present and non-zero, otherwise the
    /// variant's own price. A zero compare-at price is treated as unset.
    #[must_use]
    pub fn retail_price(&self) -> Decimal {
        self.compare_at_price
            .filter(|price| !price.is_zero())
            .unwrap_or(self.price)
    }
}

fn parse_variant(value: &Value, index: usize, errors: &mut PayloadErrors) -> Option<VariantPayload> {
    let Some(object) = value.as_object() else {
        errors.push(format!("variants[{index}]"), "must be an object");
        return None;
    };

    let external_id = require_id(object.get("id"), &format!("variants[{index}].id"), errors);
    let title = require_string(
        object.get("title"),
        &format!("variants[{index}].title"),
        errors,
    );
    let price = require_decimal(
        object.get("price"),
        &format!("variants[{index}].price"),
        errors,
    );

    let sku = object.get("sku").and_then(Value::as_str).map(str::to_owned);

    let compare_at_price = match object.get("compare_at_price") {
        None | Some(Value::Null) => None,
        Some(raw) => match parse_decimal(raw) {
            Some(decimal) => Some(decimal),
            None => {
                errors.push(
                    format!("variants[{index}].compare_at_price"),
                    "must be a decimal number",
                );
                None
            }
        },
    };

    let inventory_quantity = match object.get("inventory_quantity") {
        None | Some(Value::Null) => 0,
        Some(raw) => match raw.as_i64().and_then(|n| i32::try_from(n).ok()) {
            Some(quantity) if quantity >= 0 => quantity,
            _ => {
                errors.push(
                    format!("variants[{index}].inventory_quantity"),
                    "must be a non-negative integer",
                );
                0
            }
        },
    };

    Some(VariantPayload {
        external_id: external_id?,
        title: title?,
        sku,
        price: price?,
        compare_at_price,
        inventory_quantity,
    })
}

/// Source ids arrive as either JSON strings or (Shopify) numeric ids; both
/// normalize to a string.
fn require_id(value: Option<&Value>, field: &str, errors: &mut PayloadErrors) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(_) => {
            errors.push(field, "must be a string or integer");
            None
        }
        None => {
            errors.push(field, "is required");
            None
        }
    }
}

fn require_string(value: Option<&Value>, field: &str, errors: &mut PayloadErrors) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
        None => {
            errors.push(field, "is required");
            None
        }
    }
}

fn require_decimal(value: Option<&Value>, field: &str, errors: &mut PayloadErrors) -> Option<Decimal> {
    match value {
        Some(raw) => match parse_decimal(raw) {
            Some(decimal) => Some(decimal),
            None => {
                errors.push(field, "must be a decimal number");
                None
            }
        },
        None => {
            errors.push(field, "is required");
            None
        }
    }
}

/// Parse a price from either a JSON string (`"29.99"`, as Shopify sends
/// them) or a JSON number.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse::<Decimal>().ok(),
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn optional_string(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}
