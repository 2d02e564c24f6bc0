use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Label marker identifying the storefront's own cart inside a checkout
/// session. The receipt builder matches on this exact prefix, so it must not
/// change without coordinating with sessions already in flight.
pub const ORIGINAL_CART_LABEL: &str = "Original Cart Total";

/// Client-submitted checkout request. `items` stays untyped until assembly so
/// a single malformed entry can be dropped instead of failing the whole body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Storefront cart total in minor currency units
    #[serde(default)]
    pub original_total: i64,

    /// Selected upsell items; must be a JSON array when present
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub items: Option<Value>,

    /// Storefront site name, shown on the original-cart line item
    #[serde(default)]
    pub site_name: Option<String>,

    /// Redirect target after successful payment
    #[serde(default)]
    pub success_url: Option<String>,

    /// Redirect target after an abandoned payment
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// One priced entry of a checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub label: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

impl LineItem {
    fn single(label: impl Into<String>, unit_amount: i64) -> Self {
        Self {
            label: label.into(),
            unit_amount,
            quantity: 1,
        }
    }
}

/// Builds the priced line-item list for a checkout session.
///
/// The storefront total, when present, becomes the first line item; upsell
/// entries follow in submission order. Entries without a non-empty name or an
/// integer price are dropped silently. An empty result is an error: it is the
/// precondition for calling the payment gateway.
///
/// Pure function: no I/O, deterministic given its input.
pub fn assemble(request: &OrderRequest) -> Result<Vec<LineItem>, ServiceError> {
    // A missing field means "no add-ons"; anything present that is not an
    // array (including an explicit null) is malformed input.
    let items = match &request.items {
        None => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(ServiceError::InvalidFormat),
    };

    let mut line_items = Vec::with_capacity(items.len() + 1);

    if request.original_total > 0 {
        line_items.push(LineItem::single(
            original_cart_label(request.site_name.as_deref()),
            request.original_total,
        ));
    }

    for item in items {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let price = item.get("price").and_then(Value::as_i64);

        match (name, price) {
            (Some(name), Some(price)) => line_items.push(LineItem::single(name, price)),
            _ => debug!(item = %item, "dropping malformed cart item"),
        }
    }

    if line_items.is_empty() {
        return Err(ServiceError::EmptyCart);
    }

    Ok(line_items)
}

/// Label for the storefront-cart line item, e.g.
/// "Original Cart Total from example.com".
fn original_cart_label(site_name: Option<&str>) -> String {
    match site_name.map(strip_site_prefix).filter(|s| !s.is_empty()) {
        Some(site) => format!("{ORIGINAL_CART_LABEL} from {site}"),
        None => ORIGINAL_CART_LABEL.to_string(),
    }
}

/// Strips URL scheme and leading "www." so the receipt shows a bare site name
fn strip_site_prefix(site: &str) -> &str {
    let site = site.trim();
    let site = site
        .strip_prefix("https://")
        .or_else(|| site.strip_prefix("http://"))
        .unwrap_or(site);
    let site = site.strip_prefix("www.").unwrap_or(site);
    site.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn request(original_total: i64, items: Value) -> OrderRequest {
        OrderRequest {
            original_total,
            items: Some(items),
            site_name: None,
            success_url: None,
            cancel_url: None,
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let result = assemble(&request(0, json!([])));
        assert_matches!(result, Err(ServiceError::EmptyCart));
    }

    #[test]
    fn missing_items_field_with_total_still_checks_out() {
        let mut req = request(1500, json!([]));
        req.items = None;
        let result = assemble(&req).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, ORIGINAL_CART_LABEL);
    }

    #[test]
    fn non_array_items_is_invalid_format() {
        let result = assemble(&request(1000, json!("not a list")));
        assert_matches!(result, Err(ServiceError::InvalidFormat));

        let result = assemble(&request(1000, json!({"name": "Wax"})));
        assert_matches!(result, Err(ServiceError::InvalidFormat));

        // An explicit null is present-but-malformed, unlike an omitted field
        let result = assemble(&request(1000, Value::Null));
        assert_matches!(result, Err(ServiceError::InvalidFormat));
    }

    #[test]
    fn original_total_becomes_first_line_item() {
        let items = json!([{"name": "Wax", "price": 500}]);
        let result = assemble(&request(1000, items)).unwrap();

        assert_eq!(
            result,
            vec![
                LineItem {
                    label: "Original Cart Total".into(),
                    unit_amount: 1000,
                    quantity: 1,
                },
                LineItem {
                    label: "Wax".into(),
                    unit_amount: 500,
                    quantity: 1,
                },
            ]
        );
    }

    #[test]
    fn zero_total_produces_no_original_line() {
        let items = json!([{"name": "Wax", "price": 500}]);
        let result = assemble(&request(0, items)).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, "Wax");
    }

    #[test]
    fn malformed_items_are_dropped_not_fatal() {
        let items = json!([
            {"name": "Wax", "price": 500},
            {"name": "", "price": 300},
            {"name": "Fractional", "price": 2.5},
            {"name": "Stringly", "price": "300"},
            {"price": 100},
            {"name": "No price"},
            {"name": "Candle", "price": 750},
        ]);
        let result = assemble(&request(0, items)).unwrap();

        let labels: Vec<&str> = result.iter().map(|li| li.label.as_str()).collect();
        assert_eq!(labels, vec!["Wax", "Candle"]);
    }

    #[test]
    fn line_item_count_matches_valid_entries() {
        let items = json!([
            {"name": "A", "price": 1},
            {"name": "B", "price": 2},
            {"name": "", "price": 3},
        ]);

        let with_total = assemble(&request(100, items.clone())).unwrap();
        assert_eq!(with_total.len(), 1 + 2);

        let without_total = assemble(&request(0, items)).unwrap();
        assert_eq!(without_total.len(), 2);
    }

    #[test]
    fn all_items_malformed_is_empty_cart() {
        let items = json!([{"name": "", "price": 1}, {"name": "x"}]);
        let result = assemble(&request(0, items));
        assert_matches!(result, Err(ServiceError::EmptyCart));
    }

    #[test]
    fn site_name_is_stripped_and_appended() {
        let mut req = request(1000, json!([]));
        req.site_name = Some("https://www.example.com/".into());
        let result = assemble(&req).unwrap();
        assert_eq!(result[0].label, "Original Cart Total from example.com");
    }

    #[test]
    fn blank_site_name_falls_back_to_bare_label() {
        let mut req = request(1000, json!([]));
        req.site_name = Some("   ".into());
        let result = assemble(&req).unwrap();
        assert_eq!(result[0].label, ORIGINAL_CART_LABEL);
    }
}
