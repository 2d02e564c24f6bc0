use std::fmt::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::errors::ServiceError;
use crate::services::order_assembly::ORIGINAL_CART_LABEL;
use crate::services::stripe_gateway::{ProviderLineItem, StripeGateway};

/// One priced line of a receipt, amount in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub label: String,
    pub amount: i64,
}

/// The order breakdown reconstructed from the provider's line-item record:
/// the storefront's original cart versus the marketplace add-ons.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Receipt {
    pub original_items: Vec<ReceiptLine>,
    pub addon_items: Vec<ReceiptLine>,
}

impl Receipt {
    pub fn subject() -> &'static str {
        "Thank you for your order!"
    }

    /// Splits provider line items into the two receipt groups. An item whose
    /// label starts with the original-cart marker (case-insensitive) belongs
    /// to the storefront order; everything else is an add-on.
    pub fn classify(items: Vec<ProviderLineItem>) -> Self {
        let mut receipt = Receipt::default();
        let marker = ORIGINAL_CART_LABEL.to_ascii_lowercase();

        for item in items {
            let line = ReceiptLine {
                label: item.description.unwrap_or_default(),
                amount: item.amount_total,
            };
            if line.label.to_ascii_lowercase().starts_with(&marker) {
                receipt.original_items.push(line);
            } else {
                receipt.addon_items.push(line);
            }
        }

        receipt
    }

    /// Renders the two-section plain-text body sent to the customer.
    pub fn render_body(&self, customer_name: &str) -> String {
        let mut body = String::new();

        if customer_name.trim().is_empty() {
            body.push_str("Your purchase includes:\n\n");
        } else {
            let _ = writeln!(body, "Hi {},\n\nYour purchase includes:\n", customer_name.trim());
        }

        if !self.original_items.is_empty() {
            body.push_str("Storefront order:\n");
            for line in &self.original_items {
                let _ = writeln!(body, "- {}: {}", line.label, format_amount(line.amount));
            }
            body.push('\n');
        }

        if !self.addon_items.is_empty() {
            body.push_str("Marketplace add-ons:\n");
            for line in &self.addon_items {
                let _ = writeln!(body, "- {}: {}", line.label, format_amount(line.amount));
            }
        }

        body
    }
}

/// Minor units to a dollar string, e.g. 1050 -> "$10.50"
fn format_amount(minor_units: i64) -> String {
    format!("${:.2}", minor_units as f64 / 100.0)
}

/// Rebuilds a customer-facing receipt for a paid session from the provider's
/// authoritative record. The locally assembled line items are never reused:
/// the service is stateless across requests and the provider's copy is the
/// source of truth once payment completed.
pub struct ReceiptBuilder {
    gateway: Arc<StripeGateway>,
}

impl ReceiptBuilder {
    pub fn new(gateway: Arc<StripeGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self))]
    pub async fn build(&self, session_id: &str) -> Result<Receipt, ServiceError> {
        let items = self.gateway.list_line_items(session_id).await?;
        Ok(Receipt::classify(items))
    }
}
