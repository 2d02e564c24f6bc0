use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::order_assembly::LineItem;

/// Connected-account fee split forwarded on session creation
#[derive(Debug, Clone)]
pub struct FeeSplit {
    pub application_fee_amount: i64,
    pub destination_account: String,
}

/// Provider-hosted payment collection flow. The service never persists it;
/// the id only comes back later inside the completed-session webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// One line item as recorded by the provider. Post-payment this copy is the
/// source of truth for the receipt, not the locally assembled list.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderLineItem {
    /// The provider nulls this out for some price configurations
    #[serde(default)]
    pub description: Option<String>,
    pub amount_total: i64,
}

#[derive(Debug, Deserialize)]
struct LineItemPage {
    data: Vec<ProviderLineItem>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetails {
    message: Option<String>,
}

/// Thin client for the Stripe Checkout Sessions API (form-encoded v1 surface).
///
/// Owns no state beyond the HTTP client. One provider call per request, no
/// retries: the caller decides whether to retry the whole checkout attempt.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
}

impl StripeGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.gateway_timeout_secs))
                .build()
                .expect("http client"),
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
            currency: config.default_currency.clone(),
        }
    }

    /// Creates a hosted checkout session for the given line items and returns
    /// the redirect URL.
    #[instrument(skip(self, line_items, fee_split), fields(item_count = line_items.len()))]
    pub async fn create_session(
        &self,
        line_items: &[LineItem],
        success_url: &str,
        cancel_url: &str,
        fee_split: Option<&FeeSplit>,
    ) -> Result<CheckoutSession, ServiceError> {
        // The v1 checkout API only accepts form encoding, with list-of-object
        // params spelled as bracketed keys.
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[]".into(), "card".into()),
            ("success_url".into(), success_url.to_string()),
            ("cancel_url".into(), cancel_url.to_string()),
        ];

        for (i, item) in line_items.iter().enumerate() {
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                self.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.label.clone(),
            ));
        }

        if let Some(split) = fee_split {
            form.push((
                "payment_intent_data[application_fee_amount]".into(),
                split.application_fee_amount.to_string(),
            ));
            form.push((
                "payment_intent_data[transfer_data][destination]".into(),
                split.destination_account.clone(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let session: CheckoutSession = Self::parse_response(response).await?;
        info!(session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Fetches the provider's authoritative line items for a session.
    #[instrument(skip(self))]
    pub async fn list_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<ProviderLineItem>, ServiceError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}/line_items",
                self.api_base, session_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let page: LineItemPage = Self::parse_response(response).await?;
        Ok(page.data)
    }

    /// Deserializes a success body or surfaces the provider's error message.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("provider returned status {status}"));
            warn!(%status, %message, "payment provider call failed");
            return Err(ServiceError::ExternalServiceError(message));
        }

        serde_json::from_slice(&body).map_err(|e| {
            ServiceError::ExternalServiceError(format!("unexpected provider response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base: &str) -> AppConfig {
        let mut cfg = crate::test_support::test_config();
        cfg.stripe_api_base = api_base.to_string();
        cfg
    }

    fn line_items() -> Vec<LineItem> {
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
    }

    #[tokio::test]
    async fn create_session_posts_bracketed_form_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains("mode=payment"))
            .and(body_string_contains(
                "line_items%5B0%5D%5Bprice_data%5D%5Bunit_amount%5D=1000",
            ))
            .and(body_string_contains(
                "line_items%5B1%5D%5Bprice_data%5D%5Bproduct_data%5D%5Bname%5D=Wax",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_123",
                "url": "https://checkout.stripe.com/pay/cs_test_123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&test_config(&server.uri()));
        let session = gateway
            .create_session(&line_items(), "https://x/ok", "https://x/no", None)
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_123");
        assert_eq!(session.url, "https://checkout.stripe.com/pay/cs_test_123");
    }

    #[tokio::test]
    async fn create_session_forwards_fee_split() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_string_contains(
                "payment_intent_data%5Bapplication_fee_amount%5D=123",
            ))
            .and(body_string_contains("acct_42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_456",
                "url": "https://checkout.stripe.com/pay/cs_test_456"
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&test_config(&server.uri()));
        let split = FeeSplit {
            application_fee_amount: 123,
            destination_account: "acct_42".into(),
        };
        let session = gateway
            .create_session(&line_items(), "https://x/ok", "https://x/no", Some(&split))
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_456");
    }

    #[tokio::test]
    async fn provider_error_message_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Invalid currency: xyz"}
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&test_config(&server.uri()));
        let err = gateway
            .create_session(&line_items(), "https://x/ok", "https://x/no", None)
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::ExternalServiceError(msg) if msg == "Invalid currency: xyz");
    }

    #[tokio::test]
    async fn list_line_items_unwraps_data_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_123/line_items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"description": "Original Cart Total", "amount_total": 1000},
                    {"description": "Wax", "amount_total": 500}
                ],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&test_config(&server.uri()));
        let items = gateway.list_line_items("cs_test_123").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description.as_deref(), Some("Original Cart Total"));
        assert_eq!(items[1].amount_total, 500);
    }
}
