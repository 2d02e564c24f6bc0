//! Shared test harness: an in-process app driven through tower's `oneshot`.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use revshot_api::config::AppConfig;
use revshot_api::{app_router, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

type HmacSha256 = Hmac<Sha256>;

/// Development-mode config pointed at a mock Stripe server
pub fn test_config(stripe_api_base: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        environment: "development".into(),
        log_level: "info".into(),
        log_json: false,
        stripe_secret_key: "sk_test_abc123".into(),
        stripe_webhook_secret: WEBHOOK_SECRET.into(),
        stripe_api_base: stripe_api_base.into(),
        stripe_webhook_tolerance_secs: 300,
        gateway_timeout_secs: 5,
        default_currency: "usd".into(),
        application_fee_amount: None,
        fee_destination_account: None,
        smtp_host: "smtp.gmail.com".into(),
        smtp_port: 465,
        email_sender: None,
        email_password: None,
        survey_public_token: Some("pub_tok_123".into()),
        catalog_csv_path: "/nonexistent/catalog.csv".into(),
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
    }
}

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(stripe_api_base: &str) -> Self {
        Self::with_config(test_config(stripe_api_base))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::from_config(config).expect("app state");
        Self {
            router: app_router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response")
    }

    /// Posts raw bytes to the payment webhook with an optional signature
    /// header.
    pub async fn post_webhook(&self, body: &[u8], signature: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::POST).uri("/webhook");
        if let Some(sig) = signature {
            builder = builder.header("Stripe-Signature", sig);
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_vec())).expect("request"))
            .await
            .expect("response")
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Forges a `Stripe-Signature` header value for the given payload
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(signed.as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}
