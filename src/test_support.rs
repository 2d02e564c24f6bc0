//! Shared fixtures for unit tests

use crate::config::AppConfig;

/// Development-mode config with test keys; individual tests override fields.
pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 8080,
        environment: "development".into(),
        log_level: "info".into(),
        log_json: false,
        stripe_secret_key: "sk_test_abc123".into(),
        stripe_webhook_secret: "whsec_test123secret456".into(),
        stripe_api_base: "https://api.stripe.com".into(),
        stripe_webhook_tolerance_secs: 300,
        gateway_timeout_secs: 10,
        default_currency: "usd".into(),
        application_fee_amount: None,
        fee_destination_account: None,
        smtp_host: "smtp.gmail.com".into(),
        smtp_port: 465,
        email_sender: None,
        email_password: None,
        survey_public_token: Some("pub_tok_123".into()),
        catalog_csv_path: "data/data.csv".into(),
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
    }
}
