//! Revshot API Library
//!
//! Upsell checkout backend: assembles a combined cart, opens Stripe Checkout
//! sessions, verifies payment webhooks, emails itemized receipts, and tracks
//! survey-based discount eligibility.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    routing::{get, post},
    Router,
};

use crate::errors::ServiceError;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn from_config(config: config::AppConfig) -> Result<Self, ServiceError> {
        let services = handlers::AppServices::from_config(&config)?;
        Ok(Self { config, services })
    }
}

/// Storefront-facing JSON API, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(handlers::checkout::create_checkout_session))
        .route("/products", get(handlers::products::list_products))
        .route("/enhancements", get(handlers::products::list_products))
        .route("/discount/start", post(handlers::discount::start_survey))
        .route("/discount/webhook", post(handlers::discount::survey_callback))
        .route("/discount/status", get(handlers::discount::survey_status))
}

/// Full application router: status root, payment webhook at the root path
/// (matching the provider's configured endpoint), the `/api` surface, and
/// Swagger UI.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "revshot-api up" }))
        .route("/webhook", post(handlers::webhooks::stripe_webhook))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
