use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::order_assembly::{self, OrderRequest};
use crate::AppState;

/// Fallback origin when the storefront embed sends no Origin header
const DEFAULT_ORIGIN: &str = "https://example.com";

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Provider-hosted payment page to redirect the customer to
    pub url: String,
}

/// Assemble the combined cart and open a hosted checkout session.
// POST /api/checkout
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 400, description = "Invalid or empty cart", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let line_items = order_assembly::assemble(&payload)?;

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_ORIGIN);
    let success_url = payload
        .success_url
        .clone()
        .unwrap_or_else(|| format!("{origin}/thank-you"));
    let cancel_url = payload
        .cancel_url
        .clone()
        .unwrap_or_else(|| format!("{origin}/checkout-canceled"));

    let session = state
        .services
        .gateway
        .create_session(
            &line_items,
            &success_url,
            &cancel_url,
            state.services.fee_split.as_ref(),
        )
        .await?;

    info!(session_id = %session.id, items = line_items.len(), "redirecting to hosted checkout");
    Ok(Json(CheckoutResponse { url: session.url }))
}
