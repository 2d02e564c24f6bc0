use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::errors::ServiceError;
use crate::handlers::AppServices;
use crate::services::receipt::Receipt;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Customer address used when the completed session carries no details
const FALLBACK_EMAIL: &str = "unknown@example.com";

/// Payment provider event notification endpoint.
///
/// Verification runs over the exact raw body bytes; nothing in the payload is
/// trusted before the signature checks out. Every verified event is
/// acknowledged with 200 so the provider stops redelivering, but only a
/// completed checkout session triggers work.
// POST /webhook
#[utoipa::path(
    post,
    path = "/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook acknowledged"),
        (status = 400, description = "Invalid payload or signature", body = crate::errors::ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if !verify_signature(
        &headers,
        &body,
        &state.config.stripe_webhook_secret,
        state.config.stripe_webhook_tolerance_secs,
    ) {
        warn!("webhook signature verification failed");
        return Err(ServiceError::InvalidSignature);
    }

    let event: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "webhook body is not valid JSON");
        ServiceError::InvalidPayload
    })?;

    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
    match event_type {
        "checkout.session.completed" => {
            let session = &event["data"]["object"];
            let Some(session_id) = session.get("id").and_then(Value::as_str) else {
                warn!("completed-session event carries no session id");
                return Err(ServiceError::InvalidPayload);
            };

            let customer_email = session["customer_details"]["email"]
                .as_str()
                .unwrap_or(FALLBACK_EMAIL)
                .to_string();
            let customer_name = session["customer_details"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            info!(%session_id, "checkout session completed");

            // Receipt delivery is best-effort and decoupled from the
            // acknowledgment: the provider must get its 200 even when the
            // line-item fetch or the email send fails. Redelivered events
            // just run this again.
            let services = state.services.clone();
            let session_id = session_id.to_string();
            tokio::spawn(async move {
                deliver_receipt(services, session_id, customer_email, customer_name).await;
            });
        }
        other => {
            info!(event_type = %other, "ignoring webhook event type");
        }
    }

    Ok((axum::http::StatusCode::OK, "ok"))
}

/// Fetches the paid session's line items and emails the receipt. Failures are
/// logged, never propagated.
async fn deliver_receipt(
    services: AppServices,
    session_id: String,
    customer_email: String,
    customer_name: String,
) {
    let receipt = match services.receipts.build(&session_id).await {
        Ok(receipt) => receipt,
        Err(e) => {
            error!(%session_id, error = %e, "failed to reconstruct receipt");
            return;
        }
    };

    let body = receipt.render_body(&customer_name);
    if let Err(e) = services
        .mailer
        .send(&customer_email, Receipt::subject(), &body)
        .await
    {
        error!(%session_id, error = %e, "failed to send confirmation email");
    }
}

/// Verifies a `Stripe-Signature` header: `t=<unix>,v1=<hex hmac>` where the
/// HMAC-SHA256 runs over `"{t}.{raw_body}"` with the shared signing secret.
/// A timestamp outside the tolerance window fails even with a valid MAC.
pub fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let Some(sig) = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in sig.split(',') {
        let mut it = part.trim().split('=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    let Ok(ts_i) = ts.parse::<i64>() else {
        return false;
    };
    let now = chrono::Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        return false;
    }

    let Ok(payload) = std::str::from_utf8(payload) else {
        return false;
    };
    let signed = format!("{ts}.{payload}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, v1)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
