use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::eligibility::{CompletionOutcome, EligibilityRecord};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartSurveyRequest {
    /// Customer email the discount will be keyed by
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSurveyResponse {
    /// Public integration token for the survey widget
    pub public_token: String,
    /// Generated id the survey vendor echoes back on completion
    pub user_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SurveyCallbackRequest {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusParams {
    pub email: Option<String>,
}

/// Start a survey session for a customer email.
// POST /api/discount/start
#[utoipa::path(
    post,
    path = "/api/discount/start",
    request_body = StartSurveyRequest,
    responses(
        (status = 200, description = "Survey session started", body = StartSurveyResponse),
        (status = 400, description = "Email missing", body = crate::errors::ErrorResponse)
    ),
    tag = "Discount"
)]
pub async fn start_survey(
    State(state): State<AppState>,
    Json(payload): Json<StartSurveyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = payload
        .email
        .as_deref()
        .ok_or_else(|| ServiceError::ValidationError("email is required".into()))?;

    let session = state.services.eligibility.start(email).await?;
    Ok(Json(StartSurveyResponse {
        public_token: session.public_token,
        user_id: session.user_id,
    }))
}

/// Survey vendor completion callback.
// POST /api/discount/webhook
#[utoipa::path(
    post,
    path = "/api/discount/webhook",
    request_body = SurveyCallbackRequest,
    responses(
        (status = 200, description = "Callback processed or intentionally ignored"),
        (status = 400, description = "Missing event or user id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown survey session")
    ),
    tag = "Discount"
)]
pub async fn survey_callback(
    State(state): State<AppState>,
    Json(payload): Json<SurveyCallbackRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (Some(event), Some(user_id)) = (payload.event.as_deref(), payload.user_id.as_deref())
    else {
        return Err(ServiceError::ValidationError(
            "event and user_id are required".into(),
        ));
    };

    let outcome = state.services.eligibility.complete(user_id, event).await?;
    let response = match outcome {
        CompletionOutcome::Updated => (StatusCode::OK, Json(json!({ "updated": true }))),
        CompletionOutcome::Ignored => (
            StatusCode::OK,
            Json(json!({ "updated": false, "status": "ignored" })),
        ),
        CompletionOutcome::UnknownSession => (
            StatusCode::NOT_FOUND,
            Json(json!({ "updated": false, "status": "unknown_user" })),
        ),
    };
    Ok(response)
}

/// Current discount eligibility for an email.
// GET /api/discount/status?email=
#[utoipa::path(
    get,
    path = "/api/discount/status",
    params(StatusParams),
    responses(
        (status = 200, description = "Eligibility record", body = EligibilityRecord),
        (status = 400, description = "Email missing", body = crate::errors::ErrorResponse)
    ),
    tag = "Discount"
)]
pub async fn survey_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = params
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ServiceError::ValidationError("email is required".into()))?;

    let record = state.services.eligibility.status(email).await?;
    Ok(success_response(record))
}
