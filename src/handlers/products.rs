use axum::{extract::State, Json};

use crate::errors::ServiceError;
use crate::services::catalog::CatalogItem;
use crate::AppState;

/// Upsell catalog passthrough. Always reads the source fresh; row failures
/// already degraded to skips inside the reader.
// GET /api/products (also mounted as /api/enhancements)
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "Catalog items", body = Vec<CatalogItem>),
        (status = 500, description = "Catalog read failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogItem>>, ServiceError> {
    let catalog = state.services.catalog.clone();
    let items = tokio::task::spawn_blocking(move || catalog.load())
        .await
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;
    Ok(Json(items))
}
