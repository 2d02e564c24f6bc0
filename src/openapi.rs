use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Revshot API",
        version = "0.2.0",
        description = r#"
# Revshot Checkout API

Backend for the Revshot upsell rack: accepts a storefront cart total plus
selected marketplace add-ons, opens a hosted Stripe Checkout session for the
combined total, and emails an itemized receipt once the signed
payment-completion webhook arrives. A parallel flow grants a discount after
an external survey is completed.

## Error Handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "No valid items for checkout",
  "timestamp": "2025-06-09T10:30:00Z"
}
```
        "#,
        contact(
            name = "Revshot Support",
            email = "support@revshot.io"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Checkout session creation"),
        (name = "Catalog", description = "Upsell catalog endpoints"),
        (name = "Webhooks", description = "Payment provider notifications"),
        (name = "Discount", description = "Survey-based discount eligibility")
    ),
    paths(
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::products::list_products,
        crate::handlers::webhooks::stripe_webhook,
        crate::handlers::discount::start_survey,
        crate::handlers::discount::survey_callback,
        crate::handlers::discount::survey_status,
    ),
    components(
        schemas(
            crate::services::order_assembly::OrderRequest,
            crate::handlers::checkout::CheckoutResponse,
            crate::services::catalog::CatalogItem,
            crate::handlers::discount::StartSurveyRequest,
            crate::handlers::discount::StartSurveyResponse,
            crate::handlers::discount::SurveyCallbackRequest,
            crate::services::eligibility::EligibilityRecord,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
