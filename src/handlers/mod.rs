pub mod checkout;
pub mod common;
pub mod discount;
pub mod products;
pub mod webhooks;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::catalog::CatalogReader;
use crate::services::eligibility::{EligibilityService, InMemoryStore};
use crate::services::mailer::Mailer;
use crate::services::receipt::ReceiptBuilder;
use crate::services::stripe_gateway::{FeeSplit, StripeGateway};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogReader>,
    pub gateway: Arc<StripeGateway>,
    pub receipts: Arc<ReceiptBuilder>,
    pub mailer: Arc<Mailer>,
    pub eligibility: Arc<EligibilityService>,
    /// Connected-account fee split applied to every session when configured
    pub fee_split: Option<FeeSplit>,
}

impl AppServices {
    /// Build the service container with the in-process eligibility store.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let gateway = Arc::new(StripeGateway::new(config));
        let receipts = Arc::new(ReceiptBuilder::new(gateway.clone()));
        let mailer = Arc::new(Mailer::from_config(config)?);
        let eligibility = Arc::new(EligibilityService::new(
            Arc::new(InMemoryStore::new()),
            config.survey_public_token.clone(),
        ));
        let catalog = Arc::new(CatalogReader::new(&config.catalog_csv_path));

        let fee_split = match (
            config.application_fee_amount,
            config.fee_destination_account.as_ref(),
        ) {
            (Some(application_fee_amount), Some(account)) => Some(FeeSplit {
                application_fee_amount,
                destination_account: account.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            catalog,
            gateway,
            receipts,
            mailer,
            eligibility,
            fee_split,
        })
    }
}
