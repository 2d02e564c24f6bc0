use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Survey event type that unlocks the discount
const SURVEY_COMPLETED: &str = "survey_completed";

/// Discount granted on survey completion
const SURVEY_DISCOUNT_PERCENT: i64 = 10;

const PENDING_PREFIX: &str = "survey:pending:";
const DISCOUNT_PREFIX: &str = "discount:email:";

/// Minimal keyed store behind the eligibility state. In-process by default;
/// the trait keeps the backing swappable for a real store without touching
/// the service.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Concurrency-safe in-process store. Single-key operations only; nothing in
/// the eligibility flow needs a cross-key transaction.
#[derive(Default)]
pub struct InMemoryStore {
    map: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.map.remove(key);
        Ok(())
    }
}

/// Per-email discount state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EligibilityRecord {
    pub eligible: bool,
    pub percent: i64,
}

impl Default for EligibilityRecord {
    fn default() -> Self {
        Self {
            eligible: false,
            percent: 0,
        }
    }
}

/// Handle returned on survey start: the generated user id plus the public
/// token the survey widget embeds.
#[derive(Debug, Clone, Serialize)]
pub struct SurveySession {
    pub user_id: String,
    pub public_token: String,
}

/// Outcome of a survey-completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Eligibility written for the associated email
    Updated,
    /// Known session, but the event type does not unlock anything
    Ignored,
    /// No pending record for this session id
    UnknownSession,
}

/// Survey-based discount eligibility.
///
/// Pending sessions are keyed by a generated id and map to an email; the
/// eligibility table is keyed by lowercase-normalized email. Records live for
/// the process lifetime and are never expired.
pub struct EligibilityService {
    store: Arc<dyn KeyValueStore>,
    public_token: String,
}

impl EligibilityService {
    pub fn new(store: Arc<dyn KeyValueStore>, public_token: Option<String>) -> Self {
        Self {
            store,
            public_token: public_token.unwrap_or_default(),
        }
    }

    /// Registers a pending survey for the email and hands back the widget
    /// credentials.
    #[instrument(skip(self, email))]
    pub async fn start(&self, email: &str) -> Result<SurveySession, ServiceError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::ValidationError("email is required".into()));
        }

        let user_id = Uuid::new_v4().to_string();
        self.store
            .set(&format!("{PENDING_PREFIX}{user_id}"), email)
            .await?;

        info!(%user_id, "survey session started");
        Ok(SurveySession {
            user_id,
            public_token: self.public_token.clone(),
        })
    }

    /// Applies a survey-completion callback. Unknown sessions and unrelated
    /// event types are soft outcomes, not errors: the survey vendor only
    /// needs an acknowledgment.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        user_id: &str,
        event_type: &str,
    ) -> Result<CompletionOutcome, ServiceError> {
        let pending_key = format!("{PENDING_PREFIX}{user_id}");
        let Some(email) = self.store.get(&pending_key).await? else {
            warn!(%user_id, "survey completion for unknown session");
            return Ok(CompletionOutcome::UnknownSession);
        };

        if event_type != SURVEY_COMPLETED {
            info!(%event_type, "ignoring survey event");
            return Ok(CompletionOutcome::Ignored);
        }

        let record = EligibilityRecord {
            eligible: true,
            percent: SURVEY_DISCOUNT_PERCENT,
        };
        let value = serde_json::to_string(&record)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        self.store
            .set(&format!("{DISCOUNT_PREFIX}{email}"), value)
            .await?;

        info!("discount eligibility granted");
        Ok(CompletionOutcome::Updated)
    }

    /// Current eligibility for an email; defaults to not-eligible.
    #[instrument(skip(self, email))]
    pub async fn status(&self, email: &str) -> Result<EligibilityRecord, ServiceError> {
        let email = normalize_email(email);
        let Some(value) = self.store.get(&format!("{DISCOUNT_PREFIX}{email}")).await? else {
            return Ok(EligibilityRecord::default());
        };

        match serde_json::from_str(&value) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(error = %e, "corrupt eligibility record; reporting default");
                Ok(EligibilityRecord::default())
            }
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
