use crate::error::{GenerateError, StoreError};
use crate::generate::SummaryConstraints;
use crate::models::SessionRecord;
use async_trait::async_trait;

/// Opaque generative capability. Failures collapse into [`GenerateError`]
/// and are degraded at the chat-turn boundary, never surfaced as faults.
#[async_trait]
pub trait Generate {
    async fn summarize(
        &self,
        text: &str,
        constraints: &SummaryConstraints,
    ) -> Result<String, GenerateError>;

    async fn answer(&self, context: &str, question: &str) -> Result<String, GenerateError>;

    async fn explain(&self, context: &str, instruction: &str) -> Result<String, GenerateError>;
}

/// Durable tier of the session store. Write-once at session creation;
/// conversational state never reaches it.
#[async_trait]
pub trait DurableStore {
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;
}
