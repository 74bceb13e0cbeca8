use crate::error::StoreError;
use crate::models::{Session, SessionRecord, Slide};
use crate::traits::DurableStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared handle to one session. The inner mutex serializes chat turns and
/// bullet mutations per session id.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Two-tier session store: a transient in-process cache over a durable
/// write-once record.
///
/// Consistency contract: the durable tier is an ingestion-time snapshot;
/// the cache is authoritative for conversational state. Reads go cache
/// first; a miss consults the durable store and reconstructs a transient
/// entry with an empty chat history. Mutations of transient fields
/// (bullets, running summary, chat history) never reach the durable tier.
pub struct SessionStore<D: DurableStore> {
    cache: RwLock<HashMap<String, SessionHandle>>,
    durable: D,
}

impl<D: DurableStore> SessionStore<D> {
    pub fn new(durable: D) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            durable,
        }
    }

    /// Create a session from ingestion results: persist the durable
    /// snapshot, mirror it into the cache, return the new opaque id.
    pub async fn create(
        &self,
        raw_text: String,
        summary_text: String,
        slides: Vec<Slide>,
        owner: Option<String>,
    ) -> Result<String, StoreError> {
        let session_id = Uuid::new_v4().to_string();

        let record = SessionRecord {
            session_id: session_id.clone(),
            owner: owner.clone(),
            raw_text: raw_text.clone(),
            summary_text: if summary_text.is_empty() {
                None
            } else {
                Some(summary_text.clone())
            },
            slides: slides.clone(),
            created_at: Utc::now(),
        };
        self.durable.save(&record).await?;

        let session = Session {
            id: session_id.clone(),
            raw_text,
            running_summary: summary_text,
            slides,
            chat_history: Vec::new(),
            owner,
        };
        self.cache
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));

        debug!(session_id = %session_id, "session created");
        Ok(session_id)
    }

    /// Cache-aside read. A corrupt durable record is a safe miss, never a
    /// partial session; backend unavailability propagates.
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionHandle>, StoreError> {
        if let Some(handle) = self.cache.read().await.get(session_id) {
            return Ok(Some(handle.clone()));
        }

        let record = match self.durable.load(session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(StoreError::Serialization(error)) => {
                warn!(session_id, %error, "durable record is corrupt; reporting a miss");
                return Ok(None);
            }
            Err(StoreError::Corrupt(details)) => {
                warn!(session_id, %details, "durable record is corrupt; reporting a miss");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        debug!(session_id, "reconstructing session from durable record");
        let handle = Arc::new(Mutex::new(Session::from(record)));

        let mut cache = self.cache.write().await;
        let handle = cache
            .entry(session_id.to_string())
            .or_insert(handle)
            .clone();
        Ok(Some(handle))
    }

    /// Session ids currently held in the transient tier.
    pub async fn cached_ids(&self) -> Vec<String> {
        self.cache.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStore;
    use crate::models::Slide;
    use crate::stores::SqliteSessionStore;

    fn slides() -> Vec<Slide> {
        vec![Slide {
            page: 1,
            title: "Intro".to_string(),
            text: "welcome text".to_string(),
            bullets: vec!["hello".to_string()],
        }]
    }

    fn store() -> SessionStore<SqliteSessionStore> {
        SessionStore::new(SqliteSessionStore::open_in_memory().expect("in-memory store"))
    }

    #[tokio::test]
    async fn created_session_reads_back_with_empty_history() {
        let store = store();
        let id = store
            .create("raw".to_string(), "summary".to_string(), slides(), None)
            .await
            .expect("create should succeed");

        let handle = store
            .get(&id)
            .await
            .expect("get should succeed")
            .expect("session should exist");
        let session = handle.lock().await;

        assert_eq!(session.id, id);
        assert_eq!(session.running_summary, "summary");
        assert_eq!(session.slides, slides());
        assert!(session.chat_history.is_empty());
        assert_eq!(store.cached_ids().await, vec![id.clone()]);
    }

    #[tokio::test]
    async fn unknown_id_is_a_miss() {
        let store = store();
        assert!(store
            .get("no-such-session")
            .await
            .expect("get should succeed")
            .is_none());
    }

    #[tokio::test]
    async fn transient_mutations_survive_repeated_reads_but_not_reconstruction() {
        let durable = SqliteSessionStore::open_in_memory().expect("in-memory store");
        let store = SessionStore::new(durable);
        let id = store
            .create("raw".to_string(), String::new(), slides(), None)
            .await
            .expect("create should succeed");

        {
            let handle = store
                .get(&id)
                .await
                .expect("get should succeed")
                .expect("session should exist");
            handle.lock().await.record_turn("hi", "hello there");
        }

        // Same cache entry: the turn is still visible.
        let handle = store
            .get(&id)
            .await
            .expect("get should succeed")
            .expect("session should exist");
        assert_eq!(handle.lock().await.chat_history.len(), 1);
    }

    #[tokio::test]
    async fn reconstruction_after_restart_drops_chat_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("sessions.db");

        let first = SessionStore::new(
            SqliteSessionStore::open(&db_path).expect("file-backed store"),
        );
        let id = first
            .create("raw".to_string(), "summary".to_string(), slides(), None)
            .await
            .expect("create should succeed");
        {
            let handle = first
                .get(&id)
                .await
                .expect("get should succeed")
                .expect("session should exist");
            handle.lock().await.record_turn("hi", "hello");
        }
        drop(first);

        let second = SessionStore::new(
            SqliteSessionStore::open(&db_path).expect("file-backed store"),
        );
        let handle = second
            .get(&id)
            .await
            .expect("get should succeed")
            .expect("session should be reconstructed");
        let session = handle.lock().await;

        assert_eq!(session.running_summary, "summary");
        assert_eq!(session.slides, slides());
        assert!(session.chat_history.is_empty());
    }

    #[tokio::test]
    async fn owner_round_trips_through_the_durable_tier() {
        let store = store();
        let id = store
            .create(
                "raw".to_string(),
                "s".to_string(),
                slides(),
                Some("user-7".to_string()),
            )
            .await
            .expect("create should succeed");

        let handle = store
            .get(&id)
            .await
            .expect("get should succeed")
            .expect("session should exist");
        assert_eq!(handle.lock().await.owner.as_deref(), Some("user-7"));
    }
}
