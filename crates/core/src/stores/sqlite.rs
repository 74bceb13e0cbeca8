use crate::error::StoreError;
use crate::models::SessionRecord;
use crate::traits::DurableStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed durable tier. One row per session; slides travel as a
/// JSON column. Queries are short and run under a connection mutex.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                owner TEXT,
                raw_text TEXT NOT NULL,
                summary_text TEXT,
                slides_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl DurableStore for SqliteSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let slides_json = serde_json::to_string(&record.slides)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO sessions (id, owner, raw_text, summary_text, slides_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.session_id,
                record.owner,
                record.raw_text,
                record.summary_text,
                slides_json,
                record.created_at.to_rfc3339(),
            ],
        )?;

        debug!(session_id = %record.session_id, "session record saved");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, owner, raw_text, summary_text, slides_json, created_at
            FROM sessions WHERE id = ?1
            "#,
        )?;
        let mut rows = stmt.query(params![session_id])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let slides_json: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(Some(SessionRecord {
            session_id: row.get(0)?,
            owner: row.get(1)?,
            raw_text: row.get(2)?,
            summary_text: row.get(3)?,
            slides: serde_json::from_str(&slides_json)?,
            created_at: parse_timestamp(&created_at)?,
        }))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|error| StoreError::Corrupt(format!("bad created_at {raw:?}: {error}")))
}

#[cfg(test)]
mod tests {
    use super::SqliteSessionStore;
    use crate::models::{SessionRecord, Slide};
    use crate::traits::DurableStore;
    use chrono::Utc;
    use rusqlite::params;

    fn record(id: &str) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            owner: None,
            raw_text: "all the slide text".to_string(),
            summary_text: Some("summary".to_string()),
            slides: vec![Slide {
                page: 1,
                title: "Intro".to_string(),
                text: "welcome".to_string(),
                bullets: vec!["point".to_string()],
            }],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_record() {
        let store = SqliteSessionStore::open_in_memory().expect("in-memory store");
        store.save(&record("s-1")).await.expect("save should succeed");

        let loaded = store
            .load("s-1")
            .await
            .expect("load should succeed")
            .expect("record should exist");

        assert_eq!(loaded.session_id, "s-1");
        assert_eq!(loaded.summary_text.as_deref(), Some("summary"));
        assert_eq!(loaded.slides.len(), 1);
        assert_eq!(loaded.slides[0].bullets, vec!["point".to_string()]);
    }

    #[tokio::test]
    async fn missing_id_loads_as_none() {
        let store = SqliteSessionStore::open_in_memory().expect("in-memory store");
        assert!(store
            .load("absent")
            .await
            .expect("load should succeed")
            .is_none());
    }

    #[tokio::test]
    async fn corrupt_slides_column_is_an_error_not_a_record() {
        let store = SqliteSessionStore::open_in_memory().expect("in-memory store");
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO sessions (id, owner, raw_text, summary_text, slides_json, created_at)
                 VALUES (?1, NULL, 'raw', NULL, 'not json', ?2)",
                params!["bad", Utc::now().to_rfc3339()],
            )
            .expect("seed row should insert");
        }

        assert!(store.load("bad").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = SqliteSessionStore::open_in_memory().expect("in-memory store");
        store.save(&record("dup")).await.expect("first save succeeds");
        assert!(store.save(&record("dup")).await.is_err());
    }
}
