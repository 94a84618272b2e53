use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::store::SessionStore;
use crate::types::{SessionError, SessionId, SessionRecord, SessionState};

/// Session store persisting one JSONB document per session in the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new instance of `PgSessionStore` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let row = sqlx::query(
            r#"
            SELECT document, expires_at, touched_at
            FROM sessions
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: Json<SessionState> = row.try_get("document")?;

        Ok(Some(SessionRecord {
            state: document.0,
            expires_at: row.try_get("expires_at")?,
            touched_at: row.try_get("touched_at")?,
        }))
    }

    async fn save(&self, id: &SessionId, record: &SessionRecord) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, document, expires_at, touched_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET document = EXCLUDED.document,
                expires_at = EXCLUDED.expires_at,
                touched_at = EXCLUDED.touched_at
            "#,
        )
        .bind(id.as_str())
        .bind(Json(&record.state))
        .bind(record.expires_at)
        .bind(record.touched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
        touched_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        sqlx::query("UPDATE sessions SET expires_at = $2, touched_at = $3 WHERE id = $1")
            .bind(id.as_str())
            .bind(expires_at)
            .bind(touched_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
