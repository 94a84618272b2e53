use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flash::FlashQueues;

/// Opaque session identifier. Never reused: every new or renewed session gets a
/// fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a new identifier from 32 random bytes, base64url encoded.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the identifier as stored in the session collection.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_verified(raw: String) -> Self {
        Self(raw)
    }
}

/// Fields carried by a session between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Serialized identity reference of the logged-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,

    /// Pending flash messages
    #[serde(default, skip_serializing_if = "FlashQueues::is_empty")]
    pub flash: FlashQueues,

    /// Page the visitor asked for before being sent to the login form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

/// A session document as persisted in a [`crate::SessionStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session fields
    pub state: SessionState,
    /// Instant after which the record is treated as absent
    pub expires_at: DateTime<Utc>,
    /// Last time the record was written or refreshed
    pub touched_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a record written at `now` that lives for `ttl`.
    pub fn new(state: SessionState, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            state,
            expires_at: now + ttl,
            touched_at: now,
        }
    }

    /// Whether the record has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether an unchanged record is old enough to be refreshed.
    pub fn needs_touch(&self, touch_after: Duration, now: DateTime<Utc>) -> bool {
        now - self.touched_at >= touch_after
    }
}

/// Cookie and persistence settings for the session middleware.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Cookie max-age and record lifetime
    pub max_age: Duration,
    /// An unchanged session is not rewritten more often than this
    pub touch_after: Duration,
    /// Mark the cookie `Secure` (HTTPS only)
    pub secure: bool,
    /// Mark the cookie `HttpOnly`
    pub http_only: bool,
    /// Persist brand-new sessions even when no field was written
    pub save_uninitialized: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            max_age: Duration::days(7),
            touch_after: Duration::hours(24),
            secure: false,
            http_only: true,
            save_uninitialized: true,
        }
    }
}

/// Errors raised while loading, saving or signing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session collection could not be reached
    #[error("Session store error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored session document could not be encoded or decoded
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signing secret was rejected by the MAC
    #[error("Invalid session signing key")]
    InvalidKey,

    /// The `Set-Cookie` header could not be written
    #[error("Session cookie error: {0}")]
    Cookie(#[from] actix_web::error::HttpError),

    /// A handler asked for the session but no session middleware ran
    #[error("Session middleware is not registered for this request")]
    NotBound,
}

impl actix_web::ResponseError for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_record_expiry_and_touch_window() {
        let now = Utc::now();
        let record = SessionRecord::new(SessionState::default(), Duration::days(7), now);

        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::days(7)));
        assert!(!record.needs_touch(Duration::hours(24), now + Duration::hours(23)));
        assert!(record.needs_touch(Duration::hours(24), now + Duration::hours(24)));
    }

    #[test]
    fn test_empty_state_serializes_to_empty_document() {
        let json = serde_json::to_value(SessionState::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let state: SessionState = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(state, SessionState::default());
    }
}
