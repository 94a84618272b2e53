//! # Session Services
//!
//! Server-side sessions for the Yelp Camp site: a signed `session` cookie carries
//! an opaque id, the session document lives in a [`SessionStore`], and the
//! [`SessionMiddleware`] binds a typed [`Session`] handle to every request.

/// HMAC-SHA256 signing of the session id carried in the cookie.
pub mod cookie;
/// One-shot flash message queues stored in the session.
pub mod flash;
/// Actix middleware loading and persisting the session around each request.
pub mod middleware;
/// Postgres-backed session store.
pub mod postgres_store;
/// Request-bound session handle and extractor.
pub mod session;
/// Session store trait and the in-memory implementation.
pub mod store;
/// Session records, configuration and errors.
pub mod types;

pub use cookie::CookieSigner;
pub use flash::{FlashKind, FlashQueues};
pub use middleware::SessionMiddleware;
pub use postgres_store::PgSessionStore;
pub use session::{Session, SessionExt};
pub use store::{MemorySessionStore, SessionStore};
pub use types::{SessionConfig, SessionError, SessionId, SessionRecord, SessionState};
