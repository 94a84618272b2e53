//! # Auth Services
//!
//! This crate provides the authentication subsystem for the application.
//! It verifies credentials, registers users, and converts identities to and from
//! the reference stored in the session.

/// User persistence behind a repository trait.
pub mod repository;
/// Credential verification and identity (de)serialization.
pub mod service;
/// Types and structures used in authentication services.
pub mod types;

pub use repository::{MemoryUserRepository, PgUserRepository, UserRepository};
pub use service::AuthService;
pub use types::{AuthError, Identity, LoginRequest, RegisterRequest};
