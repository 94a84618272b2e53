use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Form submitted to create an account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Public username, also used to log in
    #[validate(
        length(max = 64, message = "Username is too long"),
        custom(function = "not_blank", message = "Username is required")
    )]
    pub username: String,

    /// Email address of the user
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    /// Password for the user account
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Form submitted to log in
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username of the account
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password for the user account
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User model representing the database schema
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,
    /// Public username
    pub username: String,
    /// Email address of the user
    pub email: String,
    /// Bcrypt hash of the user's password
    pub password_hash: String,
    /// Timestamp when the user was created
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Public username
    pub username: String,
    /// Normalized email address
    pub email: String,
    /// Bcrypt hash of the password
    pub password_hash: String,
}

/// The authenticated user as seen by handlers and views.
///
/// Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Unique identifier for the user
    pub id: Uuid,
    /// Public username
    pub username: String,
    /// Email address of the user
    pub email: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Custom error type for authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The username is already registered
    #[error("A user with the given username is already registered")]
    UsernameTaken,

    /// The email address already exists in the system
    #[error("An account with this email already exists")]
    EmailTaken,

    /// The provided credentials are invalid; never says which part was wrong
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An error occurred while hashing the password
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// The blocking task running bcrypt panicked or was cancelled
    #[error("Password hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),

    /// An error occurred while validating input data
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AuthError {
    /// Whether the message is safe to show back to the visitor.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AuthError::UsernameTaken
                | AuthError::EmailTaken
                | AuthError::InvalidCredentials
                | AuthError::Validation(_)
        )
    }
}

/// Custom validation rejecting whitespace-only values
fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
