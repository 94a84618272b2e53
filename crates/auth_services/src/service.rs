use std::sync::Arc;

use bcrypt::{BcryptError, DEFAULT_COST, hash, verify};
use uuid::Uuid;
use validator::Validate;

use crate::repository::UserRepository;
use crate::types::{AuthError, Identity, NewUser, RegisterRequest};

/// A service for handling user authentication operations: registering users,
/// verifying credentials, and converting identities to and from the reference
/// kept in the session.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hash_cost: u32,
}

impl AuthService {
    /// Creates a new instance of `AuthService` over the provided user repository.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self::with_hash_cost(users, DEFAULT_COST)
    }

    /// Creates a service hashing passwords with an explicit bcrypt cost.
    pub fn with_hash_cost(users: Arc<dyn UserRepository>, hash_cost: u32) -> Self {
        Self { users, hash_cost }
    }

    /// Registers a new user and returns its identity.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Identity, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password = request.password.clone();
        let cost = self.hash_cost;
        let password_hash = run_bcrypt(move || hash(password, cost)).await?;

        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        log::info!("👤 Registered user {}", user.username);
        Ok(Identity::from(&user))
    }

    /// Verifies a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both fail with
    /// [`AuthError::InvalidCredentials`], after the same amount of bcrypt work.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let password = password.to_string();
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            let cost = self.hash_cost;
            run_bcrypt(move || hash(password, cost)).await?;
            return Err(AuthError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        if !run_bcrypt(move || verify(password, &stored)).await? {
            log::warn!("Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity::from(&user))
    }

    /// Produces the reference stored in the session for `identity`.
    pub fn serialize(&self, identity: &Identity) -> Uuid {
        identity.id
    }

    /// Resolves a session reference back to a full identity.
    ///
    /// Returns `None` (anonymous) when the user no longer exists or the lookup
    /// fails, so a broken reference never fails the request.
    pub async fn deserialize(&self, user_id: Uuid) -> Option<Identity> {
        match self.users.find_by_id(&user_id).await {
            Ok(user) => user.as_ref().map(Identity::from),
            Err(e) => {
                log::warn!("Could not resolve session user: {}", e);
                None
            }
        }
    }
}

/// Runs a bcrypt operation on the blocking pool so hashing never stalls the
/// worker serving other requests.
async fn run_bcrypt<T, F>(op: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BcryptError> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(op).await??)
}
