//! Test utilities: in-memory stores, app parts, cookie and body helpers.

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{
    body::{MessageBody, to_bytes},
    cookie::Cookie,
    dev::ServiceResponse,
    http::header::{CONTENT_TYPE, LOCATION},
    test::TestRequest,
};

use auth_services::{AuthService, Identity, MemoryUserRepository, RegisterRequest};
use campgrounds::{CampgroundRepository, MemoryCampgroundRepository};
use session_services::{MemorySessionStore, SessionConfig};
use web_handlers::{
    AppState, PipelineSettings,
    security::{ContentSecurityPolicy, SecurityHeaders},
};

pub const PASSWORD: &str = "monkey123";

/// Everything needed to build the app, plus handles on the in-memory stores.
pub struct TestParts {
    pub state: AppState,
    pub settings: PipelineSettings,
    pub users: Arc<MemoryUserRepository>,
    pub campgrounds: Arc<MemoryCampgroundRepository>,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestParts {
    pub fn new() -> Self {
        let campgrounds = Arc::new(MemoryCampgroundRepository::new());
        let mut parts = Self::with_campgrounds(campgrounds.clone());
        parts.campgrounds = campgrounds;
        parts
    }

    /// Parts whose handlers use `repository` instead of the in-memory one.
    pub fn with_campgrounds(repository: Arc<dyn CampgroundRepository>) -> Self {
        let users = Arc::new(MemoryUserRepository::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let state = AppState {
            auth: AuthService::with_hash_cost(users.clone(), 4),
            campgrounds: repository,
        };
        let settings = PipelineSettings {
            session_store: sessions.clone(),
            session_secret: b"test-secret-that-is-long-enough".to_vec(),
            session: SessionConfig::default(),
            security: SecurityHeaders::new(&ContentSecurityPolicy::default()).unwrap(),
            static_dir: None,
        };

        Self {
            state,
            settings,
            users,
            campgrounds: Arc::new(MemoryCampgroundRepository::new()),
            sessions,
        }
    }

    /// Registers `username` directly through the auth service.
    pub async fn create_user(&self, username: &str) -> Identity {
        let identity = self
            .state
            .auth
            .register(&RegisterRequest {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        self.campgrounds
            .register_author(identity.id, identity.username.clone());
        identity
    }
}

/// A form POST, optionally carrying a session cookie.
pub fn form_post(uri: &str, body: &str, cookie: Option<&Cookie<'static>>) -> TestRequest {
    with_cookie(
        TestRequest::post()
            .uri(uri)
            .insert_header((CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload(body.to_string()),
        cookie,
    )
}

/// A GET, optionally carrying a session cookie.
pub fn get(uri: &str, cookie: Option<&Cookie<'static>>) -> TestRequest {
    with_cookie(TestRequest::get().uri(uri), cookie)
}

fn with_cookie(req: TestRequest, cookie: Option<&Cookie<'static>>) -> TestRequest {
    match cookie {
        Some(cookie) => req.cookie(cookie.clone()),
        None => req,
    }
}

/// The `session` cookie set by `res`, if any.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(|cookie| cookie.into_owned())
}

/// The cookie to send next: the one `res` set, or `previous`.
pub fn next_cookie<B>(res: &ServiceResponse<B>, previous: &Cookie<'static>) -> Cookie<'static> {
    session_cookie(res).unwrap_or_else(|| previous.clone())
}

/// The redirect target of `res`.
pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text<B: MessageBody>(res: ServiceResponse<B>) -> String {
    let bytes = to_bytes(res.into_body())
        .await
        .unwrap_or_else(|_| panic!("failed to read body"));
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Form body for logging `username` in with the shared test password.
pub fn login_body(username: &str) -> String {
    format!("username={}&password={}", username, PASSWORD)
}
