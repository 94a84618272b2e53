use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::LOCATION};

use auth_services::AuthError;
use campgrounds::CampgroundError;
use session_services::SessionError;

/// Message shown when a server error carries nothing fit for visitors.
pub const GENERIC_ERROR_MESSAGE: &str = "Oh No, Something Went Wrong!";

/// Message shown when no route matched the request.
pub const NOT_FOUND_MESSAGE: &str = "Page Not Found";

/// Errors forwarded by stages and handlers to the terminal error stage.
///
/// Only the status (and, for [`AppError::LoginRequired`], the redirect) is
/// decided here. The page itself is rendered by the error stage, which asks
/// [`AppError::public_message`] what may be shown.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Nothing exists at this address
    #[error("{0}")]
    NotFound(String),

    /// The submitted data was rejected
    #[error("{0}")]
    BadRequest(String),

    /// A protected route was visited anonymously
    #[error("You must be signed in first!")]
    LoginRequired,

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Campground storage or validation error
    #[error("Campground error: {0}")]
    Campground(#[from] CampgroundError),

    /// Session store error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A stage ran without the stage it depends on
    #[error("Request pipeline misconfigured: {0}")]
    Pipeline(&'static str),
}

impl AppError {
    /// Text safe to show the visitor, if the error carries any.
    pub fn public_message(&self) -> Option<String> {
        match self {
            AppError::NotFound(message) | AppError::BadRequest(message) => Some(message.clone()),
            AppError::LoginRequired => Some(self.to_string()),
            AppError::Auth(e) if e.is_user_facing() => Some(e.to_string()),
            AppError::Campground(CampgroundError::Validation(message)) => Some(message.clone()),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::LoginRequired => StatusCode::FOUND,
            AppError::Auth(e) if e.is_user_facing() => StatusCode::BAD_REQUEST,
            AppError::Campground(CampgroundError::Validation(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::LoginRequired => HttpResponse::Found()
                .insert_header((LOCATION, "/login"))
                .finish(),
            _ => HttpResponse::build(self.status_code()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound(NOT_FOUND_MESSAGE.into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Campground(CampgroundError::Validation("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::Database(sqlx_error())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Pipeline("no session").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_not_public() {
        let db = AppError::Campground(CampgroundError::Database(sqlx_error()));
        assert_eq!(db.public_message(), None);
        assert_eq!(AppError::Pipeline("no session").public_message(), None);

        let invalid = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            invalid.public_message().as_deref(),
            Some("Invalid username or password")
        );
    }

    #[test]
    fn test_login_required_redirects() {
        let response = AppError::LoginRequired.error_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    fn sqlx_error() -> sqlx::Error {
        sqlx::Error::PoolTimedOut
    }
}
