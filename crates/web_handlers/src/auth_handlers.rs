use actix_web::{HttpResponse, Result, web};

use auth_services::{AuthError, LoginRequest, RegisterRequest};
use session_services::Session;

use crate::app::AppState;
use crate::context::{Flash, RequestContext};
use crate::error::AppError;
use crate::views::{self, redirect};

/// Only same-site paths are followed after login.
fn safe_return_to(path: Option<String>) -> String {
    path.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.starts_with("/\\"))
        .unwrap_or_else(|| "/campgrounds".to_string())
}

/// Renders the registration form.
pub async fn register_form(ctx: RequestContext) -> HttpResponse {
    views::html(views::register(&ctx))
}

/// Creates an account and logs the new user in.
pub async fn register(
    state: web::Data<AppState>,
    session: Session,
    flash: Flash,
    form: web::Form<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    match state.auth.register(&form).await {
        Ok(identity) => {
            session.log_in(state.auth.serialize(&identity));
            flash.success("Welcome to Yelp Camp!");
            Ok(redirect("/campgrounds"))
        }
        Err(e) if e.is_user_facing() => {
            flash.error(e.to_string());
            Ok(redirect("/register"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Renders the login form.
pub async fn login_form(ctx: RequestContext) -> HttpResponse {
    views::html(views::login(&ctx))
}

/// Verifies credentials and binds the user to the session.
///
/// On success the visitor goes back to the page that asked them to sign in,
/// or to the campground list.
pub async fn login(
    state: web::Data<AppState>,
    session: Session,
    flash: Flash,
    form: web::Form<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    match state.auth.verify(&form.username, &form.password).await {
        Ok(identity) => {
            let destination = safe_return_to(session.take_return_to());
            session.log_in(state.auth.serialize(&identity));
            flash.success("Welcome back!");
            log::info!("🔑 {} logged in", identity.username);
            Ok(redirect(&destination))
        }
        Err(AuthError::InvalidCredentials) => {
            flash.error(AuthError::InvalidCredentials.to_string());
            Ok(redirect("/login"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Ends the login and rotates the session.
pub async fn logout(session: Session, flash: Flash) -> HttpResponse {
    session.log_out();
    flash.success("Goodbye!");
    redirect("/campgrounds")
}
