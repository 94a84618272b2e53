use std::path::PathBuf;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::from_fn,
    web,
};

use auth_services::AuthService;
use campgrounds::CampgroundRepository;
use session_services::{SessionConfig, SessionMiddleware, SessionStore};

use crate::error::{AppError, NOT_FOUND_MESSAGE};
use crate::security::SecurityHeaders;
use crate::{
    auth_handlers, authenticate, campground_handlers, context, error_page, review_handlers,
    sanitize, views,
};

/// Services shared by every handler, registered as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Registration, credential checks and identity lookups
    pub auth: AuthService,
    /// Campground and review storage
    pub campgrounds: Arc<dyn CampgroundRepository>,
}

/// Settings for the stages wrapped around the router.
#[derive(Clone)]
pub struct PipelineSettings {
    /// Where session documents are kept
    pub session_store: Arc<dyn SessionStore>,
    /// Key signing the session cookie
    pub session_secret: Vec<u8>,
    /// Session cookie settings
    pub session: SessionConfig,
    /// Headers added by the security headers stage
    pub security: SecurityHeaders,
    /// Directory served under `/public`, if any
    pub static_dir: Option<PathBuf>,
}

async fn home(ctx: context::RequestContext) -> actix_web::HttpResponse {
    views::html(views::home(&ctx))
}

/// Registers the auth, campground and review route groups.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/register", web::get().to(auth_handlers::register_form))
        .route("/register", web::post().to(auth_handlers::register))
        .route("/login", web::get().to(auth_handlers::login_form))
        .route("/login", web::post().to(auth_handlers::login))
        .route("/logout", web::get().to(auth_handlers::logout))
        .service(
            web::scope("/campgrounds")
                .route("", web::get().to(campground_handlers::index))
                .route("", web::post().to(campground_handlers::create))
                .route("/new", web::get().to(campground_handlers::new_form))
                .route("/{id}", web::get().to(campground_handlers::show))
                .route("/{id}", web::post().to(campground_handlers::update))
                .route("/{id}/edit", web::get().to(campground_handlers::edit_form))
                .route("/{id}/delete", web::post().to(campground_handlers::delete))
                .route("/{id}/reviews", web::post().to(review_handlers::create))
                .route(
                    "/{id}/reviews/{review_id}/delete",
                    web::post().to(review_handlers::delete),
                ),
        );
}

/// Builds the application with its stages in pipeline order.
///
/// Actix runs the last `wrap` first, so the stages are registered from the
/// innermost (context) to the outermost (error handler):
///
/// sanitize → session → security headers → authenticate → flash → context →
/// router → not found → error handler
pub fn build_app(
    state: AppState,
    settings: PipelineSettings,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let static_dir = settings.static_dir.clone();

    App::new()
        .app_data(web::Data::new(state))
        .app_data(
            web::PathConfig::default()
                .error_handler(|_, _| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()).into()),
        )
        .app_data(
            web::FormConfig::default()
                .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
        )
        .configure(|cfg| {
            if let Some(dir) = static_dir {
                cfg.service(Files::new("/public", dir));
            }
        })
        .configure(configure_routes)
        .default_service(web::to(error_page::not_found))
        .wrap(from_fn(context::bind_context))
        .wrap(from_fn(context::bind_flash))
        .wrap(from_fn(authenticate::authenticate))
        .wrap(settings.security.middleware())
        .wrap(SessionMiddleware::new(
            settings.session_store,
            &settings.session_secret,
            settings.session,
        ))
        .wrap(from_fn(sanitize::sanitize))
        .wrap(error_page::error_handlers())
}
