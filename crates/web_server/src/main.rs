//! Main entry point for the Yelp Camp server.
//! Reads configuration, prepares the database and serves the request pipeline.

mod config;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpServer, middleware::Logger};
use auth_services::{AuthService, PgUserRepository};
use campgrounds::PgCampgroundRepository;
use postgres::database::*;
use session_services::{PgSessionStore, SessionConfig, SessionStore};
use web_handlers::{
    AppState, Pipeline, PipelineSettings, build_app,
    security::{ContentSecurityPolicy, SecurityHeaders},
};

use config::AppConfig;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Removes expired session rows once an hour.
fn spawn_session_purge(store: Arc<dyn SessionStore>) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => log::info!("🧹 Purged {} expired sessions", purged),
                Err(e) => log::warn!("Failed to purge expired sessions: {}", e),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting Yelp Camp server...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::standard();
    if let Err(e) = pipeline.validate() {
        log::error!("❌ Invalid request pipeline: {}", e);
        std::process::exit(1);
    }
    log::info!("🔗 Request pipeline: {}", pipeline);

    // Create database connection pool
    let pool = match create_connection_pool(&config.database_url).await {
        Ok(pool) => {
            log::info!("🗃️ Database pool created successfully");

            if let Err(e) = test_connection(&pool).await {
                log::error!("❌ Database connection test failed: {}", e);
            }
            pool
        }
        Err(e) => {
            log::error!("❌ Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        log::error!("❌ Failed to apply migrations: {}", e);
        std::process::exit(1);
    }

    let policy = ContentSecurityPolicy::default().allow_image_host(config.image_host.clone());
    let security = match SecurityHeaders::new(&policy) {
        Ok(security) => security,
        Err(e) => {
            log::error!("❌ IMAGE_HOST can't be sent in a header: {}", e);
            std::process::exit(1);
        }
    };

    let session_store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));
    spawn_session_purge(session_store.clone());

    if !config.cookie_secure {
        log::warn!("🔓 Session cookie is not marked Secure; set COOKIE_SECURE=true behind HTTPS");
    }

    let state = AppState {
        auth: AuthService::new(Arc::new(PgUserRepository::new(pool.clone()))),
        campgrounds: Arc::new(PgCampgroundRepository::new(pool)),
    };
    let settings = PipelineSettings {
        session_store,
        session_secret: config.secret.clone().into_bytes(),
        session: SessionConfig {
            secure: config.cookie_secure,
            ..SessionConfig::default()
        },
        security,
        static_dir: config.public_dir.clone(),
    };

    match &config.public_dir {
        Some(dir) => log::info!("📁 Serving /public from {}", dir.display()),
        None => log::info!("📁 No public directory found, /public is disabled"),
    }
    log::info!(
        "🌐 Server will be available at: http://{}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || build_app(state.clone(), settings.clone()).wrap(Logger::default()))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
