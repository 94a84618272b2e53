use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_IMAGE_HOST: &str = "https://res.cloudinary.com/";
const PUBLIC_DIR: &str = "./public";

/// Errors found while reading configuration at startup
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable could not be parsed
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// The rejected value
        value: String,
        /// What was expected instead
        expected: &'static str,
    },
}

/// Server configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Session cookie signing secret (`SECRET`)
    pub secret: String,
    /// Bind address (`HOST`)
    pub host: String,
    /// Listening port (`PORT`)
    pub port: u16,
    /// Mark the session cookie `Secure` (`COOKIE_SECURE`)
    pub cookie_secure: bool,
    /// Image CDN allowed by the content security policy (`IMAGE_HOST`)
    pub image_host: String,
    /// Directory served under `/public`, when it exists
    pub public_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
                expected: "port number",
            })?,
            None => DEFAULT_PORT,
        };

        let cookie_secure = match get("COOKIE_SECURE") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "COOKIE_SECURE",
                value,
                expected: "boolean",
            })?,
            None => false,
        };

        let public_dir = PathBuf::from(PUBLIC_DIR);

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            secret: require("SECRET")?,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            cookie_secure,
            image_host: get("IMAGE_HOST").unwrap_or_else(|| DEFAULT_IMAGE_HOST.to_string()),
            public_dir: public_dir.is_dir().then_some(public_dir),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
