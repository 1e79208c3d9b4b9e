use std::{env, fmt::Display, ops::RangeInclusive};

/// One hour up to one year
const SESSION_TTL_HOURS_RANGE: RangeInclusive<i64> = 1..=8760;
/// One minute up to one week
const VERIFY_CODE_TTL_SECS_RANGE: RangeInclusive<i64> = 60..=604_800;
const RESEND_COOLDOWN_SECS_RANGE: RangeInclusive<i64> = 0..=86_400;

/// Storage engine behind the `UserStore` trait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("Invalid STORAGE_BACKEND: {}. Supported: mongo, memory", other)),
        }
    }
}

/// Runtime configuration, read once at startup and shared through `web::Data`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub session_ttl_hours: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
    /// Observed behavior of the reply endpoint is to overwrite silently.
    pub allow_reply_overwrite: bool,
    pub verify_code_ttl_secs: i64,
    pub resend_cooldown_secs: i64,
    pub bcrypt_cost: u32,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageBackend::Mongo,
            database_url: None,
            jwt_secret: "default-secret-change-me".to_string(),
            jwt_issuer: "anony-exchange".to_string(),
            jwt_audience: "anony-exchange-web".to_string(),
            session_ttl_hours: 24,
            cookie_name: "session-token".to_string(),
            cookie_secure: false,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            allow_reply_overwrite: true,
            verify_code_ttl_secs: 3600,
            resend_cooldown_secs: 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            mail_relay_url: None,
            mail_from: "AnonyExchange <no-reply@anony-exchange.local>".to_string(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        let defaults = AppConfig::default();

        let storage = match env::var("STORAGE_BACKEND") {
            Ok(value) => StorageBackend::parse(&value)?,
            Err(_) => defaults.storage,
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if storage == StorageBackend::Mongo && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORAGE_BACKEND=mongo".to_string());
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.cors_origins);

        let bcrypt_cost = in_range("BCRYPT_COST", parse_var("BCRYPT_COST", defaults.bcrypt_cost)?, 4..=31)?;
        let session_ttl_hours = in_range(
            "SESSION_TTL_HOURS",
            parse_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            SESSION_TTL_HOURS_RANGE,
        )?;
        let verify_code_ttl_secs = in_range(
            "VERIFY_CODE_TTL_SECS",
            parse_var("VERIFY_CODE_TTL_SECS", defaults.verify_code_ttl_secs)?,
            VERIFY_CODE_TTL_SECS_RANGE,
        )?;
        let resend_cooldown_secs = in_range(
            "RESEND_COOLDOWN_SECS",
            parse_var("RESEND_COOLDOWN_SECS", defaults.resend_cooldown_secs)?,
            RESEND_COOLDOWN_SECS_RANGE,
        )?;

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            storage,
            database_url,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            session_ttl_hours,
            cookie_name: env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            cookie_secure: parse_flag("COOKIE_SECURE", defaults.cookie_secure),
            cors_origins,
            allow_reply_overwrite: parse_flag("ALLOW_REPLY_OVERWRITE", defaults.allow_reply_overwrite),
            verify_code_ttl_secs,
            resend_cooldown_secs,
            bcrypt_cost,
            mail_relay_url: env::var("MAIL_RELAY_URL").ok().filter(|s| !s.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or(defaults.mail_from),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value for {}: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn in_range<T: PartialOrd + Display>(name: &str, value: T, range: RangeInclusive<T>) -> Result<T, String> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} must be between {} and {}, got {}",
            name,
            range.start(),
            range.end(),
            value
        ))
    }
}

fn parse_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Err(_) => default,
    }
}
