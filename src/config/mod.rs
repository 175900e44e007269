use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub booking: BookingConfig,
    pub features: FeatureFlags,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: String,
    /// Внешний адрес сервиса, из него собирается ссылка проверки билета в QR.
    pub public_base_url: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

// Настройки почты. Без SMTP_HOST письма только пишутся в лог.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

// Правила бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub cancellation_window_minutes: i64,
    pub seat_cache_ttl_seconds: u64,
}

// Feature flags для включения/выключения функциональности
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_seat_cache: bool,
    pub enable_email: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parsed_or("PORT", 8000u16)?;
        let smtp_username = optional("SMTP_USERNAME").unwrap_or_default();

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: optional("REDIS_URL"),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
            },
            mail: MailConfig {
                smtp_host: optional("SMTP_HOST"),
                smtp_port: parsed_or("SMTP_PORT", 587)?,
                from_email: optional("MAIL_FROM").unwrap_or_else(|| smtp_username.clone()),
                smtp_username,
                smtp_password: optional("SMTP_PASSWORD").unwrap_or_default(),
                from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Cinema Booking".to_string()),
            },
            booking: BookingConfig {
                cancellation_window_minutes: parsed_or("CANCELLATION_WINDOW_MINUTES", 60)?,
                seat_cache_ttl_seconds: parsed_or("SEAT_CACHE_TTL_SECONDS", 60)?,
            },
            features: FeatureFlags {
                enable_seat_cache: parsed_or("ENABLE_SEAT_CACHE", true)?,
                enable_email: parsed_or("ENABLE_EMAIL", true)?,
            },
        })
    }
}
