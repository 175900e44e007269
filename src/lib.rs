pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod repository;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::config::Config;
use crate::repository::{BookingRepository, CinemaRepository, SeatRepository, ShowtimeRepository};
use crate::services::booking::BookingService;
use crate::services::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::services::ticket::TicketIssuer;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bookings: BookingService,
    pub showtimes: Arc<dyn ShowtimeRepository>,
    pub seats: Arc<dyn SeatRepository>,
    pub cinemas: Arc<dyn CinemaRepository>,
    /// `None`, если Redis не настроен: схема зала всегда читается из БД.
    pub cache: Option<CacheService>,
}

impl AppState {
    /// Подключает БД, Redis и почту по конфигу.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database).await?;
        db.run_migrations().await?;
        info!("Database connected");

        let cache = match (&config.redis.url, config.features.enable_seat_cache) {
            (Some(url), true) => match redis_client::RedisClient::connect(url).await {
                Ok(redis) => Some(CacheService::new(redis, config.booking.seat_cache_ttl_seconds)),
                Err(e) => {
                    warn!("Redis unavailable, seat map cache disabled: {:?}", e);
                    None
                }
            },
            _ => None,
        };

        let mailer: Arc<dyn Mailer> = match (&config.mail.smtp_host, config.features.enable_email) {
            (Some(host), true) => {
                info!("Sending mail through {}", host);
                Arc::new(SmtpMailer::new(host.clone(), &config.mail))
            }
            _ => {
                info!("SMTP not configured, mail goes to the log");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::with_store(config, db.store(), mailer, cache))
    }

    /// Собирает состояние поверх любого хранилища, реализующего все репозитории.
    pub fn with_store<S>(
        config: Config,
        store: S,
        mailer: Arc<dyn Mailer>,
        cache: Option<CacheService>,
    ) -> Arc<Self>
    where
        S: BookingRepository + ShowtimeRepository + SeatRepository + CinemaRepository + 'static,
    {
        let store = Arc::new(store);
        let bookings = BookingService::new(
            store.clone(),
            mailer,
            TicketIssuer::new(&config.app.public_base_url),
            chrono::Duration::minutes(config.booking.cancellation_window_minutes),
        );

        Arc::new(Self {
            config,
            bookings,
            showtimes: store.clone(),
            seats: store.clone(),
            cinemas: store,
            cache,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
