#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cinema_booking::config::{
    AppConfig, BookingConfig, Config, DatabaseConfig, FeatureFlags, JwtConfig, MailConfig,
    RedisConfig,
};
use cinema_booking::middleware::{Claims, Role, Session};
use cinema_booking::models::{NewShowtime, SeatPosition, SeatType};
use cinema_booking::repository::memory::MemoryStore;
use cinema_booking::repository::{NewSeat, SeatRepository, ShowtimeRepository};
use cinema_booking::services::mailer::{MailError, MailMessage, Mailer};
use cinema_booking::AppState;

pub const JWT_SECRET: &str = "test-secret";
pub const OWNER_ID: i64 = 500;
pub const CUSTOMER_ID: i64 = 42;

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            environment: "test".to_string(),
            rust_log: "cinema_booking=debug".to_string(),
            log_format: "pretty".to_string(),
            public_base_url: "http://tickets.test".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            pool_size: 1,
        },
        redis: RedisConfig { url: None },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        mail: MailConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@tickets.test".to_string(),
            from_name: "Cinema Booking".to_string(),
        },
        booking: BookingConfig {
            cancellation_window_minutes: 60,
            seat_cache_ttl_seconds: 60,
        },
        features: FeatureFlags {
            enable_seat_cache: false,
            enable_email: true,
        },
    }
}

/// Запоминает все письма.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Запоминает, сколько броней уже видно в хранилище в момент отправки письма.
pub struct StoreSnapshotMailer {
    store: MemoryStore,
    seen: Mutex<Vec<usize>>,
}

impl StoreSnapshotMailer {
    pub fn new(store: MemoryStore) -> Self {
        Self { store, seen: Mutex::new(Vec::new()) }
    }

    pub fn bookings_seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for StoreSnapshotMailer {
    async fn send(&self, _message: MailMessage) -> Result<(), MailError> {
        self.seen.lock().unwrap().push(self.store.booking_count());
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: MailMessage) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

/// Кинотеатр с одним залом и одним сеансом.
///
/// Места: A1-A3 CLASSIC (10), P1 PRIME (15), R1 RECLINER (цены нет).
pub struct Fixture {
    pub store: MemoryStore,
    pub cinema_id: i64,
    pub screen_id: i64,
    pub showtime_id: i64,
    pub classic: Vec<i64>,
    pub prime: i64,
    pub recliner: i64,
}

pub async fn fixture(starts_in: Duration) -> Fixture {
    let store = MemoryStore::new();
    let cinema_id = store.add_cinema(OWNER_ID, "Kino Central");
    let screen_id = store.add_screen(cinema_id, "Hall 1");
    let movie_id = store.add_movie("Arrival");

    let seat = |label: &str, seat_type| NewSeat {
        label: label.to_string(),
        seat_type,
        position: SeatPosition::Full,
    };
    let seats = store
        .create_many(
            screen_id,
            &[
                seat("A1", SeatType::Classic),
                seat("A2", SeatType::Classic),
                seat("A3", SeatType::Classic),
                seat("P1", SeatType::Prime),
                seat("R1", SeatType::Recliner),
            ],
        )
        .await
        .unwrap();

    let mut prices = BTreeMap::new();
    prices.insert(SeatType::Classic, dec!(10));
    prices.insert(SeatType::Prime, dec!(15));

    let showtime = store
        .create(&NewShowtime {
            movie_id,
            screen_id,
            starts_at: Utc::now() + starts_in,
            prices,
        })
        .await
        .unwrap();

    Fixture {
        cinema_id,
        screen_id,
        showtime_id: showtime.id,
        classic: seats[0..3].iter().map(|s| s.id).collect(),
        prime: seats[3].id,
        recliner: seats[4].id,
        store,
    }
}

pub fn build_state(store: MemoryStore, mailer: Arc<dyn Mailer>) -> Arc<AppState> {
    AppState::with_store(test_config(), store, mailer, None)
}

pub fn session(user_id: i64, role: Role) -> Session {
    Session {
        user_id,
        email: format!("user{}@example.com", user_id),
        role,
        cinema_id: None,
    }
}

pub fn token(user_id: i64, role: Role, cinema_id: Option<i64>) -> String {
    let claims = Claims {
        sub: user_id,
        email: format!("user{}@example.com", user_id),
        role,
        cinema_id,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}
