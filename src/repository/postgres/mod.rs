use sqlx::PgPool;
use std::str::FromStr;

use crate::error::{AppError, Result};

mod bookings;
mod cinemas;
mod seats;
mod showtimes;

pub use bookings::PgBookingTx;

/// Реализация всех репозиториев поверх одного пула PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Текстовые колонки со статусами и типами разбираем в enum'ы вручную
fn parse_column<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(AppError::Internal)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
