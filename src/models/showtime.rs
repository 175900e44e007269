use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::SeatType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowtimeStatus {
    Active,
    Inactive,
}

impl ShowtimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowtimeStatus::Active => "Active",
            ShowtimeStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for ShowtimeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(ShowtimeStatus::Active),
            "Inactive" => Ok(ShowtimeStatus::Inactive),
            other => Err(format!("unknown showtime status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: i64,
    pub movie_id: i64,
    pub screen_id: i64,
    pub starts_at: DateTime<Utc>,
    pub status: ShowtimeStatus,
    pub prices: BTreeMap<SeatType, Decimal>,
}

impl Showtime {
    pub fn date(&self) -> chrono::NaiveDate {
        self.starts_at.date_naive()
    }

    pub fn time(&self) -> chrono::NaiveTime {
        self.starts_at.time()
    }
}

#[derive(Debug, Clone)]
pub struct NewShowtime {
    pub movie_id: i64,
    pub screen_id: i64,
    pub starts_at: DateTime<Utc>,
    pub prices: BTreeMap<SeatType, Decimal>,
}

/// Экран вместе с кинотеатром и его владельцем, для проверки прав.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CinemaScope {
    pub cinema_id: i64,
    pub owner_id: i64,
}
