use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::SeatType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "Booked",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Booked" => Ok(BookingStatus::Booked),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Место в брони с ценой на момент покупки.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub price: Decimal,
}

/// Платёжная часть брони (order summary), 1:1 с бронью.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub payment_method: String,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub transaction_code: String,
    pub qr_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub id: i64,
    pub user_id: i64,
    pub showtime_id: i64,
    pub movie_title: String,
    pub cinema_id: i64,
    pub cinema_name: String,
    pub screen_name: String,
    pub starts_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub qr_payload: String,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub order: OrderSummary,
    pub seats: Vec<BookedSeat>,
}

/// Всё, что пишется в БД при создании брони.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub showtime_id: i64,
    pub payment_method: String,
    pub transaction_code: String,
    pub seats: Vec<BookedSeat>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Короткая сводка сеанса, нужная потоку бронирования.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowtimeSlot {
    pub id: i64,
    pub screen_id: i64,
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
    pub status: super::ShowtimeStatus,
}
