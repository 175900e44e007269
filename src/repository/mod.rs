//! Слой доступа к данным: по трейту на сущность.
//!
//! `postgres`: рабочая реализация на sqlx, `memory`: реализация в памяти
//! для тестов и локальных прогонов без БД.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::models::{
    BookingDetails, CinemaScope, NewBooking, NewShowtime, Seat, SeatAvailability, SeatPosition,
    SeatType, Showtime, ShowtimeSlot, ShowtimeStatus,
};
use crate::services::pricing::{PriceTable, SeatToPrice};

pub mod memory;
pub mod postgres;

/// Бронирования: чтение и отмена идут напрямую, создание через `BookingTx`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTx>>;

    async fn showtime_slot(&self, showtime_id: i64) -> Result<Option<ShowtimeSlot>>;
    async fn seat_map(&self, showtime_id: i64) -> Result<Vec<SeatAvailability>>;

    async fn find(&self, booking_id: i64) -> Result<Option<BookingDetails>>;
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookingDetails>>;
    async fn list_for_cinema(&self, cinema_id: i64) -> Result<Vec<BookingDetails>>;
    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<BookingDetails>>;

    /// Booked -> Cancelled с освобождением мест. `false`, если бронь уже не Booked.
    async fn cancel(&self, booking_id: i64) -> Result<bool>;
}

/// Единица работы при создании брони. Без `commit` изменения откатываются.
#[async_trait]
pub trait BookingTx: Send {
    /// Блокирует сеанс до конца транзакции.
    async fn lock_showtime(&mut self, showtime_id: i64) -> Result<Option<ShowtimeSlot>>;
    async fn available_seat_ids(&mut self, showtime_id: i64) -> Result<HashSet<i64>>;
    async fn seats_to_price(&mut self, seat_ids: &[i64]) -> Result<Vec<SeatToPrice>>;
    async fn price_table(&mut self, showtime_id: i64) -> Result<PriceTable>;
    async fn insert_booking(&mut self, booking: &NewBooking, qr_placeholder: &str) -> Result<i64>;
    async fn set_qr(&mut self, booking_id: i64, qr_payload: &str, qr_image: &str) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait ShowtimeRepository: Send + Sync {
    async fn create(&self, showtime: &NewShowtime) -> Result<Showtime>;
    async fn find(&self, showtime_id: i64) -> Result<Option<Showtime>>;
    async fn replace_prices(&self, showtime_id: i64, prices: &PriceTable) -> Result<bool>;
    async fn set_status(&self, showtime_id: i64, status: ShowtimeStatus) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct NewSeat {
    pub label: String,
    pub seat_type: SeatType,
    pub position: SeatPosition,
}

#[async_trait]
pub trait SeatRepository: Send + Sync {
    async fn create_many(&self, screen_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>>;
    async fn list_for_screen(&self, screen_id: i64) -> Result<Vec<Seat>>;
    async fn find(&self, seat_id: i64) -> Result<Option<Seat>>;
    async fn set_active(&self, seat_id: i64, is_active: bool) -> Result<bool>;
}

/// Связка экран -> кинотеатр -> владелец для проверки прав.
#[async_trait]
pub trait CinemaRepository: Send + Sync {
    async fn screen_scope(&self, screen_id: i64) -> Result<Option<CinemaScope>>;
    async fn cinema_owner(&self, cinema_id: i64) -> Result<Option<i64>>;
}
