//! Хранилище в памяти. Реализует те же трейты, что и `PgStore`.
//!
//! Транзакция брони работает на копии состояния и подменяет его целиком при
//! `commit`, поэтому параллельные транзакции здесь не изолированы.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::{
    BookedSeat, BookingDetails, BookingStatus, CinemaScope, NewBooking, NewShowtime, OrderSummary,
    Seat, SeatAvailability, Showtime, ShowtimeSlot, ShowtimeStatus,
};
use crate::repository::{
    BookingRepository, BookingTx, CinemaRepository, NewSeat, SeatRepository, ShowtimeRepository,
};
use crate::services::pricing::{PriceTable, SeatToPrice};

#[derive(Debug, Clone)]
struct StoredBooking {
    user_id: i64,
    showtime_id: i64,
    status: BookingStatus,
    qr_payload: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    order: OrderSummary,
    seats: Vec<BookedSeat>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    // cinema_id -> (owner_id, name)
    cinemas: BTreeMap<i64, (i64, String)>,
    // screen_id -> (cinema_id, name)
    screens: BTreeMap<i64, (i64, String)>,
    movies: BTreeMap<i64, String>,
    seats: BTreeMap<i64, Seat>,
    showtimes: BTreeMap<i64, Showtime>,
    bookings: BTreeMap<i64, StoredBooking>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn slot(&self, showtime_id: i64) -> Option<ShowtimeSlot> {
        let showtime = self.showtimes.get(&showtime_id)?;
        Some(ShowtimeSlot {
            id: showtime.id,
            screen_id: showtime.screen_id,
            movie_title: self.movies.get(&showtime.movie_id).cloned().unwrap_or_default(),
            starts_at: showtime.starts_at,
            status: showtime.status,
        })
    }

    fn is_seat_taken(&self, showtime_id: i64, seat_id: i64) -> bool {
        self.bookings.values().any(|b| {
            b.showtime_id == showtime_id
                && b.status == BookingStatus::Booked
                && b.seats.iter().any(|s| s.seat_id == seat_id)
        })
    }

    fn details(&self, id: i64, b: &StoredBooking) -> Option<BookingDetails> {
        let showtime = self.showtimes.get(&b.showtime_id)?;
        let (cinema_id, screen_name) = self.screens.get(&showtime.screen_id)?.clone();
        let (_, cinema_name) = self.cinemas.get(&cinema_id)?.clone();
        Some(BookingDetails {
            id,
            user_id: b.user_id,
            showtime_id: b.showtime_id,
            movie_title: self.movies.get(&showtime.movie_id).cloned().unwrap_or_default(),
            cinema_id,
            cinema_name,
            screen_name,
            starts_at: showtime.starts_at,
            status: b.status,
            qr_payload: b.qr_payload.clone(),
            created_at: b.created_at,
            cancelled_at: b.cancelled_at,
            order: b.order.clone(),
            seats: b.seats.clone(),
        })
    }

    fn collect<F>(&self, keep: F) -> Vec<BookingDetails>
    where
        F: Fn(&StoredBooking, &BookingDetails) -> bool,
    {
        let mut out: Vec<BookingDetails> = self
            .bookings
            .iter()
            .filter_map(|(id, b)| self.details(*id, b).filter(|d| keep(b, d)))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_cinema(&self, owner_id: i64, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.cinemas.insert(id, (owner_id, name.to_string()));
        id
    }

    pub fn add_screen(&self, cinema_id: i64, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.screens.insert(id, (cinema_id, name.to_string()));
        id
    }

    pub fn add_movie(&self, title: &str) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.movies.insert(id, title.to_string());
        id
    }

    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>> {
        let working = self.lock().clone();
        Ok(Box::new(MemoryTx {
            store: self.state.clone(),
            working,
        }))
    }

    async fn showtime_slot(&self, showtime_id: i64) -> Result<Option<ShowtimeSlot>> {
        Ok(self.lock().slot(showtime_id))
    }

    async fn seat_map(&self, showtime_id: i64) -> Result<Vec<SeatAvailability>> {
        let state = self.lock();
        let Some(showtime) = state.showtimes.get(&showtime_id) else {
            return Ok(vec![]);
        };
        let mut seats: Vec<SeatAvailability> = state
            .seats
            .values()
            .filter(|s| s.screen_id == showtime.screen_id)
            .map(|s| SeatAvailability {
                seat_id: s.id,
                label: s.label.clone(),
                seat_type: s.seat_type,
                position: s.position,
                price: showtime.prices.get(&s.seat_type).copied(),
                available: s.is_active && !state.is_seat_taken(showtime_id, s.id),
            })
            .collect();
        seats.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(seats)
    }

    async fn find(&self, booking_id: i64) -> Result<Option<BookingDetails>> {
        let state = self.lock();
        Ok(state
            .bookings
            .get(&booking_id)
            .and_then(|b| state.details(booking_id, b)))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookingDetails>> {
        Ok(self.lock().collect(|b, _| b.user_id == user_id))
    }

    async fn list_for_cinema(&self, cinema_id: i64) -> Result<Vec<BookingDetails>> {
        Ok(self.lock().collect(|_, d| d.cinema_id == cinema_id))
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<BookingDetails>> {
        let state = self.lock();
        Ok(state.collect(|_, d| {
            state
                .cinemas
                .get(&d.cinema_id)
                .is_some_and(|(owner, _)| *owner == owner_id)
        }))
    }

    async fn cancel(&self, booking_id: i64) -> Result<bool> {
        let mut state = self.lock();
        match state.bookings.get_mut(&booking_id) {
            Some(b) if b.status == BookingStatus::Booked => {
                b.status = BookingStatus::Cancelled;
                b.cancelled_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

struct MemoryTx {
    store: Arc<Mutex<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn lock_showtime(&mut self, showtime_id: i64) -> Result<Option<ShowtimeSlot>> {
        Ok(self.working.slot(showtime_id))
    }

    async fn available_seat_ids(&mut self, showtime_id: i64) -> Result<HashSet<i64>> {
        let Some(screen_id) = self.working.showtimes.get(&showtime_id).map(|s| s.screen_id) else {
            return Ok(HashSet::new());
        };
        Ok(self
            .working
            .seats
            .values()
            .filter(|s| s.screen_id == screen_id && s.is_active)
            .filter(|s| !self.working.is_seat_taken(showtime_id, s.id))
            .map(|s| s.id)
            .collect())
    }

    async fn seats_to_price(&mut self, seat_ids: &[i64]) -> Result<Vec<SeatToPrice>> {
        Ok(seat_ids
            .iter()
            .filter_map(|id| self.working.seats.get(id))
            .map(|s| SeatToPrice {
                seat_id: s.id,
                label: s.label.clone(),
                seat_type: s.seat_type,
            })
            .collect())
    }

    async fn price_table(&mut self, showtime_id: i64) -> Result<PriceTable> {
        Ok(self
            .working
            .showtimes
            .get(&showtime_id)
            .map(|s| s.prices.clone())
            .unwrap_or_default())
    }

    async fn insert_booking(&mut self, booking: &NewBooking, qr_placeholder: &str) -> Result<i64> {
        if let Some(seat) = booking
            .seats
            .iter()
            .find(|s| self.working.is_seat_taken(booking.showtime_id, s.seat_id))
        {
            return Err(AppError::Conflict(format!("Seat {} is already booked", seat.label)));
        }

        let id = self.working.next_id();
        self.working.bookings.insert(
            id,
            StoredBooking {
                user_id: booking.user_id,
                showtime_id: booking.showtime_id,
                status: BookingStatus::Booked,
                qr_payload: qr_placeholder.to_string(),
                created_at: Utc::now(),
                cancelled_at: None,
                order: OrderSummary {
                    payment_method: booking.payment_method.clone(),
                    total_amount: booking.total_amount,
                    discount_amount: booking.discount_amount,
                    final_amount: booking.final_amount,
                    transaction_code: booking.transaction_code.clone(),
                    qr_code: qr_placeholder.to_string(),
                },
                seats: booking.seats.clone(),
            },
        );
        Ok(id)
    }

    async fn set_qr(&mut self, booking_id: i64, qr_payload: &str, qr_image: &str) -> Result<()> {
        let booking = self
            .working
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::Internal(format!("booking {} vanished", booking_id)))?;
        booking.qr_payload = qr_payload.to_string();
        booking.order.qr_code = qr_image.to_string();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut state = self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ShowtimeRepository for MemoryStore {
    async fn create(&self, showtime: &NewShowtime) -> Result<Showtime> {
        let mut state = self.lock();
        if !state.movies.contains_key(&showtime.movie_id)
            || !state.screens.contains_key(&showtime.screen_id)
        {
            return Err(AppError::BadRequest("Unknown movie or screen".to_string()));
        }
        let id = state.next_id();
        let created = Showtime {
            id,
            movie_id: showtime.movie_id,
            screen_id: showtime.screen_id,
            starts_at: showtime.starts_at,
            status: ShowtimeStatus::Active,
            prices: showtime.prices.clone(),
        };
        state.showtimes.insert(id, created.clone());
        Ok(created)
    }

    async fn find(&self, showtime_id: i64) -> Result<Option<Showtime>> {
        Ok(self.lock().showtimes.get(&showtime_id).cloned())
    }

    async fn replace_prices(&self, showtime_id: i64, prices: &PriceTable) -> Result<bool> {
        Ok(match self.lock().showtimes.get_mut(&showtime_id) {
            Some(showtime) => {
                showtime.prices = prices.clone();
                true
            }
            None => false,
        })
    }

    async fn set_status(&self, showtime_id: i64, status: ShowtimeStatus) -> Result<bool> {
        Ok(match self.lock().showtimes.get_mut(&showtime_id) {
            Some(showtime) => {
                showtime.status = status;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl SeatRepository for MemoryStore {
    async fn create_many(&self, screen_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>> {
        let mut state = self.lock();
        if !state.screens.contains_key(&screen_id) {
            return Err(AppError::NotFound("Screen not found".to_string()));
        }
        if let Some(dup) = seats.iter().find(|n| {
            state
                .seats
                .values()
                .any(|s| s.screen_id == screen_id && s.label == n.label)
        }) {
            return Err(AppError::Conflict(format!(
                "Seat {} already exists on this screen",
                dup.label
            )));
        }

        let mut created = Vec::with_capacity(seats.len());
        for seat in seats {
            let id = state.next_id();
            let seat = Seat {
                id,
                screen_id,
                label: seat.label.clone(),
                seat_type: seat.seat_type,
                position: seat.position,
                is_active: true,
            };
            state.seats.insert(id, seat.clone());
            created.push(seat);
        }
        Ok(created)
    }

    async fn list_for_screen(&self, screen_id: i64) -> Result<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .lock()
            .seats
            .values()
            .filter(|s| s.screen_id == screen_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(seats)
    }

    async fn find(&self, seat_id: i64) -> Result<Option<Seat>> {
        Ok(self.lock().seats.get(&seat_id).cloned())
    }

    async fn set_active(&self, seat_id: i64, is_active: bool) -> Result<bool> {
        Ok(match self.lock().seats.get_mut(&seat_id) {
            Some(seat) => {
                seat.is_active = is_active;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl CinemaRepository for MemoryStore {
    async fn screen_scope(&self, screen_id: i64) -> Result<Option<CinemaScope>> {
        let state = self.lock();
        Ok(state.screens.get(&screen_id).and_then(|(cinema_id, _)| {
            state.cinemas.get(cinema_id).map(|(owner_id, _)| CinemaScope {
                cinema_id: *cinema_id,
                owner_id: *owner_id,
            })
        }))
    }

    async fn cinema_owner(&self, cinema_id: i64) -> Result<Option<i64>> {
        Ok(self.lock().cinemas.get(&cinema_id).map(|(owner_id, _)| *owner_id))
    }
}
