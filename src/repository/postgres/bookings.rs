use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use std::collections::{HashMap, HashSet};

use super::{is_unique_violation, parse_column, PgStore};
use crate::error::{AppError, Result};
use crate::models::{BookedSeat, BookingDetails, NewBooking, OrderSummary, SeatAvailability, ShowtimeSlot};
use crate::repository::{BookingRepository, BookingTx};
use crate::services::pricing::{PriceTable, SeatToPrice};

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.showtime_id, m.title AS movie_title,
           c.id AS cinema_id, c.name AS cinema_name, sc.name AS screen_name,
           st.starts_at, b.status, b.qr_payload, b.created_at, b.cancelled_at,
           o.payment_method, o.total_amount, o.discount_amount, o.final_amount,
           o.transaction_code, o.qr_code
    FROM bookings b
    JOIN order_summaries o ON o.booking_id = b.id
    JOIN showtimes st ON st.id = b.showtime_id
    JOIN movies m ON m.id = st.movie_id
    JOIN screens sc ON sc.id = st.screen_id
    JOIN cinemas c ON c.id = sc.cinema_id
"#;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    showtime_id: i64,
    movie_title: String,
    cinema_id: i64,
    cinema_name: String,
    screen_name: String,
    starts_at: DateTime<Utc>,
    status: String,
    qr_payload: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    payment_method: String,
    total_amount: Decimal,
    discount_amount: Decimal,
    final_amount: Decimal,
    transaction_code: String,
    qr_code: String,
}

#[derive(sqlx::FromRow)]
struct BookedSeatRow {
    booking_id: i64,
    seat_id: i64,
    label: String,
    seat_type: String,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: i64,
    screen_id: i64,
    movie_title: String,
    starts_at: DateTime<Utc>,
    status: String,
}

impl SlotRow {
    fn into_slot(self) -> Result<ShowtimeSlot> {
        Ok(ShowtimeSlot {
            id: self.id,
            screen_id: self.screen_id,
            movie_title: self.movie_title,
            starts_at: self.starts_at,
            status: parse_column(&self.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatMapRow {
    seat_id: i64,
    label: String,
    seat_type: String,
    position: String,
    price: Option<Decimal>,
    available: bool,
}

const SLOT_SELECT: &str = r#"
    SELECT st.id, st.screen_id, m.title AS movie_title, st.starts_at, st.status
    FROM showtimes st
    JOIN movies m ON m.id = st.movie_id
    WHERE st.id = $1
"#;

impl PgStore {
    async fn load_bookings(&self, filter: &str, id: i64) -> Result<Vec<BookingDetails>> {
        let sql = format!("{} {}", BOOKING_SELECT, filter);
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let seat_rows = sqlx::query_as::<_, BookedSeatRow>(
            r#"
            SELECT bs.booking_id, bs.seat_id, s.label, s.seat_type, bs.price
            FROM booking_seats bs
            JOIN seats s ON s.id = bs.seat_id
            WHERE bs.booking_id = ANY($1)
            ORDER BY bs.booking_id, s.label
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut seats: HashMap<i64, Vec<BookedSeat>> = HashMap::new();
        for r in seat_rows {
            seats.entry(r.booking_id).or_default().push(BookedSeat {
                seat_id: r.seat_id,
                label: r.label,
                seat_type: parse_column(&r.seat_type)?,
                price: r.price,
            });
        }

        rows.into_iter()
            .map(|r| {
                let booking_seats = seats.remove(&r.id).unwrap_or_default();
                Ok(BookingDetails {
                    id: r.id,
                    user_id: r.user_id,
                    showtime_id: r.showtime_id,
                    movie_title: r.movie_title,
                    cinema_id: r.cinema_id,
                    cinema_name: r.cinema_name,
                    screen_name: r.screen_name,
                    starts_at: r.starts_at,
                    status: parse_column(&r.status)?,
                    qr_payload: r.qr_payload,
                    created_at: r.created_at,
                    cancelled_at: r.cancelled_at,
                    order: OrderSummary {
                        payment_method: r.payment_method,
                        total_amount: r.total_amount,
                        discount_amount: r.discount_amount,
                        final_amount: r.final_amount,
                        transaction_code: r.transaction_code,
                        qr_code: r.qr_code,
                    },
                    seats: booking_seats,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBookingTx { tx }))
    }

    async fn showtime_slot(&self, showtime_id: i64) -> Result<Option<ShowtimeSlot>> {
        sqlx::query_as::<_, SlotRow>(SLOT_SELECT)
            .bind(showtime_id)
            .fetch_optional(&self.pool)
            .await?
            .map(SlotRow::into_slot)
            .transpose()
    }

    async fn seat_map(&self, showtime_id: i64) -> Result<Vec<SeatAvailability>> {
        let rows = sqlx::query_as::<_, SeatMapRow>(
            r#"
            SELECT s.id AS seat_id, s.label, s.seat_type, s.position, p.price,
                   (s.is_active AND NOT EXISTS (
                       SELECT 1 FROM booking_seats bs
                       WHERE bs.showtime_id = st.id AND bs.seat_id = s.id AND bs.is_active
                   )) AS available
            FROM showtimes st
            JOIN seats s ON s.screen_id = st.screen_id
            LEFT JOIN showtime_seat_prices p
                   ON p.showtime_id = st.id AND p.seat_type = s.seat_type
            WHERE st.id = $1
            ORDER BY s.label
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(SeatAvailability {
                    seat_id: r.seat_id,
                    label: r.label,
                    seat_type: parse_column(&r.seat_type)?,
                    position: parse_column(&r.position)?,
                    price: r.price,
                    available: r.available,
                })
            })
            .collect()
    }

    async fn find(&self, booking_id: i64) -> Result<Option<BookingDetails>> {
        Ok(self
            .load_bookings("WHERE b.id = $1", booking_id)
            .await?
            .into_iter()
            .next())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookingDetails>> {
        self.load_bookings("WHERE b.user_id = $1 ORDER BY b.created_at DESC, b.id DESC", user_id)
            .await
    }

    async fn list_for_cinema(&self, cinema_id: i64) -> Result<Vec<BookingDetails>> {
        self.load_bookings("WHERE c.id = $1 ORDER BY st.starts_at DESC, b.id DESC", cinema_id)
            .await
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<BookingDetails>> {
        self.load_bookings("WHERE c.owner_id = $1 ORDER BY st.starts_at DESC, b.id DESC", owner_id)
            .await
    }

    async fn cancel(&self, booking_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bookings SET status = 'Cancelled', cancelled_at = NOW()
             WHERE id = $1 AND status = 'Booked'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE booking_seats SET is_active = FALSE WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_showtime(&mut self, showtime_id: i64) -> Result<Option<ShowtimeSlot>> {
        // Конкурентные брони одного сеанса выстраиваются в очередь на этой блокировке
        let sql = format!("{} FOR UPDATE OF st", SLOT_SELECT);
        sqlx::query_as::<_, SlotRow>(&sql)
            .bind(showtime_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(SlotRow::into_slot)
            .transpose()
    }

    async fn available_seat_ids(&mut self, showtime_id: i64) -> Result<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT s.id
            FROM seats s
            JOIN showtimes st ON st.screen_id = s.screen_id
            WHERE st.id = $1
              AND s.is_active
              AND NOT EXISTS (
                  SELECT 1 FROM booking_seats bs
                  WHERE bs.showtime_id = st.id AND bs.seat_id = s.id AND bs.is_active
              )
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn seats_to_price(&mut self, seat_ids: &[i64]) -> Result<Vec<SeatToPrice>> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, label, seat_type FROM seats WHERE id = ANY($1) ORDER BY label",
        )
        .bind(seat_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(seat_id, label, seat_type)| {
                Ok(SeatToPrice {
                    seat_id,
                    label,
                    seat_type: parse_column(&seat_type)?,
                })
            })
            .collect()
    }

    async fn price_table(&mut self, showtime_id: i64) -> Result<PriceTable> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT seat_type, price FROM showtime_seat_prices WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|(seat_type, price)| Ok((parse_column(&seat_type)?, price)))
            .collect()
    }

    async fn insert_booking(&mut self, booking: &NewBooking, qr_placeholder: &str) -> Result<i64> {
        let booking_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO bookings (user_id, showtime_id, status, transaction_code, qr_payload)
            VALUES ($1, $2, 'Booked', $3, $4)
            RETURNING id
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.showtime_id)
        .bind(&booking.transaction_code)
        .bind(qr_placeholder)
        .fetch_one(&mut *self.tx)
        .await?;

        for seat in &booking.seats {
            sqlx::query(
                "INSERT INTO booking_seats (booking_id, showtime_id, seat_id, price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(booking_id)
            .bind(booking.showtime_id)
            .bind(seat.seat_id)
            .bind(seat.price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Seat {} is already booked", seat.label))
                } else {
                    AppError::Database(e)
                }
            })?;
        }

        sqlx::query(
            r#"
            INSERT INTO order_summaries
                (booking_id, payment_method, total_amount, discount_amount, final_amount,
                 transaction_code, qr_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking_id)
        .bind(&booking.payment_method)
        .bind(booking.total_amount)
        .bind(booking.discount_amount)
        .bind(booking.final_amount)
        .bind(&booking.transaction_code)
        .bind(qr_placeholder)
        .execute(&mut *self.tx)
        .await?;

        Ok(booking_id)
    }

    async fn set_qr(&mut self, booking_id: i64, qr_payload: &str, qr_image: &str) -> Result<()> {
        sqlx::query("UPDATE bookings SET qr_payload = $2 WHERE id = $1")
            .bind(booking_id)
            .bind(qr_payload)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("UPDATE order_summaries SET qr_code = $2 WHERE booking_id = $1")
            .bind(booking_id)
            .bind(qr_image)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
