//! booking.rs
//!
//! Поток бронирования билетов:
//! 1.  **Создание**: проверка свободных мест сеанса, расчёт цены по категориям,
//!     запись брони и мест одной транзакцией, код транзакции и QR со ссылкой
//!     проверки, письмо-подтверждение (ошибка письма бронь не откатывает).
//! 2.  **Отмена**: не позже чем за окно отмены до начала сеанса.
//! 3.  **Чтение**: свои брони, любая бронь для админа, брони кинотеатра/владельца.
//! 4.  **Проверка билета** по id брони, id пользователя и коду транзакции.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{BookedSeat, BookingDetails, BookingStatus, NewBooking, SeatAvailability, ShowtimeStatus};
use crate::repository::{BookingRepository, BookingTx};
use crate::services::mailer::{self, ConfirmationMail, MailMessage, Mailer};
use crate::services::pricing::{self, PriceQuote};
use crate::services::ticket::{generate_transaction_code, IssuedTicket, TicketIssuer, QR_PLACEHOLDER};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "showtime_id must be > 0"))]
    pub showtime_id: i64,
    #[validate(length(min = 1, max = 20, message = "between 1 and 20 seats per booking"))]
    pub seat_ids: Vec<i64>,
    #[validate(length(min = 1, max = 32, message = "payment_method is required"))]
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub transaction_code: String,
    pub qr_payload: String,
    pub qr_code: String,
    pub payment_method: String,
    pub total_amount: rust_decimal::Decimal,
    pub discount_amount: rust_decimal::Decimal,
    pub final_amount: rust_decimal::Decimal,
    pub seats: Vec<BookedSeat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserBooking {
    #[serde(flatten)]
    pub booking: BookingDetails,
    pub cancelable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowtimeSeatMap {
    pub showtime_id: i64,
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
    pub seats: Vec<SeatAvailability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketInfo {
    pub booking_id: i64,
    pub user_id: i64,
    pub movie_title: String,
    pub cinema_name: String,
    pub screen_name: String,
    pub starts_at: DateTime<Utc>,
    pub seats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketVerification {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketInfo>,
}

/// Отмена после `check_cancellable` прошла успешно.
#[derive(Debug, Clone, Serialize)]
pub struct CancelledBooking {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CancelRejection {
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Cannot cancel booking less than {0} before showtime")]
    TooLate(String),
}

fn describe_window(window: Duration) -> String {
    let minutes = window.num_minutes();
    match (minutes / 60, minutes % 60) {
        (1, 0) => "1 hour".to_string(),
        (hours, 0) if hours > 1 => format!("{} hours", hours),
        _ => format!("{} minutes", minutes),
    }
}

/// Отменить можно только Booked бронь, и только если до сеанса больше `window`.
pub fn check_cancellable(
    status: BookingStatus,
    starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> std::result::Result<(), CancelRejection> {
    if status == BookingStatus::Cancelled {
        return Err(CancelRejection::AlreadyCancelled);
    }
    if starts_at - now <= window {
        return Err(CancelRejection::TooLate(describe_window(window)));
    }
    Ok(())
}

struct Created {
    booking_id: i64,
    movie_title: String,
    starts_at: DateTime<Utc>,
    transaction_code: String,
    quote: PriceQuote,
    ticket: IssuedTicket,
}

#[derive(Clone)]
pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    mailer: Arc<dyn Mailer>,
    tickets: TicketIssuer,
    cancellation_window: Duration,
}

impl BookingService {
    pub fn new(
        repo: Arc<dyn BookingRepository>,
        mailer: Arc<dyn Mailer>,
        tickets: TicketIssuer,
        cancellation_window: Duration,
    ) -> Self {
        Self { repo, mailer, tickets, cancellation_window }
    }

    pub fn cancellation_window(&self) -> Duration {
        self.cancellation_window
    }

    // --- Создание ---

    pub async fn create(&self, session: &Session, req: CreateBookingRequest) -> Result<BookingReceipt> {
        req.validate()?;
        let unique: HashSet<i64> = req.seat_ids.iter().copied().collect();
        if unique.len() != req.seat_ids.len() {
            return Err(AppError::BadRequest("Duplicate seat ids in request".to_string()));
        }

        let mut tx = self.repo.begin().await?;

        let outcome = self.create_in_tx(tx.as_mut(), session.user_id, &req).await;
        let created = match outcome {
            Ok(created) => created,
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!("rollback after failed booking did not succeed: {}", rb);
                }
                return Err(e);
            }
        };

        let seat_labels: Vec<&str> = created.quote.seats.iter().map(|s| s.label.as_str()).collect();
        let confirmation = mailer::booking_confirmation(
            &session.email,
            &ConfirmationMail {
                booking_id: created.booking_id,
                movie_title: &created.movie_title,
                starts_at: created.starts_at,
                seat_labels,
                final_amount: created.quote.final_amount,
                transaction_code: &created.transaction_code,
                qr_image: &created.ticket.image,
            },
        );

        tx.commit().await?;

        info!(
            "booking {} created: user={}, showtime={}, seats={}, total={}",
            created.booking_id,
            session.user_id,
            req.showtime_id,
            created.quote.seats.len(),
            created.quote.final_amount
        );

        // Письмо уходит после commit: блокировка сеанса не держится на время SMTP
        self.send_best_effort(confirmation).await;

        Ok(BookingReceipt {
            booking_id: created.booking_id,
            showtime_id: req.showtime_id,
            transaction_code: created.transaction_code,
            qr_payload: created.ticket.payload,
            qr_code: created.ticket.image,
            payment_method: req.payment_method,
            total_amount: created.quote.total,
            discount_amount: created.quote.discount,
            final_amount: created.quote.final_amount,
            seats: created.quote.seats,
        })
    }

    async fn create_in_tx(
        &self,
        tx: &mut dyn BookingTx,
        user_id: i64,
        req: &CreateBookingRequest,
    ) -> Result<Created> {
        let slot = tx
            .lock_showtime(req.showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;
        if slot.status != ShowtimeStatus::Active {
            return Err(AppError::BadRequest("Showtime is not open for booking".to_string()));
        }
        if slot.starts_at <= Utc::now() {
            return Err(AppError::BadRequest("Showtime has already started".to_string()));
        }

        let available = tx.available_seat_ids(req.showtime_id).await?;
        let taken: Vec<String> = req
            .seat_ids
            .iter()
            .filter(|id| !available.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if !taken.is_empty() {
            warn!("showtime {}: seats {} not available", req.showtime_id, taken.join(","));
            return Err(AppError::Conflict(format!(
                "Seats not available: {}",
                taken.join(", ")
            )));
        }

        let seats = tx.seats_to_price(&req.seat_ids).await?;
        let prices = tx.price_table(req.showtime_id).await?;
        let quote = pricing::quote(&seats, &prices).map_err(|e| AppError::Pricing(e.to_string()))?;

        let transaction_code = generate_transaction_code();
        let new_booking = NewBooking {
            user_id,
            showtime_id: req.showtime_id,
            payment_method: req.payment_method.clone(),
            transaction_code: transaction_code.clone(),
            seats: quote.seats.clone(),
            total_amount: quote.total,
            discount_amount: quote.discount,
            final_amount: quote.final_amount,
        };
        let booking_id = tx.insert_booking(&new_booking, QR_PLACEHOLDER).await?;

        // id брони появляется только после вставки, поэтому QR дописываем вторым шагом
        let ticket = self.tickets.issue(booking_id, user_id, &transaction_code)?;
        tx.set_qr(booking_id, &ticket.payload, &ticket.image).await?;

        Ok(Created {
            booking_id,
            movie_title: slot.movie_title,
            starts_at: slot.starts_at,
            transaction_code,
            quote,
            ticket,
        })
    }

    // --- Отмена ---

    pub async fn cancel(&self, session: &Session, booking_id: i64) -> Result<CancelledBooking> {
        let booking = self
            .repo
            .find(booking_id)
            .await?
            .filter(|b| b.user_id == session.user_id)
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        check_cancellable(booking.status, booking.starts_at, Utc::now(), self.cancellation_window)
            .map_err(|r| AppError::BadRequest(r.to_string()))?;

        if !self.repo.cancel(booking_id).await? {
            // кто-то успел отменить между чтением и обновлением
            return Err(AppError::BadRequest(CancelRejection::AlreadyCancelled.to_string()));
        }

        info!("booking {} cancelled by user {}", booking_id, session.user_id);

        let message = mailer::booking_cancellation(
            &session.email,
            booking_id,
            &booking.movie_title,
            booking.starts_at,
        );
        self.send_best_effort(message).await;

        Ok(CancelledBooking {
            booking_id,
            showtime_id: booking.showtime_id,
            status: BookingStatus::Cancelled,
        })
    }

    // --- Чтение ---

    pub async fn my_bookings(&self, session: &Session) -> Result<Vec<UserBooking>> {
        let now = Utc::now();
        Ok(self
            .repo
            .list_for_user(session.user_id)
            .await?
            .into_iter()
            .map(|booking| UserBooking {
                cancelable: check_cancellable(
                    booking.status,
                    booking.starts_at,
                    now,
                    self.cancellation_window,
                )
                .is_ok(),
                booking,
            })
            .collect())
    }

    pub async fn booking(&self, booking_id: i64) -> Result<BookingDetails> {
        self.repo
            .find(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    pub async fn cinema_bookings(&self, cinema_id: i64) -> Result<Vec<BookingDetails>> {
        self.repo.list_for_cinema(cinema_id).await
    }

    pub async fn owner_bookings(&self, owner_id: i64) -> Result<Vec<BookingDetails>> {
        self.repo.list_for_owner(owner_id).await
    }

    pub async fn seat_map(&self, showtime_id: i64) -> Result<ShowtimeSeatMap> {
        let slot = self
            .repo
            .showtime_slot(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;
        let seats = self.repo.seat_map(showtime_id).await?;
        Ok(ShowtimeSeatMap {
            showtime_id,
            movie_title: slot.movie_title,
            starts_at: slot.starts_at,
            seats,
        })
    }

    // --- Проверка билета ---

    pub async fn verify_ticket(
        &self,
        booking_id: i64,
        user_id: i64,
        transaction_code: &str,
    ) -> Result<TicketVerification> {
        let booking = self
            .repo
            .find(booking_id)
            .await?
            .filter(|b| b.user_id == user_id && b.order.transaction_code == transaction_code)
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        if booking.status != BookingStatus::Booked {
            return Ok(TicketVerification {
                valid: false,
                message: "Ticket is not valid".to_string(),
                ticket: None,
            });
        }

        Ok(TicketVerification {
            valid: true,
            message: "Ticket verified".to_string(),
            ticket: Some(TicketInfo {
                booking_id: booking.id,
                user_id: booking.user_id,
                movie_title: booking.movie_title,
                cinema_name: booking.cinema_name,
                screen_name: booking.screen_name,
                starts_at: booking.starts_at,
                seats: booking.seats.into_iter().map(|s| s.label).collect(),
            }),
        })
    }

    async fn send_best_effort(&self, message: MailMessage) {
        let to = message.to.clone();
        if let Err(e) = self.mailer.send(message).await {
            warn!("failed to send mail to {}: {}", to, e);
        }
    }
}
