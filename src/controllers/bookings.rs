use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::error::{AppError, Result};
use crate::middleware::{Role, Session};
use crate::models::CinemaScope;
use crate::services::booking::CreateBookingRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/booking/create", post(create_booking))
        .route("/booking/my", get(my_bookings))
        .route("/booking/cancel-booking", put(cancel_booking))
        .route("/booking/showtime-seats/{showtime_id}", get(showtime_seats))
        .route("/booking/admin/{booking_id}", get(admin_booking))
        .route("/booking/cinema/{cinema_id}", get(cinema_bookings))
        .route("/booking/owner", get(owner_bookings))
        .route("/booking/verify", get(verify_ticket))
}

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/* ---------- BOOKINGS ---------- */

// POST /api/booking/create
async fn create_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<impl IntoResponse> {
    let receipt = state.bookings.create(&session, req).await?;

    if let Some(cache) = &state.cache {
        cache.invalidate_seat_map(receipt.showtime_id).await;
    }

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/booking/my
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse> {
    let bookings = state.bookings.my_bookings(&session).await?;
    Ok(Json(bookings))
}

// PUT /api/booking/cancel-booking
#[derive(Debug, Deserialize)]
struct CancelBookingRequest {
    booking_id: i64,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CancelBookingRequest>,
) -> Result<impl IntoResponse> {
    if req.booking_id <= 0 {
        return Err(AppError::BadRequest("booking_id must be > 0".to_string()));
    }

    let cancelled = state.bookings.cancel(&session, req.booking_id).await?;

    if let Some(cache) = &state.cache {
        cache.invalidate_seat_map(cancelled.showtime_id).await;
    }

    Ok(Json(json!({
        "message": "Booking cancelled successfully",
        "booking": cancelled
    })))
}

/* ---------- SEAT MAP ---------- */

// GET /api/booking/showtime-seats/{showtime_id}
async fn showtime_seats(
    State(state): State<Arc<AppState>>,
    AppPath(showtime_id): AppPath<i64>,
) -> Result<Response> {
    // 1. Пробуем кеш
    if let Some(cache) = &state.cache {
        match cache.get_seat_map(showtime_id).await {
            Ok(Some(cached)) => {
                return Ok((
                    [(header::CONTENT_TYPE, "application/json"), (X_CACHE, "HIT")],
                    cached,
                )
                    .into_response());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("seat map cache read failed: {:?}", e),
        }
    }

    // 2. Cache miss: идём в БД
    let seat_map = state.bookings.seat_map(showtime_id).await?;
    let body = serde_json::to_string(&seat_map)
        .map_err(|e| AppError::Internal(format!("failed to serialize seat map: {}", e)))?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.save_seat_map(showtime_id, &body).await {
            tracing::warn!("failed to cache seat map for showtime {}: {:?}", showtime_id, e);
        }
    }

    Ok((
        [(header::CONTENT_TYPE, "application/json"), (X_CACHE, "MISS")],
        body,
    )
        .into_response())
}

/* ---------- STAFF VIEWS ---------- */

// GET /api/booking/admin/{booking_id}
async fn admin_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppPath(booking_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    session.require_role(&[Role::Admin])?;
    let booking = state.bookings.booking(booking_id).await?;
    Ok(Json(booking))
}

// GET /api/booking/cinema/{cinema_id}
async fn cinema_bookings(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppPath(cinema_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    session.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let owner_id = state
        .cinemas
        .cinema_owner(cinema_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cinema not found".to_string()))?;
    if !session.can_manage(&CinemaScope { cinema_id, owner_id }) {
        return Err(AppError::Forbidden("Not allowed to view this cinema".to_string()));
    }

    let bookings = state.bookings.cinema_bookings(cinema_id).await?;
    Ok(Json(bookings))
}

// GET /api/booking/owner
async fn owner_bookings(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse> {
    session.require_role(&[Role::Owner])?;
    let bookings = state.bookings.owner_bookings(session.user_id).await?;
    Ok(Json(bookings))
}

/* ---------- TICKETS ---------- */

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    booking_id: i64,
    user_id: i64,
    code: String,
}

// GET /api/booking/verify, сюда ведёт ссылка из QR
async fn verify_ticket(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<VerifyQuery>,
) -> Result<impl IntoResponse> {
    let verification = state
        .bookings
        .verify_ticket(params.booking_id, params.user_id, params.code.trim())
        .await?;
    Ok(Json(verification))
}
