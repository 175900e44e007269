use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

use super::authorize_screen;
use super::extract::{AppJson, AppPath};
use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{SeatPosition, SeatType};
use crate::repository::NewSeat;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seat/bulk", post(create_seats))
        .route("/seat/screen/{screen_id}", get(screen_seats))
        .route("/seat/{seat_id}/status", put(update_seat_status))
}

#[derive(Debug, Serialize, Deserialize)]
struct SeatInput {
    label: String,
    seat_type: SeatType,
    #[serde(default)]
    position: Option<SeatPosition>,
}

#[derive(Debug, Deserialize, Validate)]
struct BulkSeatsRequest {
    #[validate(range(min = 1))]
    screen_id: i64,
    #[validate(length(min = 1, max = 500))]
    seats: Vec<SeatInput>,
}

#[derive(Debug, Deserialize)]
struct SeatStatusRequest {
    is_active: bool,
}

fn normalize_seats(input: Vec<SeatInput>) -> Result<Vec<NewSeat>> {
    let mut seen = HashSet::new();
    let mut seats = Vec::with_capacity(input.len());

    for seat in input {
        let label = seat.label.trim().to_string();
        if label.is_empty() {
            return Err(AppError::BadRequest("Seat label must not be empty".to_string()));
        }
        if !seen.insert(label.clone()) {
            return Err(AppError::BadRequest(format!("Duplicate seat label: {}", label)));
        }
        seats.push(NewSeat {
            label,
            seat_type: seat.seat_type,
            position: seat.position.unwrap_or(SeatPosition::Full),
        });
    }
    Ok(seats)
}

// POST /api/seat/bulk
async fn create_seats(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<BulkSeatsRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    authorize_screen(&state, &session, req.screen_id).await?;

    let seats = normalize_seats(req.seats)?;
    let created = state.seats.create_many(req.screen_id, &seats).await?;
    tracing::info!("{} seats added to screen {}", created.len(), req.screen_id);

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/seat/screen/{screen_id}
async fn screen_seats(
    State(state): State<Arc<AppState>>,
    AppPath(screen_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let seats = state.seats.list_for_screen(screen_id).await?;
    Ok(Json(seats))
}

// PUT /api/seat/{seat_id}/status
async fn update_seat_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppPath(seat_id): AppPath<i64>,
    AppJson(req): AppJson<SeatStatusRequest>,
) -> Result<impl IntoResponse> {
    let seat = state
        .seats
        .find(seat_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;
    authorize_screen(&state, &session, seat.screen_id).await?;

    if !state.seats.set_active(seat_id, req.is_active).await? {
        return Err(AppError::NotFound("Seat not found".to_string()));
    }

    let mut seat = seat;
    seat.is_active = req.is_active;
    Ok(Json(seat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(label: &str) -> SeatInput {
        SeatInput { label: label.to_string(), seat_type: SeatType::Classic, position: None }
    }

    #[test]
    fn labels_are_trimmed_and_positions_default_to_full() {
        let seats = normalize_seats(vec![input(" A1 "), input("A2")]).unwrap();
        assert_eq!(seats[0].label, "A1");
        assert_eq!(seats[1].position, SeatPosition::Full);
    }

    #[test]
    fn duplicate_or_blank_labels_are_rejected() {
        assert!(matches!(
            normalize_seats(vec![input("A1"), input("A1 ")]),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(normalize_seats(vec![input("  ")]), Err(AppError::BadRequest(_))));
    }
}
