use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::authorize_screen;
use super::extract::{AppJson, AppPath};
use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{NewShowtime, Showtime, ShowtimeStatus};
use crate::services::pricing::{validate_price_table, PriceTable};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/showtime", post(create_showtime))
        .route("/showtime/{showtime_id}", get(get_showtime))
        .route("/showtime/{showtime_id}/prices", put(update_prices))
        .route("/showtime/{showtime_id}/status", put(update_status))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateShowtimeRequest {
    #[validate(range(min = 1))]
    movie_id: i64,
    #[validate(range(min = 1))]
    screen_id: i64,
    starts_at: DateTime<Utc>,
    prices: PriceTable,
}

#[derive(Debug, Deserialize)]
struct UpdatePricesRequest {
    prices: PriceTable,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: ShowtimeStatus,
}

#[derive(Debug, Serialize)]
struct ShowtimeResponse {
    #[serde(flatten)]
    showtime: Showtime,
    date: NaiveDate,
    time: NaiveTime,
}

impl From<Showtime> for ShowtimeResponse {
    fn from(showtime: Showtime) -> Self {
        let date = showtime.date();
        let time = showtime.time();
        Self { showtime, date, time }
    }
}

async fn load_showtime(state: &AppState, showtime_id: i64) -> Result<Showtime> {
    state
        .showtimes
        .find(showtime_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))
}

// POST /api/showtime
async fn create_showtime(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CreateShowtimeRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    validate_price_table(&req.prices).map_err(AppError::BadRequest)?;
    if req.starts_at <= Utc::now() {
        return Err(AppError::BadRequest("Showtime must start in the future".to_string()));
    }

    authorize_screen(&state, &session, req.screen_id).await?;

    let showtime = state
        .showtimes
        .create(&NewShowtime {
            movie_id: req.movie_id,
            screen_id: req.screen_id,
            starts_at: req.starts_at,
            prices: req.prices,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ShowtimeResponse::from(showtime))))
}

// GET /api/showtime/{showtime_id}
async fn get_showtime(
    State(state): State<Arc<AppState>>,
    AppPath(showtime_id): AppPath<i64>,
) -> Result<impl IntoResponse> {
    let showtime = load_showtime(&state, showtime_id).await?;
    Ok(Json(ShowtimeResponse::from(showtime)))
}

// PUT /api/showtime/{showtime_id}/prices
async fn update_prices(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppPath(showtime_id): AppPath<i64>,
    AppJson(req): AppJson<UpdatePricesRequest>,
) -> Result<impl IntoResponse> {
    validate_price_table(&req.prices).map_err(AppError::BadRequest)?;

    let showtime = load_showtime(&state, showtime_id).await?;
    authorize_screen(&state, &session, showtime.screen_id).await?;

    if !state.showtimes.replace_prices(showtime_id, &req.prices).await? {
        return Err(AppError::NotFound("Showtime not found".to_string()));
    }
    tracing::info!("prices updated for showtime {} by user {}", showtime_id, session.user_id);

    // цены входят в схему зала
    if let Some(cache) = &state.cache {
        cache.invalidate_seat_map(showtime_id).await;
    }

    let updated = Showtime { prices: req.prices, ..showtime };
    Ok(Json(ShowtimeResponse::from(updated)))
}

// PUT /api/showtime/{showtime_id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppPath(showtime_id): AppPath<i64>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    let showtime = load_showtime(&state, showtime_id).await?;
    authorize_screen(&state, &session, showtime.screen_id).await?;

    if !state.showtimes.set_status(showtime_id, req.status).await? {
        return Err(AppError::NotFound("Showtime not found".to_string()));
    }
    tracing::info!("showtime {} is now {}", showtime_id, req.status.as_str());

    let updated = Showtime { status: req.status, ..showtime };
    Ok(Json(ShowtimeResponse::from(updated)))
}
