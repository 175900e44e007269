pub mod bookings;
mod extract;
pub mod seats;
pub mod showtimes;

use axum::Router;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::{Role, Session};
use crate::models::CinemaScope;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(bookings::routes())
        .merge(showtimes::routes())
        .merge(seats::routes())
}

/// Проверяет, что сессия может управлять кинотеатром, которому принадлежит экран.
async fn authorize_screen(state: &AppState, session: &Session, screen_id: i64) -> Result<CinemaScope> {
    session.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let scope = state
        .cinemas
        .screen_scope(screen_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Screen not found".to_string()))?;

    if !session.can_manage(&scope) {
        return Err(AppError::Forbidden("Not allowed to manage this cinema".to_string()));
    }
    Ok(scope)
}
