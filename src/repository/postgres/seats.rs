use async_trait::async_trait;

use super::{is_foreign_key_violation, is_unique_violation, parse_column, PgStore};
use crate::error::{AppError, Result};
use crate::models::Seat;
use crate::repository::{NewSeat, SeatRepository};

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: i64,
    screen_id: i64,
    label: String,
    seat_type: String,
    position: String,
    is_active: bool,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat> {
        Ok(Seat {
            id: self.id,
            screen_id: self.screen_id,
            label: self.label,
            seat_type: parse_column(&self.seat_type)?,
            position: parse_column(&self.position)?,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl SeatRepository for PgStore {
    async fn create_many(&self, screen_id: i64, seats: &[NewSeat]) -> Result<Vec<Seat>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(seats.len());

        for seat in seats {
            let row = sqlx::query_as::<_, SeatRow>(
                r#"
                INSERT INTO seats (screen_id, label, seat_type, position)
                VALUES ($1, $2, $3, $4)
                RETURNING id, screen_id, label, seat_type, position, is_active
                "#,
            )
            .bind(screen_id)
            .bind(&seat.label)
            .bind(seat.seat_type.as_str())
            .bind(seat.position.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Seat {} already exists on this screen", seat.label))
                } else if is_foreign_key_violation(&e) {
                    AppError::NotFound("Screen not found".to_string())
                } else {
                    AppError::Database(e)
                }
            })?;
            created.push(row.into_seat()?);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_for_screen(&self, screen_id: i64) -> Result<Vec<Seat>> {
        sqlx::query_as::<_, SeatRow>(
            "SELECT id, screen_id, label, seat_type, position, is_active
             FROM seats WHERE screen_id = $1 ORDER BY label",
        )
        .bind(screen_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SeatRow::into_seat)
        .collect()
    }

    async fn find(&self, seat_id: i64) -> Result<Option<Seat>> {
        sqlx::query_as::<_, SeatRow>(
            "SELECT id, screen_id, label, seat_type, position, is_active FROM seats WHERE id = $1",
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await?
        .map(SeatRow::into_seat)
        .transpose()
    }

    async fn set_active(&self, seat_id: i64, is_active: bool) -> Result<bool> {
        let updated = sqlx::query("UPDATE seats SET is_active = $2 WHERE id = $1")
            .bind(seat_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }
}
