use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{is_foreign_key_violation, parse_column, PgStore};
use crate::error::{AppError, Result};
use crate::models::{NewShowtime, Showtime, ShowtimeStatus};
use crate::repository::ShowtimeRepository;
use crate::services::pricing::PriceTable;

#[derive(sqlx::FromRow)]
struct ShowtimeRow {
    id: i64,
    movie_id: i64,
    screen_id: i64,
    starts_at: DateTime<Utc>,
    status: String,
}

async fn insert_prices(
    conn: &mut sqlx::PgConnection,
    showtime_id: i64,
    prices: &PriceTable,
) -> Result<()> {
    for (seat_type, price) in prices {
        sqlx::query(
            "INSERT INTO showtime_seat_prices (showtime_id, seat_type, price) VALUES ($1, $2, $3)",
        )
        .bind(showtime_id)
        .bind(seat_type.as_str())
        .bind(*price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl PgStore {
    async fn load_prices(&self, showtime_id: i64) -> Result<PriceTable> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT seat_type, price FROM showtime_seat_prices WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(seat_type, price)| Ok((parse_column(&seat_type)?, price)))
            .collect()
    }
}

#[async_trait]
impl ShowtimeRepository for PgStore {
    async fn create(&self, showtime: &NewShowtime) -> Result<Showtime> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ShowtimeRow>(
            r#"
            INSERT INTO showtimes (movie_id, screen_id, starts_at, status)
            VALUES ($1, $2, $3, 'Active')
            RETURNING id, movie_id, screen_id, starts_at, status
            "#,
        )
        .bind(showtime.movie_id)
        .bind(showtime.screen_id)
        .bind(showtime.starts_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::BadRequest("Unknown movie or screen".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        insert_prices(&mut *tx, row.id, &showtime.prices).await?;
        tx.commit().await?;

        tracing::info!("showtime {} created on screen {}", row.id, row.screen_id);

        Ok(Showtime {
            id: row.id,
            movie_id: row.movie_id,
            screen_id: row.screen_id,
            starts_at: row.starts_at,
            status: parse_column(&row.status)?,
            prices: showtime.prices.clone(),
        })
    }

    async fn find(&self, showtime_id: i64) -> Result<Option<Showtime>> {
        let row = sqlx::query_as::<_, ShowtimeRow>(
            "SELECT id, movie_id, screen_id, starts_at, status FROM showtimes WHERE id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let prices = self.load_prices(row.id).await?;
        Ok(Some(Showtime {
            id: row.id,
            movie_id: row.movie_id,
            screen_id: row.screen_id,
            starts_at: row.starts_at,
            status: parse_column(&row.status)?,
            prices,
        }))
    }

    async fn replace_prices(&self, showtime_id: i64, prices: &PriceTable) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM showtimes WHERE id = $1 FOR UPDATE")
            .bind(showtime_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM showtime_seat_prices WHERE showtime_id = $1")
            .bind(showtime_id)
            .execute(&mut *tx)
            .await?;
        insert_prices(&mut *tx, showtime_id, prices).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn set_status(&self, showtime_id: i64, status: ShowtimeStatus) -> Result<bool> {
        let updated = sqlx::query("UPDATE showtimes SET status = $2 WHERE id = $1")
            .bind(showtime_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }
}
