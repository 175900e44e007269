use async_trait::async_trait;

use super::PgStore;
use crate::error::Result;
use crate::models::CinemaScope;
use crate::repository::CinemaRepository;

#[async_trait]
impl CinemaRepository for PgStore {
    async fn screen_scope(&self, screen_id: i64) -> Result<Option<CinemaScope>> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT c.id, c.owner_id FROM screens s JOIN cinemas c ON c.id = s.cinema_id WHERE s.id = $1",
        )
        .bind(screen_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(cinema_id, owner_id)| CinemaScope { cinema_id, owner_id }))
    }

    async fn cinema_owner(&self, cinema_id: i64) -> Result<Option<i64>> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT owner_id FROM cinemas WHERE id = $1")
            .bind(cinema_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
