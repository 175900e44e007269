use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::{info, warn};

fn seat_map_key(showtime_id: i64) -> String {
    format!("showtime_seats:{}", showtime_id)
}

impl CacheService {
    /// Схема зала сеанса в виде готового JSON ответа.
    pub async fn get_seat_map(&self, showtime_id: i64) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.get(seat_map_key(showtime_id)).await
    }

    pub async fn save_seat_map(&self, showtime_id: i64, json: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.set_ex(seat_map_key(showtime_id), json, self.seat_map_ttl).await
    }

    // Вызывается после каждой брони и отмены
    pub async fn invalidate_seat_map(&self, showtime_id: i64) {
        let mut conn = self.redis.conn.clone();
        let res: Result<(), _> = conn.del(seat_map_key(showtime_id)).await;
        match res {
            Ok(()) => info!("Invalidated seat map cache for showtime {}", showtime_id),
            Err(e) => warn!("Failed to invalidate seat map for showtime {}: {:?}", showtime_id, e),
        }
    }
}
