//! Readiness probe over the shared Redis connection.

use redis::aio::ConnectionManager;
use rideshare_web::ReadinessProbe;

/// Ready when Redis answers `PING`.
#[derive(Clone)]
pub struct RedisProbe {
    conn: ConnectionManager,
}

impl RedisProbe {
    /// Probe over `conn`.
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl ReadinessProbe for RedisProbe {
    async fn check(&self) -> Result<(), String> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| format!("Redis unreachable: {e}"))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(format!("Unexpected PING reply: {pong}"))
        }
    }
}
