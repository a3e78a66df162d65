use std::sync::Arc;
use tokio::sync::Mutex;

use crate::database::Database;
use crate::models::{SubscribeOutcome, Subscriber, UnsubscribeOutcome};
use crate::Result;

/// Recipients of change notifications, backed by the `subscribers` table.
///
/// Each mutation is a single statement, so a crash can never leave a
/// partially written entry. Writes are additionally serialized so that
/// concurrent command handlers observe a consistent outcome.
#[derive(Clone, Debug)]
pub struct SubscriberRegistry {
    database: Database,
    write_lock: Arc<Mutex<()>>,
}

impl SubscriberRegistry {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn subscribe(&self, id: i64, name: &str) -> Result<SubscribeOutcome> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "INSERT INTO subscribers (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .execute(self.database.pool())
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Subscriber {} already registered", id);
            Ok(SubscribeOutcome::AlreadySubscribed)
        } else {
            tracing::info!("Subscribed {} ({})", name, id);
            Ok(SubscribeOutcome::Subscribed)
        }
    }

    pub async fn unsubscribe(&self, id: i64) -> Result<UnsubscribeOutcome> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?1")
            .bind(id)
            .execute(self.database.pool())
            .await?;

        if result.rows_affected() == 0 {
            Ok(UnsubscribeOutcome::NotSubscribed)
        } else {
            tracing::info!("Unsubscribed {}", id);
            Ok(UnsubscribeOutcome::Removed)
        }
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>> {
        let subscribers =
            sqlx::query_as::<_, Subscriber>("SELECT id, name FROM subscribers ORDER BY id")
                .fetch_all(self.database.pool())
                .await?;

        Ok(subscribers)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers")
            .fetch_one(self.database.pool())
            .await?;

        Ok(count)
    }
}
