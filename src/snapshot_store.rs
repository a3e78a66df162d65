use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::database::Database;
use crate::models::{ProductRecord, Snapshot};
use crate::Result;

const SELECT_PRODUCTS: &str = "SELECT name, price, page_url, available FROM products ORDER BY name";
const UPSERT_PRODUCT: &str = "
    INSERT INTO products (name, price, page_url, available) VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(name) DO UPDATE SET
        price = excluded.price,
        page_url = excluded.page_url,
        available = excluded.available";
const DELETE_PRODUCT: &str = "DELETE FROM products WHERE name = ?1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub upserted: usize,
    pub removed: usize,
}

/// Durable copy of the last observed catalog.
///
/// Writers are serialized by an internal lock; a scan cycle holds it from
/// loading the previous snapshot until the new one is committed.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    database: Database,
    write_lock: Arc<Mutex<()>>,
}

/// Exclusive access to the stored snapshot for a read-then-write sequence.
pub struct SnapshotGuard<'a> {
    store: &'a SnapshotStore,
    _guard: MutexGuard<'a, ()>,
}

impl SnapshotStore {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Reads the current snapshot without taking the write lock. A single
    /// SELECT always observes a committed state.
    pub async fn load(&self) -> Result<Snapshot> {
        let records = sqlx::query_as::<_, ProductRecord>(SELECT_PRODUCTS)
            .fetch_all(self.database.pool())
            .await?;

        Ok(records.into_iter().collect())
    }

    pub async fn lock(&self) -> SnapshotGuard<'_> {
        SnapshotGuard {
            store: self,
            _guard: self.write_lock.lock().await,
        }
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<PersistSummary> {
        self.lock().await.save(snapshot).await
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<PersistSummary> {
        let mut tx = self.database.pool().begin().await?;

        let stored: Vec<(String,)> = sqlx::query_as("SELECT name FROM products")
            .fetch_all(&mut *tx)
            .await?;

        let mut summary = PersistSummary::default();

        for (name,) in stored.iter().filter(|(name,)| !snapshot.contains(name)) {
            sqlx::query(DELETE_PRODUCT).bind(name).execute(&mut *tx).await?;
            summary.removed += 1;
        }

        for (name, listing) in snapshot.iter() {
            sqlx::query(UPSERT_PRODUCT)
                .bind(name)
                .bind(&listing.price)
                .bind(&listing.page_url)
                .bind(listing.available)
                .execute(&mut *tx)
                .await?;
            summary.upserted += 1;
        }

        tx.commit().await?;

        tracing::debug!(
            "Persisted snapshot: {} upserted, {} removed",
            summary.upserted,
            summary.removed
        );
        Ok(summary)
    }
}

impl SnapshotGuard<'_> {
    pub async fn load(&self) -> Result<Snapshot> {
        self.store.load().await
    }

    /// Replaces the stored snapshot in one transaction.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<PersistSummary> {
        self.store.write(snapshot).await
    }
}
