use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::database::Database;
use crate::scheduler::ScanStats;
use crate::snapshot_store::SnapshotStore;
use crate::subscribers::SubscriberRegistry;
use crate::Result;

/// Shared handles passed to the scanner, the command poller and the
/// status server.
#[derive(Clone, Debug)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub database: Database,
    pub snapshots: SnapshotStore,
    pub subscribers: SubscriberRegistry,
    pub scan_stats: Arc<RwLock<ScanStats>>,
}

impl AppContext {
    pub fn new(config: AppConfig, database: Database) -> Self {
        Self {
            config: Arc::new(config),
            snapshots: SnapshotStore::new(database.clone()),
            subscribers: SubscriberRegistry::new(database.clone()),
            database,
            scan_stats: Arc::new(RwLock::new(ScanStats::default())),
        }
    }

    pub async fn connect(config: AppConfig) -> Result<Self> {
        let database = Database::connect(&config.database).await?;
        Ok(Self::new(config, database))
    }
}
