use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;

use crate::catalog::CatalogExtractor;
use crate::context::AppContext;
use crate::diff::CatalogDiff;
use crate::notify::{format_report, DispatchReport, Notifier};
use crate::scraper::PageFetcher;
use crate::snapshot_store::SnapshotStore;
use crate::subscribers::SubscriberRegistry;
use crate::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Fetching,
    Extracting,
    Diffing,
    Notifying,
    Persisting,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStats {
    pub phase: ScanPhase,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub changes_detected: u64,
    pub notifications_sent: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_product_count: usize,
    pub last_fetch_ms: Option<u64>,
    pub last_cycle_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
}

impl Default for ScanStats {
    fn default() -> Self {
        Self {
            phase: ScanPhase::Idle,
            run_count: 0,
            success_count: 0,
            error_count: 0,
            changes_detected: 0,
            notifications_sent: 0,
            last_run: None,
            last_success: None,
            last_error: None,
            last_product_count: 0,
            last_fetch_ms: None,
            last_cycle_ms: None,
            started_at: Utc::now(),
        }
    }
}

impl ScanStats {
    pub fn uptime_seconds(&self) -> u64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds().max(0) as u64
    }
}

/// Result of one completed scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleReport {
    pub products: usize,
    pub diff: CatalogDiff,
    pub dispatch: Option<DispatchReport>,
    pub persisted: bool,
    pub fetch_time_ms: u64,
    pub total_time_ms: u64,
}

impl CycleReport {
    pub fn changed(&self) -> bool {
        self.diff.has_changes()
    }
}

/// Polls the listing page on a fixed interval and announces changes.
pub struct CatalogScanner {
    fetcher: Arc<dyn PageFetcher>,
    extractor: CatalogExtractor,
    notifier: Notifier,
    snapshots: SnapshotStore,
    subscribers: SubscriberRegistry,
    page_url: String,
    interval: Duration,
    stats: Arc<RwLock<ScanStats>>,
}

impl CatalogScanner {
    pub fn new(
        context: &AppContext,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Notifier,
    ) -> Result<Self> {
        let config = &context.config;
        let extractor = CatalogExtractor::new(&config.extractor, &config.scraper.base_url)?;

        Ok(Self {
            fetcher,
            extractor,
            notifier,
            snapshots: context.snapshots.clone(),
            subscribers: context.subscribers.clone(),
            page_url: config.scraper.url.clone(),
            interval: config.scheduler.scan_interval(),
            stats: Arc::clone(&context.scan_stats),
        })
    }

    pub fn stats(&self) -> Arc<RwLock<ScanStats>> {
        Arc::clone(&self.stats)
    }

    /// Scans immediately, then every interval until `shutdown` flips to
    /// `true`. A running cycle is always allowed to finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Catalog scanner started for {} (every {}s)",
            self.page_url,
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            if *shutdown.borrow() {
                break;
            }

            // Failures are recorded in the stats and logged by run_cycle
            let _ = self.run_cycle().await;
            self.set_phase(ScanPhase::Sleeping).await;
        }

        self.set_phase(ScanPhase::Stopped).await;
        tracing::info!("Catalog scanner stopped");
    }

    /// Fetch, extract, diff, notify and persist once.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let start_time = tokio::time::Instant::now();

        let result = self.execute_cycle(start_time).await;

        let mut stats = self.stats.write().await;
        stats.run_count += 1;
        stats.last_run = Some(Utc::now());

        match &result {
            Ok(report) => {
                stats.success_count += 1;
                stats.last_success = stats.last_run;
                stats.last_error = None;
                stats.last_product_count = report.products;
                stats.last_fetch_ms = Some(report.fetch_time_ms);
                stats.last_cycle_ms = Some(report.total_time_ms);
                if report.changed() {
                    stats.changes_detected += 1;
                }
                if let Some(dispatch) = &report.dispatch {
                    stats.notifications_sent += dispatch.delivered as u64;
                }
            }
            Err(e) => {
                stats.error_count += 1;
                stats.last_error = Some(e.to_string());
            }
        }

        result
    }

    async fn execute_cycle(&self, start_time: tokio::time::Instant) -> Result<CycleReport> {
        self.set_phase(ScanPhase::Fetching).await;
        let page = self.fetcher.fetch(&self.page_url).await.map_err(|e| {
            tracing::warn!("Fetching {} failed: {}", self.page_url, e);
            e
        })?;

        self.set_phase(ScanPhase::Extracting).await;
        let current = self.extractor.extract(&page.body).map_err(|e| {
            tracing::warn!("Extracting products from {} failed: {}", page.final_url, e);
            e
        })?;

        // Held until the new snapshot is committed
        let guard = self.snapshots.lock().await;
        let previous = guard.load().await.map_err(|e| {
            tracing::error!("Loading stored products failed: {}", e);
            e
        })?;

        self.set_phase(ScanPhase::Diffing).await;
        let diff = CatalogDiff::compute(&previous, &current);

        let dispatch = if diff.has_changes() {
            tracing::info!(
                "Catalog changed: {} new, {} available, {} unavailable, {} removed, {} price updates",
                diff.newly_listed.len(),
                diff.became_available.len(),
                diff.became_unavailable.len(),
                diff.delisted.len(),
                diff.price_changed.len()
            );

            self.set_phase(ScanPhase::Notifying).await;
            let message = format_report(&diff, &current, &self.page_url);
            match self.notifier.notify_subscribers(&self.subscribers, &message).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::error!("Loading subscribers failed, notification skipped: {}", e);
                    None
                }
            }
        } else {
            tracing::debug!("No changes across {} products", current.len());
            None
        };

        let mut persisted = false;
        if current != previous {
            self.set_phase(ScanPhase::Persisting).await;
            match guard.save(&current).await {
                Ok(_) => persisted = true,
                Err(e) => {
                    tracing::error!(
                        "Persisting products failed, this cycle's changes are lost: {}",
                        e
                    );
                }
            }
        }
        drop(guard);

        let total_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            "Scan of {} products took {}ms (fetch {}ms)",
            current.len(),
            total_time_ms,
            page.response_time_ms
        );

        Ok(CycleReport {
            products: current.len(),
            diff,
            dispatch,
            persisted,
            fetch_time_ms: page.response_time_ms,
            total_time_ms,
        })
    }

    async fn set_phase(&self, phase: ScanPhase) {
        self.stats.write().await.phase = phase;
    }
}
