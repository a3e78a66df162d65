pub mod report;

pub use report::{format_current_listing, format_report};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Subscriber;
use crate::subscribers::SubscriberRegistry;
use crate::Result;

/// Delivers a text message to a single recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub recipient: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Fans a message out to every subscriber.
///
/// A failed delivery is logged and recorded; it never stops delivery to
/// the remaining recipients and is not retried.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    concurrency: usize,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, concurrency: usize) -> Self {
        Self {
            messenger,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn notify_subscribers(
        &self,
        registry: &SubscriberRegistry,
        text: &str,
    ) -> Result<DispatchReport> {
        let recipients = registry.list().await?;
        Ok(self.dispatch(&recipients, text).await)
    }

    pub async fn dispatch(&self, recipients: &[Subscriber], text: &str) -> DispatchReport {
        let ids: Vec<i64> = recipients.iter().map(|subscriber| subscriber.id).collect();
        let results: Vec<_> = stream::iter(ids)
            .map(|id| {
                let messenger = Arc::clone(&self.messenger);
                async move { (id, messenger.send(id, text).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for (recipient, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to notify {}: {}", recipient, e);
                    report.failed.push(DeliveryFailure {
                        recipient,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.failed.sort_by_key(|failure| failure.recipient);

        tracing::info!(
            "Notification delivered to {}/{} subscribers",
            report.delivered,
            report.attempted()
        );
        report
    }
}
