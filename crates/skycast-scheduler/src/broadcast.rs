//! Broadcast: deliver one text to every registered recipient, then prune
//! the ones that failed.
//!
//! The recipient list is snapshotted before the loop and failures are
//! collected separately, so the registry is never mutated mid-iteration.
//! A recipient is dropped on its first failed delivery; there are no retries.

use std::sync::Arc;

use skycast_core::error::Result;
use skycast_core::traits::MessageSink;
use skycast_core::types::RecipientId;

use crate::store::RecipientStore;

/// What happened during one broadcast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastSummary {
    pub delivered: Vec<RecipientId>,
    pub pruned: Vec<RecipientId>,
}

impl BroadcastSummary {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.pruned.len()
    }
}

pub struct Broadcaster {
    store: Arc<RecipientStore>,
    sink: Arc<dyn MessageSink>,
}

impl Broadcaster {
    pub fn new(store: Arc<RecipientStore>, sink: Arc<dyn MessageSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &Arc<RecipientStore> {
        &self.store
    }

    /// Send `text` to everyone registered right now.
    ///
    /// Delivery errors never escape; they only cause pruning. The one error
    /// returned is a failure to persist the pruned registry.
    pub async fn broadcast(&self, text: &str) -> Result<BroadcastSummary> {
        let recipients = self.store.snapshot().await;
        if recipients.is_empty() {
            tracing::debug!("📭 Broadcast skipped: no recipients");
            return Ok(BroadcastSummary::default());
        }

        let mut summary = BroadcastSummary::default();
        for recipient in recipients {
            match self.sink.send(recipient, text).await {
                Ok(()) => summary.delivered.push(recipient),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ {} delivery to {recipient} failed, pruning: {e}",
                        self.sink.name()
                    );
                    summary.pruned.push(recipient);
                }
            }
        }

        if !summary.pruned.is_empty() {
            let removed = self.store.remove_all(&summary.pruned).await?;
            tracing::info!("🧹 Pruned {removed} unreachable recipient(s)");
        }

        tracing::info!(
            "📣 Broadcast done: {} delivered, {} pruned",
            summary.delivered.len(),
            summary.pruned.len()
        );
        Ok(summary)
    }
}
