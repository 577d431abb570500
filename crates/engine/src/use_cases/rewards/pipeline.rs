//! Chat ingestion: classify, price and batch obtained-item lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use apbridge_domain::{ChannelId, Classification, MessageClassifier, RewardMapper};

use super::scheduler::BatchDepositScheduler;
use crate::infrastructure::config::ConfigSource;
use crate::infrastructure::ports::HostChat;
use crate::use_cases::session::ConnectionStateObserver;

/// Receives every chat line from the host while attached.
pub struct RewardPipeline {
    config: Arc<dyn ConfigSource>,
    session: ConnectionStateObserver,
    scheduler: BatchDepositScheduler,
    chat: Arc<dyn HostChat>,
    attached: AtomicBool,
}

impl RewardPipeline {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        session: ConnectionStateObserver,
        scheduler: BatchDepositScheduler,
        chat: Arc<dyn HostChat>,
    ) -> Self {
        Self {
            config,
            session,
            scheduler,
            chat,
            attached: AtomicBool::new(false),
        }
    }

    pub fn attach(&self) {
        if !self.attached.swap(true, Ordering::SeqCst) {
            tracing::debug!("Reward pipeline attached");
        }
    }

    /// Stop accepting events. Pending tokens stay in the scheduler until flushed.
    pub fn detach(&self) {
        if self.attached.swap(false, Ordering::SeqCst) {
            tracing::debug!("Reward pipeline detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Handle one chat line. Returns the token amount queued, if any.
    pub fn on_event(&self, channel: ChannelId, text: &str) -> Option<u64> {
        if !self.is_attached() || !self.session.is_connected() {
            return None;
        }

        let config = self.config.current();
        let classifier = MessageClassifier::new(&config.questing.chat_types);
        match classifier.classify(channel, text) {
            Classification::Ignored | Classification::SelfNotification => None,
            Classification::ChannelRejected(channel) => {
                tracing::debug!(%channel, "Obtained-item line on unaccepted channel");
                if config.is_development() {
                    self.chat
                        .error(&format!("[Obtained Item Message Type Fail]: {channel}"));
                }
                None
            }
            Classification::ParseMismatch { sanitized } => {
                tracing::debug!(text = %sanitized, "Obtained-item line did not parse");
                if config.is_development() {
                    self.chat
                        .error(&format!("[Obtained Item Match Fail]: {sanitized}"));
                }
                None
            }
            Classification::Reward(reward) => {
                let Some(amount) = RewardMapper::new(&config.questing.items).amount_for(&reward)
                else {
                    tracing::debug!(item = %reward.item_name, "No reward rule for item");
                    return None;
                };
                tracing::debug!(
                    item = %reward.item_name,
                    quantity = reward.quantity,
                    amount,
                    "Queued reward"
                );
                self.scheduler.add(amount);
                Some(amount)
            }
        }
    }
}
