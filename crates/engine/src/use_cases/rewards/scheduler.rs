//! Debounced token deposits.
//!
//! Rewards tend to arrive in bursts (a duty completion prints several loot lines at
//! once). The scheduler sums them over a fixed window that starts at the first reward
//! and deposits the total once, with one chat notification.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use apbridge_domain::{group_thousands, CURRENCY_DISPLAY_NAME};

use crate::infrastructure::config::ConfigSource;
use crate::infrastructure::ports::HostChat;

/// Where flushed batches go.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn deposit(&self, amount: u64);
}

#[derive(Debug, Default)]
struct PendingBatch {
    accumulated_tokens: u64,
    /// Present while a flush is scheduled for the current window.
    timer: Option<JoinHandle<()>>,
    /// Bumped each time a window is armed. A timer only flushes its own window.
    window: u64,
}

struct SchedulerShared {
    batch: Mutex<PendingBatch>,
    sink: Arc<dyn TokenSink>,
    chat: Arc<dyn HostChat>,
    config: Arc<dyn ConfigSource>,
    runtime: Handle,
}

impl SchedulerShared {
    fn batch(&self) -> MutexGuard<'_, PendingBatch> {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-and-zero the batch and cancel any armed timer.
    fn take_batch(&self) -> u64 {
        let mut batch = self.batch();
        if let Some(timer) = batch.timer.take() {
            timer.abort();
        }
        std::mem::take(&mut batch.accumulated_tokens)
    }

    /// Timer side of a flush. Yields nothing if `window` is no longer the armed one.
    fn take_window(&self, window: u64) -> u64 {
        let mut batch = self.batch();
        if batch.window != window {
            return 0;
        }
        batch.timer = None;
        std::mem::take(&mut batch.accumulated_tokens)
    }

    async fn deliver(&self, total: u64) {
        if total == 0 {
            return;
        }
        self.sink.deposit(total).await;

        let channel = self.config.current().economy.notification_channel;
        let text = format!(
            "You obtain {} {}.",
            group_thousands(total),
            CURRENCY_DISPLAY_NAME
        );
        self.chat.print(channel, &text);
        tracing::info!(total, "Deposited batched tokens");
    }
}

/// Accumulates reward amounts and flushes them once per window.
#[derive(Clone)]
pub struct BatchDepositScheduler {
    shared: Arc<SchedulerShared>,
}

impl BatchDepositScheduler {
    pub fn new(
        sink: Arc<dyn TokenSink>,
        chat: Arc<dyn HostChat>,
        config: Arc<dyn ConfigSource>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                batch: Mutex::new(PendingBatch::default()),
                sink,
                chat,
                config,
                runtime,
            }),
        }
    }

    /// Add `amount` to the current batch, arming the flush timer if it is idle.
    ///
    /// Safe to call from synchronous code; never blocks on the network.
    pub fn add(&self, amount: u64) {
        if amount == 0 {
            return;
        }

        let mut batch = self.shared.batch();
        batch.accumulated_tokens = batch.accumulated_tokens.saturating_add(amount);
        if batch.timer.is_some() {
            return;
        }

        batch.window += 1;
        let armed = batch.window;
        let duration = self.shared.config.current().economy.batch_window();
        let shared = Arc::clone(&self.shared);
        batch.timer = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let total = shared.take_window(armed);
            shared.deliver(total).await;
        }));
        tracing::debug!(amount, ?duration, "Armed token batch window");
    }

    pub fn pending(&self) -> u64 {
        self.shared.batch().accumulated_tokens
    }

    pub fn is_armed(&self) -> bool {
        self.shared.batch().timer.is_some()
    }

    /// Deposit whatever is pending right now and cancel the timer.
    pub async fn flush_now(&self) {
        let total = self.shared.take_batch();
        self.shared.deliver(total).await;
    }
}
