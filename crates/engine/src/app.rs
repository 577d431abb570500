//! Application state and composition.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::infrastructure::config::{ConfigSource, LiveConfig};
use crate::infrastructure::ports::{HostChat, RandomPort, RemoteConnector};
use crate::use_cases::{
    BatchDepositScheduler, HintPurchaseCoordinator, RewardPipeline, SessionManager,
};

/// Main application state.
///
/// Wires the ports into the use cases. Entry points (the console runner, a plugin
/// host) hold one of these and forward user actions and chat events to it.
pub struct App {
    pub config: Arc<LiveConfig>,
    pub chat: Arc<dyn HostChat>,
    pub session: SessionManager,
    pub scheduler: BatchDepositScheduler,
    pub rewards: RewardPipeline,
    pub hints: HintPurchaseCoordinator,
}

impl App {
    pub fn new(
        config: Arc<LiveConfig>,
        connector: Arc<dyn RemoteConnector>,
        chat: Arc<dyn HostChat>,
        random: Arc<dyn RandomPort>,
        runtime: Handle,
    ) -> Self {
        let source: Arc<dyn ConfigSource> = config.clone();
        let session = SessionManager::new(connector, chat.clone(), source.clone());
        let scheduler = BatchDepositScheduler::new(
            Arc::new(session.clone()),
            chat.clone(),
            source.clone(),
            runtime,
        );
        let rewards = RewardPipeline::new(
            source.clone(),
            session.observer(),
            scheduler.clone(),
            chat.clone(),
        );
        let hints = HintPurchaseCoordinator::new(session.clone(), random, source);

        Self {
            config,
            chat,
            session,
            scheduler,
            rewards,
            hints,
        }
    }

    /// Detach from chat, deposit anything still batched, then close the session.
    pub async fn shutdown(&self) {
        self.rewards.detach();
        self.scheduler.flush_now().await;
        self.session.disconnect().await;
    }
}
