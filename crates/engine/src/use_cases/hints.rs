//! Spending tokens on hints.

use std::fmt;
use std::sync::Arc;

use apbridge_domain::{choose_candidate, hint_candidates, LocationId};

use crate::infrastructure::config::ConfigSource;
use crate::infrastructure::ports::RandomPort;
use crate::use_cases::session::{ConnectionState, SessionError, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotConnected,
    InsufficientBalance { balance: u64, cost: u64 },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => f.write_str("not connected to a server"),
            Self::InsufficientBalance { balance, cost } => {
                write!(f, "a hint costs {cost} tokens but you have {balance}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Unavailable(UnavailableReason),
    /// Every missing location is already hinted.
    NoCandidates,
    Requested(LocationId),
    /// The request could not be sent; nothing was charged.
    Failed(String),
}

/// Buys a hint for a random unhinted location of the local slot.
pub struct HintPurchaseCoordinator {
    session: SessionManager,
    random: Arc<dyn RandomPort>,
    config: Arc<dyn ConfigSource>,
}

impl HintPurchaseCoordinator {
    pub fn new(
        session: SessionManager,
        random: Arc<dyn RandomPort>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            session,
            random,
            config,
        }
    }

    /// Whether a purchase would currently pass its preconditions.
    pub async fn is_available(&self) -> bool {
        self.unavailable_reason().await.is_none()
    }

    async fn unavailable_reason(&self) -> Option<UnavailableReason> {
        let cost = self.config.current().economy.hint_cost;
        let snapshot = self.session.snapshot().await;
        if snapshot.state != ConnectionState::Connected {
            return Some(UnavailableReason::NotConnected);
        }
        if snapshot.balance < cost {
            return Some(UnavailableReason::InsufficientBalance {
                balance: snapshot.balance,
                cost,
            });
        }
        None
    }

    pub async fn purchase(&self) -> PurchaseOutcome {
        if let Some(reason) = self.unavailable_reason().await {
            tracing::debug!(%reason, "Hint purchase unavailable");
            return PurchaseOutcome::Unavailable(reason);
        }

        let known = self.session.snapshot().await.known_hints;
        let missing = self.session.missing_locations().await;
        let candidates = hint_candidates(&missing, &known);
        let Some(location) = choose_candidate(&candidates, |len| self.random.pick_index(len))
        else {
            tracing::info!("No unhinted locations left");
            return PurchaseOutcome::NoCandidates;
        };

        let cost = self.config.current().economy.hint_cost;
        match self.session.purchase_hint(cost, location).await {
            Ok(_) => PurchaseOutcome::Requested(location),
            Err(SessionError::InsufficientBalance { balance, cost }) => {
                PurchaseOutcome::Unavailable(UnavailableReason::InsufficientBalance {
                    balance,
                    cost,
                })
            }
            Err(SessionError::NotConnected) => {
                PurchaseOutcome::Unavailable(UnavailableReason::NotConnected)
            }
            Err(SessionError::Transport(e)) => {
                tracing::warn!(%location, "Hint request failed: {}", e);
                PurchaseOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::BridgeConfig;
    use crate::infrastructure::ports::{
        MockRandomPort, MockRemoteConnector, MockRemoteSession, RemoteEvent, TransportError,
    };
    use crate::infrastructure::random::FixedRandom;
    use crate::test_fixtures::{
        connector_for, handshake_session, live_config, EventTap, RecordingChat,
    };
    use apbridge_domain::{Hint, SlotId};
    use mockall::predicate::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn locations(ids: &[i64]) -> BTreeSet<LocationId> {
        ids.iter().copied().map(LocationId::new).collect()
    }

    async fn connected(remote: MockRemoteSession) -> (SessionManager, EventTap) {
        let (connector, events) = connector_for(remote);
        let session = SessionManager::new(
            Arc::new(connector),
            RecordingChat::new(),
            live_config(BridgeConfig::default()),
        );
        session
            .connect("localhost", "Alice", None)
            .await
            .expect("connect");
        (session, events)
    }

    fn coordinator(
        session: &SessionManager,
        random: impl RandomPort + 'static,
    ) -> HintPurchaseCoordinator {
        HintPurchaseCoordinator::new(
            session.clone(),
            Arc::new(random),
            live_config(BridgeConfig::default()),
        )
    }

    #[tokio::test]
    async fn insufficient_balance_sends_nothing() {
        let mut remote = handshake_session(1, 500);
        remote.expect_scout_as_hint().never();
        remote.expect_write_counter().never();
        let (session, _events) = connected(remote).await;
        let mut random = MockRandomPort::new();
        random.expect_pick_index().never();
        let hints = coordinator(&session, random);

        assert!(!hints.is_available().await);
        assert_eq!(
            hints.purchase().await,
            PurchaseOutcome::Unavailable(UnavailableReason::InsufficientBalance {
                balance: 500,
                cost: 1000
            })
        );
    }

    #[tokio::test]
    async fn not_connected_is_unavailable() {
        let session = SessionManager::new(
            Arc::new(MockRemoteConnector::new()),
            RecordingChat::new(),
            live_config(BridgeConfig::default()),
        );
        let hints = coordinator(&session, FixedRandom(0));

        assert_eq!(
            hints.purchase().await,
            PurchaseOutcome::Unavailable(UnavailableReason::NotConnected)
        );
    }

    #[tokio::test]
    async fn known_hints_are_never_drawn() {
        let mut remote = handshake_session(1, 5000);
        remote
            .expect_missing_locations()
            .returning(|| locations(&[41, 42, 43]));
        remote.expect_write_counter().returning(|_, _| Ok(()));
        remote
            .expect_scout_as_hint()
            .with(eq(LocationId::new(43)))
            .times(1)
            .returning(|_| Ok(()));
        let (session, events) = connected(remote).await;

        events
            .sender()
            .send(RemoteEvent::HintsUpdated(vec![Hint {
                location: LocationId::new(42),
                finding_player: SlotId::new(1),
                receiving_player: SlotId::new(2),
                item: 9,
                found: false,
            }]))
            .expect("pump alive");
        for _ in 0..1000 {
            if session
                .snapshot()
                .await
                .known_hints
                .contains(LocationId::new(42))
            {
                break;
            }
            tokio::task::yield_now().await;
        }

        // Candidates are [41, 43]; index 1 picks 43.
        let mut random = MockRandomPort::new();
        random
            .expect_pick_index()
            .with(eq(2))
            .times(1)
            .returning(|_| 1);
        let hints = coordinator(&session, random);

        assert_eq!(
            hints.purchase().await,
            PurchaseOutcome::Requested(LocationId::new(43))
        );
        assert_eq!(session.snapshot().await.balance, 4000);
    }

    #[tokio::test]
    async fn everything_hinted_means_no_candidates() {
        let mut remote = handshake_session(1, 5000);
        remote.expect_missing_locations().returning(BTreeSet::new);
        remote.expect_write_counter().never();
        let (session, _events) = connected(remote).await;
        let hints = coordinator(&session, FixedRandom(0));

        assert_eq!(hints.purchase().await, PurchaseOutcome::NoCandidates);
        assert_eq!(session.snapshot().await.balance, 5000);
    }

    #[tokio::test]
    async fn failed_request_leaves_stored_balance_untouched() {
        let persisted = Arc::new(AtomicI64::new(1000));
        let mut remote = handshake_session(1, 1000);
        remote
            .expect_missing_locations()
            .returning(|| locations(&[7]));
        {
            let persisted = Arc::clone(&persisted);
            remote.expect_write_counter().returning(move |_, value| {
                persisted.store(value, Ordering::SeqCst);
                Err(TransportError::Closed)
            });
        }
        remote
            .expect_scout_as_hint()
            .times(1)
            .returning(|_| Err(TransportError::Closed));
        let (session, _events) = connected(remote).await;
        let hints = coordinator(&session, FixedRandom(0));

        let outcome = hints.purchase().await;

        assert_eq!(outcome, PurchaseOutcome::Failed("Connection closed".into()));
        assert_eq!(session.snapshot().await.balance, 1000);
        assert_eq!(persisted.load(Ordering::SeqCst), 1000);
    }
}
