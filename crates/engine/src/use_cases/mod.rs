//! Use cases - user story orchestration.
//!
//! Each module wires domain logic to the infrastructure ports:
//!
//! - `session` - connection lifecycle, balance and known hints
//! - `rewards` - chat ingestion, reward pricing and batched deposits
//! - `hints` - hint purchases
//! - `display` - which server prints reach the host chat

pub mod display;
pub mod hints;
pub mod rewards;
pub mod session;

pub use display::ServerMessageFilter;
pub use hints::{HintPurchaseCoordinator, PurchaseOutcome, UnavailableReason};
pub use rewards::{BatchDepositScheduler, RewardPipeline, TokenSink};
pub use session::{
    ConnectionError, ConnectionState, ConnectionStateObserver, SessionError, SessionManager,
    SessionSnapshot,
};
