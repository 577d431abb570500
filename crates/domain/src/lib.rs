//! ApBridge Domain - the vocabulary of the token economy.
//!
//! Pure types and functions: chat line classification, reward rules, token amounts and
//! hint bookkeeping. Nothing in here touches the network or a runtime.

pub mod classifier;
pub mod error;
pub mod format;
pub mod hints;
pub mod ids;
pub mod reward;

pub use classifier::{Classification, MessageClassifier, CURRENCY_DISPLAY_NAME, REWARD_PREFIX};
pub use error::DomainError;
pub use format::group_thousands;
pub use hints::{choose_candidate, hint_candidates, Hint, KnownHints};
pub use ids::{ChannelId, LocationId, SlotId, TeamId};
pub use reward::{compute_amount, ParsedReward, RewardMapper, RewardRule};
