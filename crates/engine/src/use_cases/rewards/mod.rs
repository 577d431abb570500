//! Reward use cases: turning obtained-item chat lines into batched token deposits.

mod pipeline;
mod scheduler;

pub use pipeline::RewardPipeline;
pub use scheduler::{BatchDepositScheduler, TokenSink};

#[cfg(test)]
pub use scheduler::MockTokenSink;
