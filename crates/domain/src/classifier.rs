//! Chat line classification.
//!
//! Turns one host chat line into at most one [`ParsedReward`]. Everything that is
//! not a reward announcement falls out as a [`Classification`] variant so callers
//! can decide which outcomes deserve a diagnostic.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::ids::ChannelId;
use crate::reward::ParsedReward;

/// Lines that do not start with this are never considered.
pub const REWARD_PREFIX: &str = "You obtain";

/// Display name of the token currency. Our own deposit notification uses it, so a
/// reward with this name is the bridge hearing itself.
pub const CURRENCY_DISPLAY_NAME: &str = "archipelago tokens";

// Optional article, optional comma-grouped quantity, item name, final period.
static REWARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^You obtain (?:an? )?(?:([0-9][0-9,]*) )?([A-Za-z0-9 '()]+)\.$")
        .expect("valid regex")
});

/// Outcome of classifying one chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not a reward announcement.
    Ignored,
    /// Reward-looking text on a channel outside the accepted set.
    ChannelRejected(ChannelId),
    /// Accepted channel, but the text does not fit the reward grammar.
    ParseMismatch { sanitized: String },
    /// Our own token notification coming back through the chat stream.
    SelfNotification,
    Reward(ParsedReward),
}

/// Stateless classifier bound to one snapshot of the accepted channel list.
#[derive(Debug, Clone, Copy)]
pub struct MessageClassifier<'a> {
    accepted_channels: &'a [ChannelId],
}

impl<'a> MessageClassifier<'a> {
    pub fn new(accepted_channels: &'a [ChannelId]) -> Self {
        Self { accepted_channels }
    }

    pub fn classify(&self, channel: ChannelId, text: &str) -> Classification {
        if !text.starts_with(REWARD_PREFIX) {
            return Classification::Ignored;
        }

        if !self.accepted_channels.contains(&channel) {
            return Classification::ChannelRejected(channel);
        }

        let sanitized = sanitize(text);
        match parse_reward(&sanitized) {
            Some(reward) if reward.item_name == CURRENCY_DISPLAY_NAME => {
                Classification::SelfNotification
            }
            Some(reward) => Classification::Reward(reward),
            None => Classification::ParseMismatch { sanitized },
        }
    }
}

/// Drop icon glyphs and other non-ASCII decoration the game embeds in chat text.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Match a sanitized line against the reward grammar.
pub fn parse_reward(sanitized: &str) -> Option<ParsedReward> {
    let caps = REWARD_RE.captures(sanitized)?;

    let quantity = match caps.get(1) {
        Some(digits) => digits.as_str().replace(',', "").parse::<u64>().ok()?,
        None => 1,
    };
    if quantity == 0 {
        return None;
    }

    let item_name = caps.get(2)?.as_str().trim();
    if item_name.is_empty() {
        return None;
    }

    Some(ParsedReward::new(item_name, quantity))
}
