//! The host game's chat surface.

use apbridge_domain::ChannelId;

/// Where the bridge writes text the player should see.
///
/// `print` targets a specific game chat channel (token notifications land here so they
/// flow back through the same feed the classifier watches). `notice` and `error` are
/// the bridge's own status lines.
pub trait HostChat: Send + Sync {
    fn print(&self, channel: ChannelId, text: &str);
    fn notice(&self, text: &str);
    fn error(&self, text: &str);
}
