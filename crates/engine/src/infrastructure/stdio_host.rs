//! Host chat backed by the terminal.

use std::io::Write;

use apbridge_domain::ChannelId;

use crate::infrastructure::ports::HostChat;

/// Writes game-channel lines and notices to stdout, errors to stderr.
#[derive(Debug, Default)]
pub struct StdioHost;

impl StdioHost {
    pub fn new() -> Self {
        Self
    }
}

impl HostChat for StdioHost {
    fn print(&self, channel: ChannelId, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[{channel}] {text}");
    }

    fn notice(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[Archipelago] {text}");
    }

    fn error(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        for line in text.lines() {
            let _ = writeln!(err, "[Archipelago] {line}");
        }
    }
}
