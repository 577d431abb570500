//! Which server print messages reach the host chat.

use apbridge_domain::SlotId;
use apbridge_shared::{PrintKind, PrintMessage};

use crate::infrastructure::config::DisplayConfig;

/// Applies the display toggles to server print messages for one local slot.
pub struct ServerMessageFilter<'a> {
    display: &'a DisplayConfig,
    local_slot: SlotId,
}

impl<'a> ServerMessageFilter<'a> {
    pub fn new(display: &'a DisplayConfig, local_slot: SlotId) -> Self {
        Self {
            display,
            local_slot,
        }
    }

    /// Render `message` if it should be shown, resolving player ids through `alias_of`.
    pub fn render(
        &self,
        message: &PrintMessage,
        alias_of: impl Fn(SlotId) -> Option<String>,
    ) -> Option<String> {
        let text = message.render(alias_of);
        self.should_display(message, &text).then_some(text)
    }

    pub fn should_display(&self, message: &PrintMessage, rendered: &str) -> bool {
        match &message.kind {
            PrintKind::Chat | PrintKind::ServerChat => self.display.chat_messages,
            // Hints are item messages too, so they also need a local sender or receiver.
            PrintKind::Hint => {
                (self.display.found_hints || !rendered.trim_end().ends_with("(found)"))
                    && self.involves_local_slot(message)
            }
            PrintKind::Join | PrintKind::Part => self.display.join_leave_messages,
            PrintKind::ItemSend => self.involves_local_slot(message),
            PrintKind::Plain | PrintKind::Other(_) => true,
        }
    }

    /// Sent items follow the sent toggle even when we are also the receiver.
    fn involves_local_slot(&self, message: &PrintMessage) -> bool {
        if message.sender == Some(self.local_slot) {
            self.display.item_sent_messages
        } else if message.receiving == Some(self.local_slot) {
            self.display.item_received_messages
        } else {
            false
        }
    }
}
