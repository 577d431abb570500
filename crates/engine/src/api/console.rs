//! Line-oriented console front end.
//!
//! Lines starting with `:` are commands. Anything else is a chat event in the form
//! `<channel> <text>`, as the host game would deliver it.

use std::str::FromStr;

use apbridge_domain::{group_thousands, ChannelId};

use crate::app::App;
use crate::infrastructure::config::ConfigSource;
use crate::use_cases::{PurchaseOutcome, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect using the configured host and slot unless both are given.
    Connect {
        host: Option<String>,
        slot: Option<String>,
        password: Option<String>,
    },
    Disconnect,
    Hint,
    Balance,
    Status,
    Reload,
    Say(String),
    Quit,
    ChatEvent { channel: ChannelId, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command ':{0}'")]
    Unknown(String),

    #[error("Expected '<channel> <text>' or a ':' command")]
    Malformed,

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(':') {
            let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
            let args = args.trim();
            return match name {
                "connect" => parse_connect(args),
                "disconnect" => Ok(Self::Disconnect),
                "hint" => Ok(Self::Hint),
                "balance" => Ok(Self::Balance),
                "status" => Ok(Self::Status),
                "reload" => Ok(Self::Reload),
                "say" if !args.is_empty() => Ok(Self::Say(args.to_string())),
                "say" => Err(CommandError::Usage(":say <text>")),
                "quit" | "exit" => Ok(Self::Quit),
                other => Err(CommandError::Unknown(other.to_string())),
            };
        }

        let (channel, text) = line.split_once(' ').ok_or(CommandError::Malformed)?;
        let channel = channel
            .parse::<u32>()
            .map_err(|_| CommandError::Malformed)?;
        Ok(Self::ChatEvent {
            channel: ChannelId::new(channel),
            text: text.to_string(),
        })
    }
}

fn parse_connect(args: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let owned = |s: &&str| s.to_string();
    match parts.as_slice() {
        [] => Ok(Command::Connect {
            host: None,
            slot: None,
            password: None,
        }),
        [password] => Ok(Command::Connect {
            host: None,
            slot: None,
            password: Some(password.to_string()),
        }),
        [host, slot] => Ok(Command::Connect {
            host: Some(owned(host)),
            slot: Some(owned(slot)),
            password: None,
        }),
        [host, slot, password] => Ok(Command::Connect {
            host: Some(owned(host)),
            slot: Some(owned(slot)),
            password: Some(owned(password)),
        }),
        _ => Err(CommandError::Usage(":connect [host slot] [password]")),
    }
}

/// Executes commands against an [`App`].
pub struct Console<'a> {
    app: &'a App,
}

impl<'a> Console<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Run one input line. Returns false once the user asked to quit.
    pub async fn execute(&self, line: &str) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => false,
            Ok(command) => {
                self.run(command).await;
                true
            }
            Err(e) => {
                self.app.chat.error(&e.to_string());
                true
            }
        }
    }

    async fn run(&self, command: Command) {
        let app = self.app;
        match command {
            Command::Connect {
                host,
                slot,
                password,
            } => {
                let defaults = app.config.current();
                let host = host.unwrap_or_else(|| defaults.connection.host.clone());
                let slot = slot.unwrap_or_else(|| defaults.connection.slot.clone());
                if slot.is_empty() {
                    app.chat
                        .error("No slot configured. Use :connect <host> <slot> [password].");
                    return;
                }
                // Failures are already reported to the chat by the session manager.
                let _ = app.session.connect(&host, &slot, password.as_deref()).await;
            }
            Command::Disconnect => {
                app.scheduler.flush_now().await;
                app.session.disconnect().await;
                app.chat.notice("Disconnected.");
            }
            Command::Hint => match app.hints.purchase().await {
                PurchaseOutcome::Requested(location) => {
                    app.chat.notice(&format!("Requested a hint for location {location}."));
                }
                PurchaseOutcome::NoCandidates => {
                    app.chat.notice("Every remaining location is already hinted.");
                }
                PurchaseOutcome::Unavailable(reason) => {
                    app.chat.error(&format!("Cannot buy a hint: {reason}."));
                }
                PurchaseOutcome::Failed(reason) => {
                    app.chat.error(&format!(
                        "Hint request failed ({reason}); no tokens were spent."
                    ));
                }
            },
            Command::Balance => {
                let snapshot = app.session.snapshot().await;
                app.chat.notice(&format!(
                    "You have {} archipelago tokens.",
                    group_thousands(snapshot.balance)
                ));
            }
            Command::Status => {
                let snapshot = app.session.snapshot().await;
                let target = match (&snapshot.host, &snapshot.slot) {
                    (Some(host), Some(slot)) => format!(" to {host} as {slot}"),
                    _ => String::new(),
                };
                app.chat.notice(&format!(
                    "Session {}{}; {} known hints; {} tokens pending.",
                    snapshot.state,
                    target,
                    snapshot.known_hints.len(),
                    group_thousands(app.scheduler.pending())
                ));
            }
            Command::Reload => match app.config.reload() {
                Ok(()) => app.chat.notice("Configuration reloaded."),
                Err(e) => app.chat.error(&e.to_string()),
            },
            Command::Say(text) => match app.session.send_chat(&text).await {
                Ok(()) | Err(SessionError::NotConnected) => {}
                Err(e) => app.chat.error(&format!("Message not sent: {e}")),
            },
            Command::ChatEvent { channel, text } => {
                app.rewards.on_event(channel, &text);
            }
            Command::Quit => {}
        }
    }
}
