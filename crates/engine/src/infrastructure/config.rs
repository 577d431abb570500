//! Bridge configuration.
//!
//! Loaded from a TOML file (optional) overlaid with `APBRIDGE__SECTION__KEY` environment
//! variables. Consumers hold an `Arc<dyn ConfigSource>` and take a fresh snapshot per
//! operation, so `LiveConfig::reload` takes effect without restarting anything.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use apbridge_domain::{ChannelId, DomainError, RewardRule};

/// Chat type of the game's system/loot messages.
pub const SYSTEM_MESSAGE_CHANNEL: ChannelId = ChannelId::new(2110);
/// Chat type the bridge prints token notifications on.
pub const NOTIFICATION_CHANNEL: ChannelId = ChannelId::new(2238);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] DomainError),

    #[error("No configuration file to reload from")]
    NoSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    /// Surfaces classifier diagnostics in the host chat.
    Development,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub environment: Environment,
    pub connection: ConnectionConfig,
    pub questing: QuestingConfig,
    pub display: DisplayConfig,
    pub economy: EconomyConfig,
}

impl BridgeConfig {
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for rule in &self.questing.items {
            rule.validate()?;
        }
        if self.economy.batch_window_ms == 0 {
            return Err(DomainError::validation(
                "economy.batch_window_ms must be greater than zero",
            ));
        }
        if self.economy.token_key.trim().is_empty() {
            return Err(DomainError::validation("economy.token_key cannot be empty"));
        }
        Ok(())
    }
}

/// Last-used server address and slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub slot: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub close_grace_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "archipelago.gg:38281".to_string(),
            slot: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 10,
            close_grace_ms: 2000,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

/// Which chat lines count as rewards and what they are worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestingConfig {
    pub chat_types: Vec<ChannelId>,
    pub items: Vec<RewardRule>,
}

impl Default for QuestingConfig {
    fn default() -> Self {
        Self {
            chat_types: vec![SYSTEM_MESSAGE_CHANNEL, NOTIFICATION_CHANNEL],
            items: Vec::new(),
        }
    }
}

/// Which server prints reach the host chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub chat_messages: bool,
    pub found_hints: bool,
    pub join_leave_messages: bool,
    pub item_sent_messages: bool,
    pub item_received_messages: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            chat_messages: true,
            found_hints: true,
            join_leave_messages: true,
            item_sent_messages: true,
            item_received_messages: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub hint_cost: u64,
    pub batch_window_ms: u64,
    /// Suffix of the slot-scoped data storage key holding the balance.
    pub token_key: String,
    pub notification_channel: ChannelId,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            hint_cost: 1000,
            batch_window_ms: 500,
            token_key: "ArchipendiumTokens".to_string(),
            notification_channel: NOTIFICATION_CHANNEL,
        }
    }
}

impl EconomyConfig {
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }
}

/// Read access to the current configuration snapshot.
pub trait ConfigSource: Send + Sync {
    fn current(&self) -> Arc<BridgeConfig>;
}

/// Build a config from an optional file plus the environment.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("APBRIDGE")
            .prefix_separator("__")
            .separator("__"),
    );

    let loaded: BridgeConfig = builder.build()?.try_deserialize()?;
    loaded.validate()?;
    Ok(loaded)
}

/// Swappable configuration shared by every component.
pub struct LiveConfig {
    current: RwLock<Arc<BridgeConfig>>,
    path: Option<PathBuf>,
}

impl LiveConfig {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
            path: None,
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let loaded = load_config(Some(&path))?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(Self {
            current: RwLock::new(Arc::new(loaded)),
            path: Some(path),
        })
    }

    pub fn replace(&self, config: BridgeConfig) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Re-read the file this config was loaded from. On error the old snapshot stays.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::NoSource)?;
        let loaded = load_config(Some(path))?;
        self.replace(loaded);
        tracing::info!(path = %path.display(), "Reloaded configuration");
        Ok(())
    }
}

impl ConfigSource for LiveConfig {
    fn current(&self) -> Arc<BridgeConfig> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_match_game_channels() {
        let config = BridgeConfig::default();

        assert_eq!(
            config.questing.chat_types,
            vec![ChannelId::new(2110), ChannelId::new(2238)]
        );
        assert_eq!(config.economy.hint_cost, 1000);
        assert_eq!(config.economy.batch_window(), Duration::from_millis(500));
        // Same key as existing Archipendium slots.
        assert_eq!(config.economy.token_key, "ArchipendiumTokens");
        assert_eq!(config.connection.close_grace(), Duration::from_secs(2));
        assert!(!config.is_development());
    }

    #[test]
    fn loads_reward_rules_from_file() {
        let file = write_config(
            r#"
environment = "development"

[connection]
host = "localhost:38281"
slot = "Alice"

[[questing.items]]
name = "Allagan Tomestones of Poetics"
multiplier = 0.5

[[questing.items]]
name = "gil"
multiplier = 0.01
"#,
        );

        let config = load_config(Some(file.path())).expect("config loads");

        assert!(config.is_development());
        assert_eq!(config.connection.slot, "Alice");
        assert_eq!(config.questing.items.len(), 2);
        assert_eq!(config.questing.items[1].multiplier, 0.01);
        // Untouched sections keep their defaults.
        assert_eq!(config.economy.hint_cost, 1000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(Some(&dir.path().join("absent.toml"))).expect("defaults");
        assert_eq!(config.economy, EconomyConfig::default());
    }

    #[test]
    fn rejects_unnamed_reward_rule() {
        let file = write_config(
            r#"
[[questing.items]]
name = " "
multiplier = 1.0
"#,
        );

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reload_swaps_snapshot_but_keeps_old_handles() {
        let file = write_config("[economy]\nhint_cost = 250\n");
        let live = LiveConfig::load(file.path()).expect("config loads");
        let before = live.current();

        std::fs::write(file.path(), "[economy]\nhint_cost = 750\n").expect("rewrite");
        live.reload().expect("reload");

        assert_eq!(before.economy.hint_cost, 250);
        assert_eq!(live.current().economy.hint_cost, 750);
    }

    #[test]
    fn reload_without_file_is_an_error() {
        let live = LiveConfig::new(BridgeConfig::default());
        assert!(matches!(live.reload(), Err(ConfigError::NoSource)));
    }
}
