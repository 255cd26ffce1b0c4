//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub store: StoreConfig,
    pub panel: PanelConfig,
    pub sessions: SessionConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub poll_timeout_secs: u64,
    /// Announce startup to every admin
    pub notify_admins_on_start: bool,
}

/// Where the shared `config.json` record lives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PanelConfig {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// 0 keeps sessions until they finish
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    /// Sender id used for stdin input in dev mode
    pub sender_id: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "spernet-bot".to_string(),
                prefix: "/".to_string(),
            },
            telegram: TelegramConfig {
                token: None,
                poll_timeout_secs: 30,
                notify_admins_on_start: true,
            },
            store: StoreConfig {
                path: PathBuf::from("config.json"),
            },
            panel: PanelConfig {
                request_timeout_secs: 10,
            },
            sessions: SessionConfig {
                idle_timeout_secs: 900,
                sweep_interval_secs: 60,
            },
            console: ConsoleConfig { sender_id: 1 },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override file values
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                self.telegram.token = Some(token);
            }
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Ok(path) = std::env::var("BOT_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("store.path".to_string()));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("telegram.poll-timeout-secs must be positive".to_string()));
        }
        if self.panel.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("panel.request-timeout-secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.sessions.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sessions.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("idle-timeout-secs"));
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.store.path, PathBuf::from("config.json"));
        assert_eq!(parsed.idle_timeout(), Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_zero_idle_timeout_disables_expiry() {
        let mut config = Config::default();
        config.sessions.idle_timeout_secs = 0;
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_invalid_poll_timeout_rejected() {
        let mut config = Config::default();
        config.telegram.poll_timeout_secs = 0;
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::InvalidValue(_))));
    }
}
