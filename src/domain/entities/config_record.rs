//! The persisted configuration record shared with the IP-limit monitor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::SenderId;

/// Maximum number of admins the bot accepts.
pub const MAX_ADMINS: usize = 5;

pub const DEFAULT_GENERAL_LIMIT: u32 = 2;
pub const DEFAULT_CHECK_INTERVAL: u64 = 240;
pub const DEFAULT_TIME_TO_ACTIVE: u64 = 1800;

/// Country whose IPs are counted against a user's limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CountryCode {
    #[serde(rename = "IR")]
    Iran,
    #[serde(rename = "RU")]
    Russia,
    #[serde(rename = "CN")]
    China,
    #[default]
    #[serde(rename = "None")]
    Unfiltered,
}

impl CountryCode {
    /// Maps the numeric menu choice to a country. Anything unrecognised
    /// (including "4") means no filtering.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => CountryCode::Iran,
            "2" => CountryCode::Russia,
            "3" => CountryCode::China,
            _ => CountryCode::Unfiltered,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::Iran => "IR",
            CountryCode::Russia => "RU",
            CountryCode::China => "CN",
            CountryCode::Unfiltered => "None",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CountryCode::Iran => "IR 🇮🇷",
            CountryCode::Russia => "RU 🇷🇺",
            CountryCode::China => "CN 🇨🇳",
            CountryCode::Unfiltered => "None 🌐",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Panel login. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PanelCredentials {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl PanelCredentials {
    pub fn new(domain: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }
}

impl fmt::Debug for PanelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelCredentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of adding an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAddition {
    Added,
    Duplicate,
    CapacityReached,
}

/// Outcome of removing an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRemoval {
    Removed,
    NotFound,
    /// Refused: the admin set would become empty
    LastAdmin,
}

/// The whole persisted configuration.
///
/// Keys match the `config.json` layout read by the monitor. Keys this bot
/// does not know about (such as `BOT_TOKEN`) are kept in `extra` so a rewrite
/// never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(rename = "ADMINS", default)]
    pub admins: Vec<SenderId>,
    #[serde(rename = "PANEL_DOMAIN", default, skip_serializing_if = "Option::is_none")]
    pub panel_domain: Option<String>,
    #[serde(rename = "PANEL_USERNAME", default, skip_serializing_if = "Option::is_none")]
    pub panel_username: Option<String>,
    #[serde(rename = "PANEL_PASSWORD", default, skip_serializing_if = "Option::is_none")]
    pub panel_password: Option<String>,
    #[serde(rename = "SPECIAL_LIMIT", default)]
    pub special_limits: BTreeMap<String, u32>,
    #[serde(rename = "EXCEPT_USERS", default)]
    pub except_users: Vec<String>,
    #[serde(rename = "GENERAL_LIMIT", default = "default_general_limit")]
    pub general_limit: u32,
    #[serde(rename = "CHECK_INTERVAL", default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(rename = "TIME_TO_ACTIVE_USERS", default = "default_time_to_active")]
    pub time_to_active_users: u64,
    #[serde(rename = "IP_LOCATION", default)]
    pub country_code: CountryCode,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_general_limit() -> u32 {
    DEFAULT_GENERAL_LIMIT
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

fn default_time_to_active() -> u64 {
    DEFAULT_TIME_TO_ACTIVE
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            panel_domain: None,
            panel_username: None,
            panel_password: None,
            special_limits: BTreeMap::new(),
            except_users: Vec::new(),
            general_limit: DEFAULT_GENERAL_LIMIT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            time_to_active_users: DEFAULT_TIME_TO_ACTIVE,
            country_code: CountryCode::default(),
            extra: serde_json::Map::new(),
        }
    }
}

impl ConfigRecord {
    /// Credentials are only considered set when all three parts are non-empty.
    pub fn panel_credentials(&self) -> Option<PanelCredentials> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        Some(PanelCredentials {
            domain: non_empty(&self.panel_domain)?,
            username: non_empty(&self.panel_username)?,
            password: non_empty(&self.panel_password)?,
        })
    }

    pub fn set_panel_credentials(&mut self, credentials: &PanelCredentials) {
        self.panel_domain = Some(credentials.domain.clone());
        self.panel_username = Some(credentials.username.clone());
        self.panel_password = Some(credentials.password.clone());
    }

    pub fn is_admin(&self, id: SenderId) -> bool {
        self.admins.contains(&id)
    }

    /// Adds `id` only when there are no admins yet. Returns whether it was added.
    pub fn bootstrap_admin(&mut self, id: SenderId) -> bool {
        if !self.admins.is_empty() {
            return false;
        }
        self.admins.push(id);
        true
    }

    pub fn add_admin(&mut self, id: SenderId) -> AdminAddition {
        if self.is_admin(id) {
            AdminAddition::Duplicate
        } else if self.admins.len() >= MAX_ADMINS {
            AdminAddition::CapacityReached
        } else {
            self.admins.push(id);
            AdminAddition::Added
        }
    }

    pub fn remove_admin(&mut self, id: SenderId) -> AdminRemoval {
        let Some(pos) = self.admins.iter().position(|a| *a == id) else {
            return AdminRemoval::NotFound;
        };
        if self.admins.len() <= 1 {
            return AdminRemoval::LastAdmin;
        }
        self.admins.remove(pos);
        AdminRemoval::Removed
    }

    /// Inserts or replaces a user's cap. Returns `true` when an existing
    /// entry was updated.
    pub fn upsert_special_limit(&mut self, username: &str, limit: u32) -> bool {
        self.special_limits.insert(username.to_string(), limit).is_some()
    }

    pub fn add_except_user(&mut self, username: &str) -> bool {
        if self.except_users.iter().any(|u| u == username) {
            return false;
        }
        self.except_users.push(username.to_string());
        true
    }

    pub fn remove_except_user(&mut self, username: &str) -> bool {
        let before = self.except_users.len();
        self.except_users.retain(|u| u != username);
        self.except_users.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_only_when_empty() {
        let mut record = ConfigRecord::default();
        assert!(record.bootstrap_admin(SenderId(10)));
        assert!(!record.bootstrap_admin(SenderId(11)));
        assert_eq!(record.admins, vec![SenderId(10)]);
    }

    #[test]
    fn test_add_admin_capacity() {
        let mut record = ConfigRecord::default();
        for id in 1..=5 {
            assert_eq!(record.add_admin(SenderId(id)), AdminAddition::Added);
        }
        assert_eq!(record.add_admin(SenderId(6)), AdminAddition::CapacityReached);
        assert_eq!(record.add_admin(SenderId(3)), AdminAddition::Duplicate);
        assert_eq!(record.admins.len(), 5);
    }

    #[test]
    fn test_last_admin_is_never_removed() {
        let mut record = ConfigRecord::default();
        record.bootstrap_admin(SenderId(1));
        assert_eq!(record.remove_admin(SenderId(1)), AdminRemoval::LastAdmin);
        assert_eq!(record.remove_admin(SenderId(2)), AdminRemoval::NotFound);
        record.add_admin(SenderId(2));
        assert_eq!(record.remove_admin(SenderId(1)), AdminRemoval::Removed);
        assert_eq!(record.admins, vec![SenderId(2)]);
    }

    #[test]
    fn test_upsert_special_limit_reports_update() {
        let mut record = ConfigRecord::default();
        assert!(!record.upsert_special_limit("alice", 4));
        assert!(record.upsert_special_limit("alice", 7));
        assert_eq!(record.special_limits.len(), 1);
        assert_eq!(record.special_limits.get("alice"), Some(&7));
    }

    #[test]
    fn test_country_choice() {
        assert_eq!(CountryCode::from_choice("1"), CountryCode::Iran);
        assert_eq!(CountryCode::from_choice("2"), CountryCode::Russia);
        assert_eq!(CountryCode::from_choice("3"), CountryCode::China);
        assert_eq!(CountryCode::from_choice("4"), CountryCode::Unfiltered);
        assert_eq!(CountryCode::from_choice("5"), CountryCode::Unfiltered);
        assert_eq!(CountryCode::from_choice("x"), CountryCode::Unfiltered);
    }

    #[test]
    fn test_unknown_keys_survive() {
        let raw = r#"{"ADMINS":[7],"BOT_TOKEN":"abc","IP_LOCATION":"RU"}"#;
        let record: ConfigRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.country_code, CountryCode::Russia);
        assert_eq!(record.general_limit, DEFAULT_GENERAL_LIMIT);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["BOT_TOKEN"], "abc");
        assert_eq!(out["ADMINS"][0], 7);
    }

    #[test]
    fn test_partial_credentials_are_unset() {
        let mut record = ConfigRecord::default();
        record.panel_domain = Some("panel.example.com:8443".into());
        record.panel_username = Some("admin".into());
        assert!(record.panel_credentials().is_none());
        record.panel_password = Some(String::new());
        assert!(record.panel_credentials().is_none());
        record.panel_password = Some("secret".into());
        assert_eq!(record.panel_credentials().unwrap().masked_password(), "******");
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = PanelCredentials::new("d", "u", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
