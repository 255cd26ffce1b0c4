use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::{
    AdminAddition, AdminRemoval, ConfigRecord, CountryCode, Document, PanelCredentials, SenderId,
};

/// Persistent configuration store.
///
/// Every mutating call is atomic with respect to other calls on the same
/// store; callers never hold a lock across two calls.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    // Admin set
    async fn get_admins(&self) -> Result<Vec<SenderId>, StorageError>;
    /// Adds `id` only if the admin set is empty. Returns whether it was added.
    async fn bootstrap_admin(&self, id: SenderId) -> Result<bool, StorageError>;
    async fn add_admin(&self, id: SenderId) -> Result<AdminAddition, StorageError>;
    async fn remove_admin(&self, id: SenderId) -> Result<AdminRemoval, StorageError>;

    // Whole record
    async fn get_config(&self) -> Result<ConfigRecord, StorageError>;
    async fn set_panel_credentials(&self, credentials: &PanelCredentials) -> Result<(), StorageError>;

    // Special limits
    /// Returns `true` when an existing entry was updated.
    async fn upsert_special_limit(&self, username: &str, limit: u32) -> Result<bool, StorageError>;
    async fn list_special_limits(&self) -> Result<Vec<(String, u32)>, StorageError>;

    // Exception users
    /// Returns `false` when the user was already present.
    async fn add_except_user(&self, username: &str) -> Result<bool, StorageError>;
    async fn remove_except_user(&self, username: &str) -> Result<bool, StorageError>;
    async fn list_except_users(&self) -> Result<Vec<String>, StorageError>;

    // General settings
    async fn set_country_code(&self, code: CountryCode) -> Result<(), StorageError>;
    async fn set_general_limit(&self, limit: u32) -> Result<(), StorageError>;
    async fn set_check_interval(&self, seconds: u64) -> Result<(), StorageError>;
    async fn set_active_window(&self, seconds: u64) -> Result<(), StorageError>;

    /// The persisted file as a document, or `None` if nothing has been written yet
    async fn backup(&self) -> Result<Option<Document>, StorageError>;
}
