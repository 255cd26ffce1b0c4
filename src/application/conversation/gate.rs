//! Admin gate - decides whether a sender may configure the bot

use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::domain::entities::SenderId;
use crate::domain::traits::ConfigStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
}

/// Checks senders against the persisted admin set.
///
/// The very first sender to reach the gate while the admin set is empty
/// becomes the first admin.
#[derive(Clone)]
pub struct AdminGate {
    store: Arc<dyn ConfigStore>,
}

impl AdminGate {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub async fn authorize(&self, sender: SenderId) -> Result<Authorization, StorageError> {
        if self.store.bootstrap_admin(sender).await? {
            tracing::info!(sender = %sender, "Admin set was empty, bootstrapped first admin");
            return Ok(Authorization::Allowed);
        }

        if self.store.get_admins().await?.contains(&sender) {
            Ok(Authorization::Allowed)
        } else {
            tracing::warn!(sender = %sender, "Unauthorized sender");
            Ok(Authorization::Denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::JsonConfigStore;

    #[tokio::test]
    async fn test_first_sender_becomes_admin() {
        let store = Arc::new(JsonConfigStore::in_memory());
        let gate = AdminGate::new(store.clone());

        assert_eq!(gate.authorize(SenderId(10)).await.unwrap(), Authorization::Allowed);
        assert_eq!(gate.authorize(SenderId(11)).await.unwrap(), Authorization::Denied);
        assert_eq!(gate.authorize(SenderId(10)).await.unwrap(), Authorization::Allowed);
        assert_eq!(store.get_admins().await.unwrap(), vec![SenderId(10)]);
    }

    #[tokio::test]
    async fn test_denied_sender_does_not_touch_store() {
        let store = Arc::new(JsonConfigStore::in_memory());
        store.bootstrap_admin(SenderId(1)).await.unwrap();
        let before = store.get_config().await.unwrap();

        let gate = AdminGate::new(store.clone());
        assert_eq!(gate.authorize(SenderId(2)).await.unwrap(), Authorization::Denied);
        assert_eq!(store.get_config().await.unwrap(), before);
    }
}
