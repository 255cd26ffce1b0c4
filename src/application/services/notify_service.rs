use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::traits::{Bot, ConfigStore};

/// Service for broadcasting operational messages to every admin
pub struct NotifyService<B: Bot> {
    bot: Arc<B>,
    store: Arc<dyn ConfigStore>,
}

impl<B: Bot> NotifyService<B> {
    pub fn new(bot: Arc<B>, store: Arc<dyn ConfigStore>) -> Self {
        Self { bot, store }
    }

    /// Sends `text` to all admins. A failed delivery is logged and skipped.
    /// Returns how many admins received the message.
    pub async fn broadcast(&self, text: &str) -> Result<usize, BotError> {
        let admins = self.store.get_admins().await?;
        let mut delivered = 0;
        for admin in &admins {
            match self.bot.send_message(*admin, text).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::warn!(admin = %admin, "Failed to notify admin: {}", e),
            }
        }
        tracing::debug!("Broadcast delivered to {}/{} admins", delivered, admins.len());
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Reply, SenderId};
    use crate::domain::traits::BotInfo;
    use crate::infrastructure::storage::JsonConfigStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records deliveries and fails for one chosen chat
    struct RecordingBot {
        failing: SenderId,
        sent: Mutex<Vec<SenderId>>,
    }

    #[async_trait]
    impl Bot for RecordingBot {
        async fn start(&self) -> Result<(), BotError> {
            Ok(())
        }

        async fn send_message(&self, chat_id: SenderId, _text: &str) -> Result<String, BotError> {
            if chat_id == self.failing {
                return Err(BotError::Network("blocked by user".into()));
            }
            self.sent.lock().unwrap().push(chat_id);
            Ok("1".into())
        }

        async fn send_reply(&self, chat_id: SenderId, reply: &Reply) -> Result<String, BotError> {
            self.send_message(chat_id, &reply.text).await
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo { id: "0".into(), name: "test".into(), username: "test_bot".into() }
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_failed_deliveries() {
        let store = Arc::new(JsonConfigStore::in_memory());
        store.bootstrap_admin(SenderId(1)).await.unwrap();
        store.add_admin(SenderId(2)).await.unwrap();
        store.add_admin(SenderId(3)).await.unwrap();

        let bot = Arc::new(RecordingBot { failing: SenderId(2), sent: Mutex::new(Vec::new()) });
        let delivered = NotifyService::new(bot.clone(), store).broadcast("online").await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(*bot.sent.lock().unwrap(), vec![SenderId(1), SenderId(3)]);
    }
}
