use async_trait::async_trait;
use crate::domain::entities::{Reply, SenderId};
use crate::application::errors::BotError;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Start the bot and begin listening for messages
    async fn start(&self) -> Result<(), BotError>;

    /// Send a plain HTML message without touching the keyboard
    async fn send_message(&self, chat_id: SenderId, text: &str) -> Result<String, BotError>;

    /// Send a rendered reply, including its keyboard and attachment
    async fn send_reply(&self, chat_id: SenderId, reply: &Reply) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
