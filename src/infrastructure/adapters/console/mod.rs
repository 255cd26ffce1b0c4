//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::application::conversation::MenuDispatcher;
use crate::application::errors::BotError;
use crate::domain::entities::{Reply, SenderId};
use crate::domain::traits::{Bot, BotInfo};

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    input: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "spernet-bot".to_string(),
                username: "console".to_string(),
            },
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next trimmed line from stdin, `None` at end of input
    pub async fn read_line(&self) -> Result<Option<String>, BotError> {
        let mut input = self.input.lock().await;
        let line = input
            .next_line()
            .await
            .map_err(|e| BotError::Internal(format!("stdin: {}", e)))?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Plain-text rendering of a reply, keyboard rows included
    pub fn render(reply: &Reply) -> String {
        let mut out = match &reply.document {
            Some(doc) => format!(
                "[BOT] <document {} ({} bytes)> {}",
                doc.file_name,
                doc.bytes.len(),
                doc.caption.as_deref().unwrap_or_default()
            ),
            None => format!("[BOT] {}", reply.text),
        };
        if let Some(rows) = MenuDispatcher::layout(reply.keyboard) {
            for row in rows {
                out.push_str(&format!("\n  [Buttons] {}", row.join(" | ")));
            }
        }
        out
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn send_message(&self, _chat_id: SenderId, text: &str) -> Result<String, BotError> {
        println!("[BOT] {}", text);
        Ok("console_msg".to_string())
    }

    async fn send_reply(&self, _chat_id: SenderId, reply: &Reply) -> Result<String, BotError> {
        println!("{}", Self::render(reply));
        Ok("console_msg".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
