//! Message parser - Parses raw text into structured messages

use crate::domain::entities::{Content, Message, SenderId};

/// Parses incoming text into `Message`s
#[derive(Debug, Clone)]
pub struct MessageParser {
    command_prefix: String,
    bot_username: Option<String>,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            bot_username: None,
        }
    }

    /// Commands addressed to another bot (`/start@other_bot`) are treated as text.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Parse a text message
    pub fn parse(&self, sender: SenderId, text: impl Into<String>) -> Message {
        let text = text.into();
        Message::new(sender, self.parse_content(&text))
    }

    pub fn parse_content(&self, text: &str) -> Content {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Content::Empty;
        }

        let cmd_text = trimmed
            .strip_prefix('/')
            .or_else(|| trimmed.strip_prefix(self.command_prefix.as_str()).filter(|_| !self.command_prefix.is_empty()));
        match cmd_text {
            Some(cmd_text) => self.parse_command(cmd_text).unwrap_or_else(|| Content::Text(text.to_string())),
            None => Content::Text(text.to_string()),
        }
    }

    /// Parse a command with the prefix already removed. Anything after the
    /// command word is ignored; every dialogue asks for its own input.
    fn parse_command(&self, cmd_text: &str) -> Option<Content> {
        let head = cmd_text.split_whitespace().next()?;

        let name = match head.split_once('@') {
            Some((name, target)) => {
                let ours = self
                    .bot_username
                    .as_deref()
                    .map_or(true, |me| me.eq_ignore_ascii_case(target));
                if !ours {
                    return None;
                }
                name
            }
            None => head,
        };

        Some(Content::Command { name: name.to_lowercase() })
    }
}
