use super::SenderId;

/// Inbound message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Free text, including reply-keyboard button labels
    Text(String),
    /// A slash command, with the bot mention already stripped
    Command { name: String },
    Empty,
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Command { .. } => "command",
            Content::Empty => "empty",
        }
    }
}

/// An inbound event from the chat transport
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub sender: SenderId,
    pub content: Content,
    pub platform: String,
}

impl Message {
    pub fn new(sender: SenderId, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content,
            platform: "unknown".to_string(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }
}
