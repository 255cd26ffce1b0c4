use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a chat participant.
///
/// This is the unit of authorization and of session isolation. On Telegram
/// it is the chat id of the private chat with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(pub i64);

impl SenderId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
