/// Which reply keyboard the transport should show with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the client currently shows
    #[default]
    Keep,
    Main,
    Admins,
    Exceptions,
    Settings,
    Confirm,
    /// Hide the keyboard so the user types free text
    Remove,
}

/// A file attached to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// One outbound message. Text is HTML formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
    pub document: Option<Document>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Keep,
            document: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn document(document: Document, keyboard: Keyboard) -> Self {
        Self {
            text: document.caption.clone().unwrap_or_default(),
            keyboard,
            document: Some(document),
        }
    }
}
