//! Domain entities - Core business objects with no external dependencies

pub mod sender;
pub mod message;
pub mod config_record;
pub mod reply;

pub use sender::SenderId;
pub use message::{Message, Content};
pub use config_record::{AdminAddition, AdminRemoval, ConfigRecord, CountryCode, PanelCredentials};
pub use reply::{Document, Keyboard, Reply};
