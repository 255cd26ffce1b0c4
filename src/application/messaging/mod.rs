//! Message handling - turning raw transport text into inbound messages

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{deliver, Inbound, MessageDispatcher};
pub use parser::MessageParser;
