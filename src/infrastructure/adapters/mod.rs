//! Platform integrations

pub mod console;
pub mod telegram;
