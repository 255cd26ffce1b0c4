//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Application config loading
//! - Storage: The shared JSON config record
//! - Panel: Panel login check
//! - Adapters: Platform integrations (Telegram, console)

pub mod config;
pub mod storage;
pub mod panel;
pub mod adapters;
