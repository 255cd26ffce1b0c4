//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Conversation: admin gate, flow registry, sessions, menu and router
//! - Messaging: message parsing
//! - Services: admin notifications
//! - Errors: Domain-specific errors

pub mod errors;
pub mod conversation;
pub mod services;
pub mod messaging;
