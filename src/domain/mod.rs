//! Domain layer - Core business objects with no transport or storage details
//!
//! This layer contains:
//! - Entities: Sender identity, the persisted config record, replies
//! - Traits: Abstractions for infrastructure (Bot, ConfigStore, PanelChecker)

pub mod entities;
pub mod traits;
