//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod store;
pub mod panel;

pub use bot::{Bot, BotInfo};
pub use store::ConfigStore;
pub use panel::PanelChecker;
