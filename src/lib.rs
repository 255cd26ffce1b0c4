//! Admin bot for the connection-limiting panel monitor.

pub mod domain;
pub mod application;
pub mod infrastructure;
