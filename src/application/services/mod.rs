//! Application services - Business logic orchestration

pub mod notify_service;

pub use notify_service::NotifyService;
