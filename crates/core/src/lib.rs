pub mod config;
pub mod error;
pub mod event_bus;
pub mod repository;
pub mod rules;
pub mod templates;
pub mod types;

pub use self::config::AppConfig;
pub use self::error::{CrmError, CrmResult};
