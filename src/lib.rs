pub mod bot;
pub mod catalog;
pub mod config;
pub mod context;
pub mod database;
pub mod diff;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod scraper;
pub mod snapshot_store;
pub mod subscribers;
pub mod telegram;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::AppContext;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
