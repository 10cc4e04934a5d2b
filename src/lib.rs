pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use config::{CliConfig, ModmailConfig};
pub use core::bot::ModmailBot;
pub use core::dispatcher::Dispatcher;
pub use utils::error::{ModmailError, Result};
