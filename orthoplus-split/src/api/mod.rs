//! HTTP API handlers for orthoplus-split

pub mod auth;
pub mod configs;
pub mod health;
pub mod splits;

pub use configs::{create_config, deactivate_config, list_configs};
pub use health::health;
pub use splits::{apply_split, get_transaction, list_transactions, preview_split};
