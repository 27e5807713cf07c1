//! # Ortho+ Common Library
//!
//! Shared code for the Ortho+ services:
//! - Error type
//! - Bootstrap configuration loading
//! - SQLite database initialization and migrations
//! - Domain events and the handler registry that dispatches them

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{DomainEvent, EventBus, EventHandler};
