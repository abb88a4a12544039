//! # LRMM Common Library
//!
//! Shared code for the log-review marker manager crates:
//! - Error type
//! - Configuration loading (TOML with graceful fallback to defaults)
//! - Atomic file helpers
//! - Timestamp utilities
//! - Session event types and the event bus

pub mod config;
pub mod error;
pub mod events;
pub mod files;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, MarkerEvent, SessionOutcome};
