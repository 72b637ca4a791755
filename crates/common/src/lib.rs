//! Common utilities and types shared across the stream watchdog crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
