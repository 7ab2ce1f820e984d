//! Configuration model for the semgate CLI.
//!
//! This module defines the [`Settings`] struct that represents `semgate.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of values.

mod model;
mod operations;


pub use model::{DEFAULT_CONFIG_FILE, Settings};
