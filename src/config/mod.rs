//! Configuration module for clusteropts
//!
//! Provides configuration management including CLI arguments,
//! config files, and LSF directive defaults.

mod settings;

pub use settings::*;
