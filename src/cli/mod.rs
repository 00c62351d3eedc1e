//! CLI module for the bgswap library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use config::CliConfigBuilder;
pub use main_impl::{main, Cli, CliBackground, CliResize, DEFAULT_MODEL_COMMAND};
