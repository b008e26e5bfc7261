//! Catalog command-line library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations over the asset service

pub mod cli;
pub mod commands;

pub use cli::{parse_key_value, Cli, Commands};
pub use commands::{execute, init_logging, load_settings, open_service, read_assets, run, run_offline};
