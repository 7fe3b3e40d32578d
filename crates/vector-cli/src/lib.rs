//! densevec library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (check, update, encode, explain, roundtrip)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    check_mapping, encode_document, explain_query, init_logging, load_fields, load_settings,
    roundtrip, run, update_mapping,
};
