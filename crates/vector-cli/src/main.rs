//! densevec
//!
//! Command-line checks for dense vector fields.
//!
//! # Usage
//!
//! ```bash
//! densevec check <mapping.json>
//! densevec update <current.json> <update.json>
//! densevec encode --mapping <mapping.json> <doc.json>
//! densevec explain --mapping <mapping.json> <request.json>
//! densevec roundtrip --mapping <mapping.json> <docs.jsonl>
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/dense-vector/config.toml)
//! 3. Environment variables (DENSE_VECTOR_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use vector_cli::{init_logging, load_settings, run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref(), cli.epoch)?;
    init_logging(&settings);

    let report = run(cli.command, &settings)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
