//! CLI argument parsing for densevec.
//!
//! Global flags override the layered configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vector_types::FormatEpoch;

/// Dense vector field toolbox
///
/// Resolves mappings, checks mapping updates, encodes documents, explains
/// kNN queries and verifies source round trips.
#[derive(Parser, Debug)]
#[command(name = "densevec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/dense-vector/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Format epoch for newly created fields (e.g. legacy, normalized_cosine)
    #[arg(short, long, global = true)]
    pub epoch: Option<FormatEpoch>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve a mapping and print each field with its defaults applied
    Check {
        /// JSON mapping: field name to definition, optionally under "properties"
        mapping: PathBuf,
    },

    /// Apply a mapping update on top of an existing mapping
    Update {
        /// Current mapping
        current: PathBuf,

        /// Update to apply
        update: PathBuf,
    },

    /// Encode one JSON document and print its index entries
    Encode {
        #[arg(short, long)]
        mapping: PathBuf,

        /// JSON document
        doc: PathBuf,
    },

    /// Show the composed query for a kNN request
    Explain {
        #[arg(short, long)]
        mapping: PathBuf,

        /// JSON kNN request
        request: PathBuf,
    },

    /// Index documents, rebuild their source and re-encode it
    Roundtrip {
        #[arg(short, long)]
        mapping: PathBuf,

        /// One JSON document per line
        vectors: PathBuf,
    },
}
