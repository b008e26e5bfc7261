//! CLI argument parsing for the catalog binary.
//!
//! Global flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use catalog_types::AssetType;

/// Metadata catalog
///
/// Index, search and version catalog assets in a local index store.
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/catalog/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the index store directory
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the index of every registered type that lacks one
    Migrate,

    /// Bulk index assets from a JSON lines file
    Ingest {
        /// Type every asset in the file is indexed as
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        /// Assets per bulk request
        #[arg(short, long, default_value = "500")]
        batch_size: usize,

        /// JSON lines file, one asset per line
        file: PathBuf,
    },

    /// Ranked search across type indices
    Search {
        /// Search text
        text: String,

        /// Restrict to these types (repeatable)
        #[arg(short = 't', long = "type")]
        types: Vec<AssetType>,

        /// Exact filter on a field, e.g. data.country=id (repeatable)
        #[arg(short, long, value_parser = parse_key_value)]
        filter: Vec<(String, String)>,

        /// Fuzzy match on a single field, e.g. name=orders (repeatable)
        #[arg(short, long, value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Maximum results (0 uses the configured default)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// Complete a partial asset name
    Suggest {
        /// Name prefix
        text: String,

        /// Restrict to these types (repeatable)
        #[arg(short = 't', long = "type")]
        types: Vec<AssetType>,

        /// Maximum suggestions (0 uses the default of 5)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// Print one page of a type's assets in urn order
    List {
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        /// Exact filter on a field (repeatable)
        #[arg(short, long, value_parser = parse_key_value)]
        filter: Vec<(String, String)>,

        /// Assets to skip
        #[arg(long, default_value = "0")]
        from: usize,

        /// Page size (0 uses the default of 20)
        #[arg(long, default_value = "0")]
        size: usize,
    },

    /// Stream every asset of a type as JSON lines
    Export {
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        /// Exact filter on a field (repeatable)
        #[arg(short, long, value_parser = parse_key_value)]
        filter: Vec<(String, String)>,
    },

    /// Fetch one asset by urn
    Get {
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        urn: String,
    },

    /// Delete one asset by urn
    Delete {
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        urn: String,
    },

    /// Document count per type
    Counts,

    /// Print the changelog between two asset snapshots
    Diff {
        old: PathBuf,
        new: PathBuf,
    },

    /// Apply a patch payload to an asset snapshot and print the result
    Patch {
        asset: PathBuf,
        patch: PathBuf,
    },

    /// Create or replace one asset with versioning
    Put {
        /// Asset JSON file
        file: PathBuf,

        /// Editor recorded on the write
        #[arg(long, default_value = "cli")]
        by: String,
    },

    /// Partially update an indexed asset with versioning
    Update {
        #[arg(short = 't', long = "type")]
        asset_type: AssetType,

        urn: String,

        /// Patch payload JSON file
        patch: PathBuf,

        #[arg(long, default_value = "cli")]
        by: String,
    },
}

impl Commands {
    /// Whether the command needs the index store.
    pub fn uses_index(&self) -> bool {
        !matches!(self, Commands::Diff { .. } | Commands::Patch { .. })
    }
}

/// Parse `key=value`; the value may itself contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
