//! Metadata catalog CLI
//!
//! # Usage
//!
//! ```bash
//! catalog migrate
//! catalog ingest --type topic topics.jsonl
//! catalog search orders --type table --filter data.country=id
//! catalog export --type job > jobs.jsonl
//! catalog diff old.json new.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/catalog/config.toml)
//! 3. Environment variables (CATALOG_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use catalog_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
