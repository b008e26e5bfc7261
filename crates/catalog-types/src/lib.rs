//! # catalog-types
//!
//! Shared domain types for the metadata catalog.
//!
//! This crate defines the data structures every other catalog crate speaks:
//! - Asset types: the closed registry of cataloged kinds
//! - Assets: one cataloged metadata entity with its platform payload
//! - Changes and asset versions: the audit trail of an asset
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use catalog_types::{Asset, AssetType};
//!
//! let asset = Asset::new("urn:kafka:orders", AssetType::Topic, "kafka", "orders");
//! assert_eq!(asset.asset_type.as_str(), "topic");
//! ```

pub mod asset;
pub mod asset_type;
pub mod change;
pub mod config;
pub mod error;

pub use asset::{Asset, Owner};
pub use asset_type::AssetType;
pub use change::{AssetVersion, Change, ChangeKind, Changelog};
pub use config::Settings;
pub use error::{CatalogError, ErrorKind};
