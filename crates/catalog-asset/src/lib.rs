//! # catalog-asset
//!
//! Pure engines behind every asset write:
//! - `diff`: ordered, path-based changelog between two asset snapshots
//! - `version`: MAJOR.MINOR version parsing and bumping
//! - `patch`: tolerant partial-update merging
//! - `write`: old + new snapshot -> versioned asset and optional version record
//!
//! Nothing here performs I/O.

pub mod diff;
pub mod patch;
pub mod version;
pub mod write;

pub use diff::{diff, diff_values};
pub use patch::{patch, patch_asset};
pub use version::{next_version, parse_version, Version, BASE_VERSION};
pub use write::{prepare_write, PreparedWrite};
