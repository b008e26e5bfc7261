//! # catalog-service
//!
//! Asset write path and read facade. No transport is attached; the CLI and
//! any future server call [`AssetService`] directly.

pub mod error;
pub mod service;

pub use error::{Result, ServiceError};
pub use service::{AssetService, WriteOutcome};
