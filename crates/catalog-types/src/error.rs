//! Error types for the catalog.

use thiserror::Error;

/// Coarse classification shared by every catalog error type.
///
/// Transport layers map these onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any store interaction
    Validation,
    /// Point lookup or delete for an absent identity key
    NotFound,
    /// Backend, transport or decode failure
    StoreFailure,
}

/// Unified error type for catalog domain operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Type name outside the registry
    #[error("Invalid type: {0:?}")]
    InvalidType(String),

    /// Version string not in MAJOR.MINOR form
    #[error("Invalid version format: {0:?}")]
    InvalidVersionFormat(String),

    /// Minor component cannot be bumped any further
    #[error("Version {0:?} cannot be incremented")]
    VersionOverflow(String),

    /// Asset has no URN
    #[error("Asset does not have URN")]
    EmptyUrn,

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CatalogError {
    /// Domain errors are local and deterministic, never store failures.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::InvalidType("widget".to_string());
        assert_eq!(err.to_string(), "Invalid type: \"widget\"");

        let err = CatalogError::InvalidVersionFormat("1.2.3".to_string());
        assert_eq!(err.to_string(), "Invalid version format: \"1.2.3\"");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            CatalogError::InvalidType("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(CatalogError::EmptyUrn.kind(), ErrorKind::Validation);

        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        assert_eq!(CatalogError::from(json_err).kind(), ErrorKind::Validation);
    }
}
