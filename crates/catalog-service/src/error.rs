//! Service error type.

use thiserror::Error;

use catalog_search::SearchError;
use catalog_types::{AssetType, CatalogError, ErrorKind};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Search(#[from] SearchError),

    /// A patch tried to move an asset to another type
    #[error("Patch changes type of {urn} from {from} to {to}")]
    TypeChange {
        urn: String,
        from: AssetType,
        to: AssetType,
    },

    /// A patch tried to rename an asset's urn
    #[error("Patch changes urn of {from} to {to}")]
    UrnChange { from: String, to: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Catalog(e) => e.kind(),
            ServiceError::Search(e) => e.kind(),
            ServiceError::TypeChange { .. } | ServiceError::UrnChange { .. } => {
                ErrorKind::Validation
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
