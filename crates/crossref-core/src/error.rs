//! Registry error handling
//!
//! Provides typed errors for link registry operations with descriptive
//! messages and suggestions for the caller.

use std::io;
use thiserror::Error;

/// Errors that can occur during registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A reference string could not be resolved to a canonical form
    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// A record is missing required fields
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The save was rejected, or redirected into an update of an existing record.
    /// No new record was created.
    #[error("{0}")]
    DuplicateRecord(String),

    /// A category has no titles to query
    #[error("No results for category '{category}'")]
    Lookup { category: String },

    /// A record expected to exist was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RegistryError {
    /// Create an invalid reference error
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "no new record was created" rather than a failure
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RegistryError::DuplicateRecord(_))
    }

    /// Whether the error came from reference resolution
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, RegistryError::InvalidReference { .. })
    }

    /// Get a suggestion for resolving this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            RegistryError::InvalidReference { .. } => {
                Some("Check the title against `crossref index list` and the section numbers against its depth.")
            }
            RegistryError::DuplicateRecord(_) => {
                Some("The existing link was kept. Edit it by id instead of adding it again.")
            }
            RegistryError::Lookup { .. } => {
                Some("Add indexes to the category first, or check the category name.")
            }
            _ => None,
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reference_display() {
        let err = RegistryError::invalid_reference("Genesis 0:1", "sections start at 1");
        let msg = err.to_string();
        assert!(msg.contains("Genesis 0:1"));
        assert!(msg.contains("sections start at 1"));
        assert!(err.is_invalid_reference());
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_duplicate_classification() {
        let err = RegistryError::DuplicateRecord("Link already exists".to_string());
        assert!(err.is_duplicate());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_lookup_display() {
        let err = RegistryError::Lookup {
            category: "Halakhah".to_string(),
        };
        assert_eq!(err.to_string(), "No results for category 'Halakhah'");
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_database_error_has_no_suggestion() {
        let err = RegistryError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, RegistryError::Database(_)));
        assert!(err.suggestion().is_none());
    }
}
