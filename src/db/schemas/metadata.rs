//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was soft-deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metadata_not_deleted() {
        let metadata = Metadata::new();
        assert!(!metadata.is_deleted);
        assert!(metadata.created_at.is_some());
        assert_eq!(metadata.created_at, metadata.updated_at);
    }

    #[test]
    fn test_optional_fields_skipped() {
        let doc = bson::to_document(&Metadata::default()).unwrap();
        assert!(doc.contains_key("is_deleted"));
        assert!(!doc.contains_key("deleted_at"));
        assert!(!doc.contains_key("created_at"));
    }
}
