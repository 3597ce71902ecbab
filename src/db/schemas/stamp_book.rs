//! Stamp book document schema
//!
//! One document per user holding the full stamp array:
//! `{ user_id, stamps: [ {index, reason, timestamp}, ... ] }`

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::stamps::{StampCollection, StampRecord};

/// Collection name for stamp books
pub const STAMP_BOOK_COLLECTION: &str = "stamp_books";

/// Stamp book document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StampBookDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Principal identifier from the identity provider
    pub user_id: String,

    /// Stamps in insertion order
    #[serde(default)]
    pub stamps: Vec<StampRecord>,
}

impl StampBookDoc {
    /// Create an empty stamp book for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: user_id.into(),
            stamps: Vec::new(),
        }
    }

    pub fn into_collection(self) -> StampCollection {
        StampCollection::from_records(self.stamps)
    }
}

impl IntoIndexes for StampBookDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One stamp book per user
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for StampBookDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
