//! MongoDB-backed stamp store
//!
//! Appends are conditional `$addToSet` updates filtered on the index not
//! being taken yet, so two sessions racing on the same cell cannot both
//! land a record.

use async_trait::async_trait;
use bson::{doc, DateTime};
use tracing::{debug, info, warn};

use super::{AppendOutcome, StampStore};
use crate::db::schemas::{StampBookDoc, STAMP_BOOK_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::stamps::{StampCollection, StampRecord, ValidationError};
use crate::types::{Result, StampbookError};

pub struct MongoStampStore {
    client: MongoClient,
    books: MongoCollection<StampBookDoc>,
}

impl MongoStampStore {
    /// Open the stamp book collection and apply its indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        let books = client
            .collection::<StampBookDoc>(STAMP_BOOK_COLLECTION)
            .await?;
        info!(
            "Stamp books in {}.{}",
            client.db_name(),
            STAMP_BOOK_COLLECTION
        );
        Ok(Self { client, books })
    }

    async fn ensure_book(&self, user_id: &str) -> Result<()> {
        let result = self
            .books
            .insert_if_absent(doc! { "user_id": user_id }, StampBookDoc::new(user_id))
            .await?;
        if result.upserted_id.is_some() {
            debug!(user_id, "Created empty stamp book");
        }
        Ok(())
    }

    async fn fetch(&self, user_id: &str) -> Result<Option<StampBookDoc>> {
        self.books.find_one(doc! { "user_id": user_id }).await
    }
}

#[async_trait]
impl StampStore for MongoStampStore {
    async fn load(&self, user_id: &str) -> Result<StampCollection> {
        self.ensure_book(user_id).await?;

        match self.fetch(user_id).await? {
            Some(book) => Ok(book.into_collection()),
            None => Err(StampbookError::StoreUnavailable(format!(
                "Stamp book for {user_id} vanished after create"
            ))),
        }
    }

    async fn append(&self, user_id: &str, record: &StampRecord) -> Result<AppendOutcome> {
        self.ensure_book(user_id).await?;

        let stamp = bson::to_bson(record)?;
        let result = self
            .books
            .update_one(
                doc! {
                    "user_id": user_id,
                    "metadata.is_deleted": { "$ne": true },
                    "stamps.index": { "$ne": record.index as i64 },
                },
                doc! {
                    "$addToSet": { "stamps": stamp },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count > 0 {
            return Ok(AppendOutcome::Appended);
        }

        // Nothing matched: the index is taken. Either this is a retry of the
        // same record, or another session got there first.
        let book = self.fetch(user_id).await?.ok_or_else(|| {
            StampbookError::StoreUnavailable(format!("Stamp book for {user_id} not found"))
        })?;

        if book.stamps.iter().any(|r| r == record) {
            debug!(user_id, index = record.index, "Record already present");
            Ok(AppendOutcome::AlreadyPresent)
        } else {
            warn!(
                user_id,
                index = record.index,
                "Index already stamped by another session"
            );
            Err(ValidationError::IndexAlreadyStamped(record.index).into())
        }
    }

    async fn is_available(&self) -> bool {
        self.client.ping().await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
