//! In-memory stamp store
//!
//! Same merge semantics as the MongoDB store. Used in dev mode when no
//! database is configured, and in tests (with the availability switch
//! standing in for a network outage).

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{AppendOutcome, StampStore};
use crate::stamps::{StampCollection, StampRecord, ValidationError};
use crate::types::{Result, StampbookError};

pub struct InMemoryStampStore {
    books: DashMap<String, Vec<StampRecord>>,
    available: AtomicBool,
}

impl InMemoryStampStore {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of users with a stamp book
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StampbookError::StoreUnavailable(
                "in-memory store marked unavailable".into(),
            ))
        }
    }
}

impl Default for InMemoryStampStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StampStore for InMemoryStampStore {
    async fn load(&self, user_id: &str) -> Result<StampCollection> {
        self.check_available()?;

        let book = self.books.entry(user_id.to_string()).or_default();
        Ok(StampCollection::from_records(book.value().clone()))
    }

    async fn append(&self, user_id: &str, record: &StampRecord) -> Result<AppendOutcome> {
        self.check_available()?;

        let mut book = self.books.entry(user_id.to_string()).or_default();

        if book.iter().any(|r| r == record) {
            debug!(user_id, index = record.index, "Record already present");
            return Ok(AppendOutcome::AlreadyPresent);
        }

        if book.iter().any(|r| r.index == record.index) {
            return Err(ValidationError::IndexAlreadyStamped(record.index).into());
        }

        book.push(record.clone());
        Ok(AppendOutcome::Appended)
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
