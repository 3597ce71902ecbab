//! Stamp persistence
//!
//! The remote document store is the durable owner of each user's
//! collection. Two backends implement the same contract:
//! - `MongoStampStore`: one `stamp_books` document per user
//! - `InMemoryStampStore`: dev mode without MongoDB, and tests
//!
//! Contract shared by both:
//! - `load` creates an empty collection when none exists yet
//! - `append` merges additively, never overwriting records written by
//!   other sessions of the same user
//! - re-appending an identical record is a no-op (`AlreadyPresent`)
//! - appending a different record at an index that is already taken
//!   fails with `IndexAlreadyStamped`; indices stay unique remotely
//! - transient infrastructure failures surface as `StoreUnavailable`

pub mod memory;
pub mod mongo;

use async_trait::async_trait;

use crate::stamps::{StampCollection, StampRecord};
use crate::types::Result;

pub use memory::InMemoryStampStore;
pub use mongo::MongoStampStore;

/// What an append did to the remote collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The record was added
    Appended,
    /// The exact record was already present (retried append)
    AlreadyPresent,
}

#[async_trait]
pub trait StampStore: Send + Sync {
    /// Fetch the collection for `user_id`, creating an empty one if absent
    async fn load(&self, user_id: &str) -> Result<StampCollection>;

    /// Merge `record` into the collection for `user_id`
    async fn append(&self, user_id: &str, record: &StampRecord) -> Result<AppendOutcome>;

    /// Whether the backing store is currently reachable
    async fn is_available(&self) -> bool;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}
