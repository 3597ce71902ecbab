//! Database layer for Stampbook
//!
//! Provides MongoDB storage for per-user stamp books.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Metadata, StampBookDoc};
