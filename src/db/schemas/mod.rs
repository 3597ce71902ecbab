//! Database schemas for Stampbook
//!
//! Defines MongoDB document structures for per-user stamp books.

mod metadata;
mod stamp_book;

pub use metadata::Metadata;
pub use stamp_book::{StampBookDoc, STAMP_BOOK_COLLECTION};
