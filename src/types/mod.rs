//! Shared types for Stampbook

pub mod error;

pub use error::{Result, StampbookError};
