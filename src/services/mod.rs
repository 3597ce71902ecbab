//! Services layer for Stampbook
//!
//! Business logic that coordinates the pure stamp core with persistence
//! and per-principal session state.
//!
//! ## Services
//!
//! - **StampService**: load-on-entry, add-stamp with confirm/rollback,
//!   snapshots, reasons export and report generation

pub mod stamps;

pub use stamps::{
    AddStampResult, StampBookView, StampService, StampServiceConfig, REASONS_EXPORT_FILENAME,
};
