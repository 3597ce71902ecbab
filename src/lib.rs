//! Stampbook - stamp collection tracker
//!
//! Each signed-in user fills a fixed grid of stamps, one reason per stamp.
//! Stamps persist to MongoDB and merge additively across sessions.
//!
//! ## Modules
//!
//! - **stamps**: Pure core (validation, progress, achievements, reports, views)
//! - **store**: Persistence contract with MongoDB and in-memory backends
//! - **session**: Per-principal context with two-phase optimistic apply
//! - **services**: Orchestration of the add-stamp flow and read side
//! - **auth**: JWT identity provider and principal events
//! - **server** / **routes**: hyper HTTP API

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod session;
pub mod stamps;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, StampbookError};
