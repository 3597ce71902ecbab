//! Per-principal session contexts
//!
//! One context per signed-in user, created on sign-in (or first request)
//! and discarded on sign-out.

pub mod context;
pub mod registry;

pub use context::{SessionSnapshot, StampSession};
pub use registry::{spawn_principal_listener, SessionRegistry};
