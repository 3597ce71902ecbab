//! HTTP server for Stampbook

pub mod http;

pub use http::{run, AppState};

/// Dev-mode state over an in-memory store, for route tests
#[cfg(test)]
pub(crate) fn test_state() -> (
    std::sync::Arc<AppState>,
    std::sync::Arc<crate::store::InMemoryStampStore>,
) {
    use clap::Parser;
    use std::sync::Arc;

    let args = crate::config::Args::try_parse_from(["stampbook", "--dev-mode"]).unwrap();
    let store = Arc::new(crate::store::InMemoryStampStore::new());
    let state = AppState::new(args, store.clone()).unwrap();
    (Arc::new(state), store)
}
