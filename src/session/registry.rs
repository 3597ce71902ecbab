//! Session registry and principal listener
//!
//! Contexts are opened lazily by any authenticated request, and tokens
//! expire without a sign-out, so idle contexts are evicted after a TTL.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::StampSession;
use crate::auth::PrincipalEvent;
use crate::services::StampService;

/// Idle time after which a context is dropped (matches the default JWT expiry)
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(3600);

/// Minimum spacing between expiry sweeps
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct SessionEntry {
    session: Arc<StampSession>,
    last_access: Instant,
}

impl SessionEntry {
    fn new(session: StampSession) -> Self {
        Self {
            session: Arc::new(session),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access.elapsed() >= ttl
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }
}

/// All open session contexts, keyed by user id
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    idle_ttl: Duration,
    last_cleanup: Mutex<Instant>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Look up a live context and refresh its idle timer
    ///
    /// An expired context is removed and reported as absent.
    pub fn get(&self, user_id: &str) -> Option<Arc<StampSession>> {
        let mut entry = self.sessions.get_mut(user_id)?;
        if entry.is_expired(self.idle_ttl) {
            drop(entry);
            self.sessions.remove_if(user_id, |_, e| e.is_expired(self.idle_ttl));
            debug!(user_id, "Idle session expired");
            return None;
        }
        entry.touch();
        Some(Arc::clone(&entry.session))
    }

    /// Register `session` unless a live one already exists for the same user
    ///
    /// Returns whichever session ends up registered.
    pub fn insert_if_absent(&self, session: StampSession) -> Arc<StampSession> {
        let user_id = session.principal().user_id.clone();
        let registered = {
            let mut entry = self
                .sessions
                .entry(user_id)
                .or_insert_with(|| SessionEntry::new(session));
            entry.touch();
            Arc::clone(&entry.session)
        };

        self.maybe_cleanup();
        registered
    }

    /// Drop the context for `user_id`; returns true if one existed
    pub fn discard(&self, user_id: &str) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    /// Remove every context idle for longer than the TTL
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, e| !e.is_expired(self.idle_ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        removed
    }

    /// Sweep expired contexts at most once per cleanup interval
    fn maybe_cleanup(&self) {
        let Ok(mut last) = self.last_cleanup.try_lock() else {
            return;
        };
        if last.elapsed() < CLEANUP_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);

        self.purge_expired();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Open and discard contexts as principals sign in and out
pub fn spawn_principal_listener(
    service: Arc<StampService>,
    mut events: broadcast::Receiver<PrincipalEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PrincipalEvent::SignedIn(principal)) => {
                    if let Err(e) = service.open_session(&principal).await {
                        warn!(
                            user_id = %principal.user_id,
                            error = %e,
                            "Failed to open session on sign-in"
                        );
                    }
                }
                Ok(PrincipalEvent::SignedOut(principal)) => {
                    service.close_session(&principal);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Principal listener lagged behind");
                }
                Err(RecvError::Closed) => {
                    debug!("Principal event channel closed");
                    break;
                }
            }
        }
        info!("Principal listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::stamps::{StampCollection, StampRecord};

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let registry = SessionRegistry::new();
        let principal = Principal::new("u1", None);

        let first = registry.insert_if_absent(StampSession::new(
            principal.clone(),
            StampCollection::from_records(vec![StampRecord::new(1, "a", 1)]),
        ));
        let second =
            registry.insert_if_absent(StampSession::new(principal, StampCollection::new()));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_discard() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent(StampSession::new(
            Principal::new("u1", None),
            StampCollection::new(),
        ));

        assert!(registry.get("u1").is_some());
        assert!(registry.discard("u1"));
        assert!(!registry.discard("u1"));
        assert!(registry.is_empty());
    }

    fn empty_session(user_id: &str) -> StampSession {
        StampSession::new(Principal::new(user_id, None), StampCollection::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires_on_lookup() {
        let registry = SessionRegistry::with_idle_ttl(Duration::from_secs(60));
        registry.insert_if_absent(empty_session("u1"));

        // Each lookup refreshes the idle timer
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(registry.get("u1").is_some());
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(registry.get("u1").is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(registry.get("u1").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_sweeps_idle_sessions() {
        let registry = SessionRegistry::with_idle_ttl(Duration::from_secs(600));
        registry.insert_if_absent(empty_session("u1"));
        registry.insert_if_absent(empty_session("u2"));

        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(registry.get("u2").is_some());

        // Past the sweep interval, only the untouched context is dropped
        tokio::time::advance(Duration::from_secs(450)).await;
        registry.insert_if_absent(empty_session("u3"));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("u1").is_none());
        assert!(registry.get("u2").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_recent_sessions() {
        let registry = SessionRegistry::with_idle_ttl(Duration::from_secs(60));
        registry.insert_if_absent(empty_session("old"));
        tokio::time::advance(Duration::from_secs(50)).await;
        registry.insert_if_absent(empty_session("new"));
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(registry.purge_expired(), 1);
        assert!(registry.get("new").is_some());
        assert!(registry.get("old").is_none());
    }
}
