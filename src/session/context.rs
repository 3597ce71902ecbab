//! Per-user session context
//!
//! Holds the in-memory copy of one principal's collection plus the
//! achievement and toast state shown to them. Appends are two-phase:
//! `begin_append` applies tentatively, then the caller either confirms
//! after the store accepted the record or rolls it back.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::auth::Principal;
use crate::stamps::{
    add_stamp_at, recompute_achievements, AchievementUpdate, StampCollection, StampRecord,
    ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Toast {
    id: u64,
    message: String,
}

#[derive(Debug, Default)]
struct SessionState {
    collection: StampCollection,
    /// Records applied locally but not yet acknowledged by the store
    pending: HashSet<StampRecord>,
    unlocked: BTreeSet<u32>,
}

impl SessionState {
    fn confirmed(&self) -> StampCollection {
        self.collection
            .iter()
            .filter(|r| !self.pending.contains(*r))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }
}

/// Point-in-time copy of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub collection: StampCollection,
    pub unlocked: BTreeSet<u32>,
    pub toast: Option<String>,
    pub pending: usize,
}

pub struct StampSession {
    principal: Principal,
    state: RwLock<SessionState>,
    toast: Arc<RwLock<Option<Toast>>>,
    toast_seq: AtomicU64,
}

impl StampSession {
    /// Open a context over a freshly loaded collection
    ///
    /// Thresholds the collection already meets are marked unlocked without
    /// raising notifications.
    pub fn new(principal: Principal, collection: StampCollection) -> Self {
        let primed = recompute_achievements(&collection, &BTreeSet::new());
        Self {
            principal,
            state: RwLock::new(SessionState {
                collection,
                pending: HashSet::new(),
                unlocked: primed.newly_unlocked,
            }),
            toast: Arc::new(RwLock::new(None)),
            toast_seq: AtomicU64::new(0),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            collection: state.collection.clone(),
            unlocked: state.unlocked.clone(),
            toast: self.toast().await,
            pending: state.pending.len(),
        }
    }

    pub async fn collection(&self) -> StampCollection {
        self.state.read().await.collection.clone()
    }

    /// Validate and apply a stamp locally, pending store acknowledgement
    pub async fn begin_append(
        &self,
        index: u32,
        reason: &str,
        timestamp: i64,
    ) -> Result<StampRecord, ValidationError> {
        let mut state = self.state.write().await;
        let next = add_stamp_at(&state.collection, index, reason, timestamp)?;

        let record = next
            .get(index)
            .cloned()
            .ok_or(ValidationError::IndexAlreadyStamped(index))?;

        state.collection = next;
        state.pending.insert(record.clone());
        debug!(user_id = %self.principal.user_id, index, "Stamp applied tentatively");
        Ok(record)
    }

    /// Mark a tentative record as persisted and re-scan achievements
    ///
    /// Only confirmed records count towards thresholds.
    pub async fn confirm(&self, record: &StampRecord) -> AchievementUpdate {
        let mut state = self.state.write().await;
        state.pending.remove(record);

        let update = recompute_achievements(&state.confirmed(), &state.unlocked);
        state.unlocked.extend(update.newly_unlocked.iter().copied());
        update
    }

    /// Undo a tentative record
    ///
    /// Returns false if the record was not pending.
    pub async fn rollback(&self, record: &StampRecord) -> bool {
        let mut state = self.state.write().await;
        if !state.pending.remove(record) {
            return false;
        }
        state.collection.remove_record(record)
    }

    /// Adopt the store's copy of the collection, keeping in-flight records
    ///
    /// Pending records whose index the store does not hold yet are kept
    /// after the remote ones. Thresholds already met by confirmed records
    /// are marked unlocked without notifications.
    pub async fn rebase(&self, remote: StampCollection) {
        let mut state = self.state.write().await;
        let mut records = remote.records().to_vec();
        records.extend(
            state
                .collection
                .iter()
                .filter(|r| state.pending.contains(*r) && !remote.contains_index(r.index))
                .cloned(),
        );
        state.collection = records.into();

        let primed = recompute_achievements(&state.confirmed(), &state.unlocked);
        state.unlocked.extend(primed.newly_unlocked);
        debug!(
            user_id = %self.principal.user_id,
            stamps = state.collection.len(),
            "Session rebased on store"
        );
    }

    pub async fn unlocked(&self) -> BTreeSet<u32> {
        self.state.read().await.unlocked.clone()
    }

    pub async fn toast(&self) -> Option<String> {
        self.toast.read().await.as_ref().map(|t| t.message.clone())
    }

    /// Show `message` and clear it after `ttl`
    ///
    /// The clearing task is detached. A newer toast replaces this one and
    /// is left alone when the older timer fires.
    pub async fn show_toast(&self, message: impl Into<String>, ttl: Duration) {
        let id = self.toast_seq.fetch_add(1, Ordering::Relaxed) + 1;
        *self.toast.write().await = Some(Toast {
            id,
            message: message.into(),
        });

        let toast = Arc::clone(&self.toast);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut current = toast.write().await;
            if current.as_ref().map(|t| t.id) == Some(id) {
                *current = None;
            }
        });
    }
}
