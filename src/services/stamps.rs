//! Stamp Service - session-scoped orchestration of the stamp core
//!
//! Binds the store, the session registry and the toast delay together:
//! - Load-on-entry: the first request (or sign-in) of a principal loads
//!   their collection into a session context
//! - Add stamp: validate, apply tentatively, persist, then confirm or roll back
//! - Read side: snapshots, grid, reasons list, exports and reports
//!
//! ## Add-stamp flow
//!
//! 1. Controller validation against the in-memory collection
//! 2. Tentative apply in the session context
//! 3. Additive append to the store
//! 4. Reload the stored collection so the session picks up stamps written
//!    by other sessions, then confirm and re-scan achievements
//! 5. On failure roll back; a remote conflict also reloads

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::Principal;
use crate::session::{SessionRegistry, StampSession};
use crate::stamps::{
    achievement_board, filter_and_sort, format_for_export, generate, grid, now_millis, progress,
    AchievementStatus, Artifact, GridCell, ReportFont, ReportFormat, SortKey, StampCollection,
    StampRecord, ValidationError, MAX_STAMPS,
};
use crate::store::{AppendOutcome, StampStore};
use crate::types::{Result, StampbookError};

/// Download name for the reasons export
pub const REASONS_EXPORT_FILENAME: &str = "resignation_reasons.txt";

// ============================================================================
// Types
// ============================================================================

/// Service configuration
#[derive(Debug, Clone)]
pub struct StampServiceConfig {
    /// How long a toast stays visible (default: 3 s)
    pub toast_ttl: Duration,
    /// Font used when a report request names none
    pub report_font: ReportFont,
}

impl Default for StampServiceConfig {
    fn default() -> Self {
        Self {
            toast_ttl: Duration::from_millis(3000),
            report_font: ReportFont::default(),
        }
    }
}

/// Everything the stamp page renders for one principal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampBookView {
    pub user_id: String,
    pub display_name: String,
    pub stamps: StampCollection,
    pub count: usize,
    pub max_stamps: u32,
    pub progress: f64,
    pub achievements: Vec<AchievementStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
    /// Stamps applied locally whose write has not completed
    pub pending: usize,
}

/// Result of a successful add-stamp
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStampResult {
    pub record: StampRecord,
    /// False when the store already held this exact record
    pub newly_written: bool,
    pub progress: f64,
    pub notifications: Vec<String>,
}

// ============================================================================
// Stamp Service
// ============================================================================

pub struct StampService {
    store: Arc<dyn StampStore>,
    sessions: Arc<SessionRegistry>,
    config: StampServiceConfig,
}

impl StampService {
    pub fn new(
        store: Arc<dyn StampStore>,
        sessions: Arc<SessionRegistry>,
        config: StampServiceConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn config(&self) -> &StampServiceConfig {
        &self.config
    }

    /// Return the principal's session, loading it from the store if needed
    ///
    /// Idempotent: an existing context is returned untouched.
    pub async fn open_session(&self, principal: &Principal) -> Result<Arc<StampSession>> {
        if let Some(session) = self.sessions.get(&principal.user_id) {
            return Ok(session);
        }

        let collection = self.store.load(&principal.user_id).await?;
        info!(
            user_id = %principal.user_id,
            stamps = collection.len(),
            backend = self.store.backend(),
            "Loaded stamp collection"
        );

        Ok(self
            .sessions
            .insert_if_absent(StampSession::new(principal.clone(), collection)))
    }

    /// Discard the principal's session; returns true if one was open
    pub fn close_session(&self, principal: &Principal) -> bool {
        let discarded = self.sessions.discard(&principal.user_id);
        if discarded {
            debug!(user_id = %principal.user_id, "Session discarded");
        }
        discarded
    }

    pub async fn snapshot(&self, principal: &Principal) -> Result<StampBookView> {
        let session = self.open_session(principal).await?;
        let snapshot = session.snapshot().await;

        Ok(StampBookView {
            user_id: principal.user_id.clone(),
            display_name: principal.display_name().to_string(),
            count: snapshot.collection.len(),
            max_stamps: MAX_STAMPS,
            progress: progress(&snapshot.collection),
            achievements: achievement_board(&snapshot.unlocked),
            toast: snapshot.toast,
            pending: snapshot.pending,
            stamps: snapshot.collection,
        })
    }

    /// Add a stamp timestamped now
    pub async fn add_stamp(
        &self,
        principal: &Principal,
        index: u32,
        reason: &str,
    ) -> Result<AddStampResult> {
        self.add_stamp_at(principal, index, reason, now_millis()).await
    }

    /// Add a stamp with an explicit timestamp
    pub async fn add_stamp_at(
        &self,
        principal: &Principal,
        index: u32,
        reason: &str,
        timestamp: i64,
    ) -> Result<AddStampResult> {
        let session = self.open_session(principal).await?;
        let record = session.begin_append(index, reason, timestamp).await?;

        let outcome = match self.store.append(&principal.user_id, &record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                session.rollback(&record).await;
                match &e {
                    StampbookError::StoreUnavailable(cause) => warn!(
                        user_id = %principal.user_id,
                        index,
                        cause = %cause,
                        "Stamp not persisted, local state rolled back"
                    ),
                    StampbookError::Validation(ValidationError::IndexAlreadyStamped(_)) => {
                        warn!(
                            user_id = %principal.user_id,
                            index,
                            "Index taken by another session, local state rolled back"
                        );
                        self.resync(&session, &principal.user_id).await;
                    }
                    other => warn!(
                        user_id = %principal.user_id,
                        index,
                        error = %other,
                        "Append failed, local state rolled back"
                    ),
                }
                return Err(e);
            }
        };

        self.resync(&session, &principal.user_id).await;
        let update = session.confirm(&record).await;
        for message in &update.notifications {
            session.show_toast(message.clone(), self.config.toast_ttl).await;
        }

        let collection = session.collection().await;
        info!(
            user_id = %principal.user_id,
            index,
            stamps = collection.len(),
            unlocked = ?update.newly_unlocked,
            "Stamp added"
        );

        Ok(AddStampResult {
            record,
            newly_written: outcome == AppendOutcome::Appended,
            progress: progress(&collection),
            notifications: update.notifications,
        })
    }

    /// Rebase the session on the stored collection
    ///
    /// A failed reload leaves the session as it is; the next append retries.
    async fn resync(&self, session: &StampSession, user_id: &str) {
        match self.store.load(user_id).await {
            Ok(remote) => session.rebase(remote).await,
            Err(e) => warn!(
                user_id = %user_id,
                error = %e,
                "Could not reload collection, session may lag the store"
            ),
        }
    }

    pub async fn grid(&self, principal: &Principal) -> Result<Vec<GridCell>> {
        let session = self.open_session(principal).await?;
        Ok(grid(&session.collection().await))
    }

    /// Reasons list filtered by `search` and ordered by `sort`
    pub async fn reasons(
        &self,
        principal: &Principal,
        search: &str,
        sort: SortKey,
    ) -> Result<Vec<StampRecord>> {
        let session = self.open_session(principal).await?;
        Ok(filter_and_sort(&session.collection().await, search, sort))
    }

    /// The filtered reasons list rendered with the export template
    pub async fn export_reasons(
        &self,
        principal: &Principal,
        search: &str,
        sort: SortKey,
    ) -> Result<Artifact> {
        let records = self.reasons(principal, search, sort).await?;
        Ok(Artifact {
            filename: REASONS_EXPORT_FILENAME.to_string(),
            content_type: "text/plain; charset=utf-8",
            bytes: format_for_export(&records).into_bytes(),
        })
    }

    /// Report over the principal's collection; falls back to the configured font
    pub async fn report(
        &self,
        principal: &Principal,
        format: ReportFormat,
        font: Option<&ReportFont>,
    ) -> Result<Artifact> {
        let session = self.open_session(principal).await?;
        let collection = session.collection().await;
        let font = font.unwrap_or(&self.config.report_font);

        debug!(
            user_id = %principal.user_id,
            format = %format,
            stamps = collection.len(),
            "Generating report"
        );
        generate(&collection, principal.display_name(), format, font)
    }
}
