//! Stamp collection core
//!
//! Everything in here is a pure function of a `StampCollection`:
//! - `record`: the stamp record and the per-user collection
//! - `controller`: add-stamp validation, progress, achievement detection
//! - `achievements`: the fixed milestone list
//! - `view`: search/sort over the reasons list and the export template
//! - `report`: PDF and plain-text report rendering
//! - `quote`: the deterministic quote of the day
//!
//! Persistence and sessions live in `store` and `session`; this module
//! never touches either.

pub mod achievements;
pub mod controller;
pub mod quote;
pub mod record;
pub mod report;
pub mod view;

pub use achievements::{achievement_board, Achievement, AchievementStatus, ACHIEVEMENTS};
pub use controller::{
    add_stamp, add_stamp_at, can_stamp, grid, progress, recompute_achievements,
    AchievementUpdate, GridCell, ValidationError,
};
pub use quote::{daily_quote, quote_for_date, QUOTES};
pub use record::{StampCollection, StampRecord};
pub use report::{generate, Artifact, ReportFont, ReportFormat};
pub use view::{filter_and_sort, format_for_export, SortKey};

/// Number of cells on the stamp grid
pub const MAX_STAMPS: u32 = 100;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
