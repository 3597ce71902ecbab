//! Stamp collection controller
//!
//! Enforces the add-stamp rules and derives progress and achievements.
//! A grid cell only ever moves Empty -> Stamped.

use serde::Serialize;
use std::collections::BTreeSet;

use super::achievements::ACHIEVEMENTS;
use super::record::{StampCollection, StampRecord};
use super::{now_millis, MAX_STAMPS};

/// Local validation failures, raised before any persistence attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Reason must not be empty")]
    InvalidReason,

    #[error("Stamp index {index} is outside 1..={max}")]
    IndexOutOfRange { index: i64, max: u32 },

    #[error("Stamp index {0} is already stamped")]
    IndexAlreadyStamped(u32),
}

/// True iff `index` is on the grid and not yet stamped
pub fn can_stamp(collection: &StampCollection, index: u32) -> bool {
    (1..=MAX_STAMPS).contains(&index) && !collection.contains_index(index)
}

/// Build the next collection with a stamp at `index`, timestamped now
pub fn add_stamp(
    collection: &StampCollection,
    index: u32,
    reason: &str,
) -> Result<StampCollection, ValidationError> {
    add_stamp_at(collection, index, reason, now_millis())
}

/// Build the next collection with a stamp at `index` and an explicit timestamp
///
/// The input collection is never modified. Errors are checked in order:
/// blank reason, off-grid index, already-stamped index.
pub fn add_stamp_at(
    collection: &StampCollection,
    index: u32,
    reason: &str,
    timestamp: i64,
) -> Result<StampCollection, ValidationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::InvalidReason);
    }

    if !(1..=MAX_STAMPS).contains(&index) {
        return Err(ValidationError::IndexOutOfRange {
            index: index.into(),
            max: MAX_STAMPS,
        });
    }

    if !can_stamp(collection, index) {
        return Err(ValidationError::IndexAlreadyStamped(index));
    }

    let mut next = collection.clone();
    next.push(StampRecord::new(index, reason, timestamp));
    Ok(next)
}

/// Percentage of the grid filled, rounded to 2 decimal places
pub fn progress(collection: &StampCollection) -> f64 {
    let ratio = collection.len() as f64 / MAX_STAMPS as f64 * 100.0;
    ((ratio * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

/// Result of an achievement re-scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementUpdate {
    pub newly_unlocked: BTreeSet<u32>,
    pub notifications: Vec<String>,
}

impl AchievementUpdate {
    pub fn is_empty(&self) -> bool {
        self.newly_unlocked.is_empty()
    }
}

/// Re-scan every threshold against the collection size
///
/// Only thresholds missing from `previously_unlocked` are reported, so
/// re-running with the same inputs after merging the result yields nothing.
pub fn recompute_achievements(
    collection: &StampCollection,
    previously_unlocked: &BTreeSet<u32>,
) -> AchievementUpdate {
    let size = collection.len() as u32;
    let mut update = AchievementUpdate::default();

    for achievement in ACHIEVEMENTS.iter() {
        if size >= achievement.threshold && !previously_unlocked.contains(&achievement.threshold) {
            update.newly_unlocked.insert(achievement.threshold);
            update.notifications.push(achievement.notification());
        }
    }

    update
}

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub index: u32,
    pub stamped: bool,
}

/// All cells 1..=MAX_STAMPS with their stamped state
pub fn grid(collection: &StampCollection) -> Vec<GridCell> {
    (1..=MAX_STAMPS)
        .map(|index| GridCell {
            index,
            stamped: !can_stamp(collection, index),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: u32) -> StampCollection {
        StampCollection::from_records(
            (1..=count)
                .map(|i| StampRecord::new(i, format!("reason {i}"), i as i64))
                .collect(),
        )
    }

    #[test]
    fn test_can_stamp_rejects_existing_and_off_grid() {
        let collection = filled(3);
        assert!(!can_stamp(&collection, 1));
        assert!(!can_stamp(&collection, 3));
        assert!(can_stamp(&collection, 4));
        assert!(!can_stamp(&collection, 0));
        assert!(!can_stamp(&collection, MAX_STAMPS + 1));
        assert!(can_stamp(&collection, MAX_STAMPS));
    }

    #[test]
    fn test_add_stamp_appends_trimmed_reason() {
        let collection = StampCollection::new();
        let next = add_stamp_at(&collection, 1, "  left for growth \n", 42).unwrap();

        assert!(collection.is_empty());
        assert_eq!(next.len(), 1);
        assert_eq!(next.records()[0], StampRecord::new(1, "left for growth", 42));
        assert_eq!(progress(&next), 1.0);
        assert!(recompute_achievements(&next, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_add_stamp_preserves_prior_records() {
        let collection = filled(10);
        let next = add_stamp_at(&collection, 50, "x", 999).unwrap();
        assert_eq!(next.len(), collection.len() + 1);
        assert_eq!(&next.records()[..10], collection.records());
        assert_eq!(next.records()[10].index, 50);
    }

    #[test]
    fn test_blank_reason_rejected() {
        let collection = filled(2);
        for reason in ["", "   ", "\t\n"] {
            assert_eq!(
                add_stamp_at(&collection, 5, reason, 1),
                Err(ValidationError::InvalidReason)
            );
        }
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_blank_reason_checked_before_index() {
        let collection = filled(5);
        assert_eq!(
            add_stamp_at(&collection, 5, " ", 1),
            Err(ValidationError::InvalidReason)
        );
        assert_eq!(
            add_stamp_at(&collection, 0, "", 1),
            Err(ValidationError::InvalidReason)
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let collection = StampCollection::new();
        assert_eq!(
            add_stamp_at(&collection, 0, "x", 1),
            Err(ValidationError::IndexOutOfRange { index: 0, max: 100 })
        );
        assert_eq!(
            add_stamp_at(&collection, 101, "x", 1),
            Err(ValidationError::IndexOutOfRange { index: 101, max: 100 })
        );
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let collection = filled(6);
        assert_eq!(
            add_stamp_at(&collection, 5, "again", 1),
            Err(ValidationError::IndexAlreadyStamped(5))
        );
        assert_eq!(collection, filled(6));
    }

    #[test]
    fn test_progress_bounds_and_rounding() {
        assert_eq!(progress(&StampCollection::new()), 0.0);
        assert_eq!(progress(&filled(1)), 1.0);
        assert_eq!(progress(&filled(33)), 33.0);
        assert_eq!(progress(&filled(MAX_STAMPS)), 100.0);

        let mut last = 0.0;
        let mut collection = StampCollection::new();
        for i in 1..=MAX_STAMPS {
            collection = add_stamp_at(&collection, i, "r", i as i64).unwrap();
            let p = progress(&collection);
            assert!(p >= last);
            assert!((0.0..=100.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_twenty_fifth_stamp_unlocks_first_achievement() {
        let collection = filled(24);
        let mut unlocked = BTreeSet::new();
        assert!(recompute_achievements(&collection, &unlocked).is_empty());

        let next = add_stamp_at(&collection, 25, "x", 100).unwrap();
        let update = recompute_achievements(&next, &unlocked);
        assert_eq!(update.newly_unlocked, [25].into_iter().collect());
        assert_eq!(update.notifications.len(), 1);
        assert!(update.notifications[0].contains("Reached 25 stamps"));

        unlocked.extend(update.newly_unlocked);
        assert!(recompute_achievements(&next, &unlocked).is_empty());
    }

    #[test]
    fn test_recompute_reports_every_missing_threshold() {
        let update = recompute_achievements(&filled(80), &[25].into_iter().collect());
        assert_eq!(update.newly_unlocked, [50, 75].into_iter().collect());
        assert_eq!(update.notifications.len(), 2);
    }

    #[test]
    fn test_grid_reflects_stamped_cells() {
        let collection = StampCollection::from_records(vec![
            StampRecord::new(7, "a", 1),
            StampRecord::new(100, "b", 2),
        ]);
        let cells = grid(&collection);
        assert_eq!(cells.len(), MAX_STAMPS as usize);
        assert_eq!(cells[0], GridCell { index: 1, stamped: false });
        assert!(cells[6].stamped);
        assert!(cells[99].stamped);
        assert_eq!(cells.iter().filter(|c| c.stamped).count(), 2);
    }
}
