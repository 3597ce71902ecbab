//! Fixed milestone list
//!
//! Thresholds sit at a quarter, half, three quarters, and all of the grid.

use serde::Serialize;
use std::collections::BTreeSet;

use super::MAX_STAMPS;

/// A milestone unlocked when the collection reaches `threshold` stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub threshold: u32,
    /// Badge colour hint for the front end
    pub color: &'static str,
}

impl Achievement {
    pub fn label(&self) -> String {
        format!("Reached {} stamps", self.threshold)
    }

    pub fn notification(&self) -> String {
        format!("🎉 Congratulations! {} 🎉", self.label())
    }
}

/// Ascending by threshold
pub const ACHIEVEMENTS: [Achievement; 4] = [
    Achievement {
        threshold: MAX_STAMPS / 4,
        color: "yellow",
    },
    Achievement {
        threshold: MAX_STAMPS / 2,
        color: "green",
    },
    Achievement {
        threshold: MAX_STAMPS * 3 / 4,
        color: "blue",
    },
    Achievement {
        threshold: MAX_STAMPS,
        color: "purple",
    },
];

/// One row of the achievement board
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub threshold: u32,
    pub label: String,
    pub color: &'static str,
    pub unlocked: bool,
}

/// Every achievement with its unlocked flag, in threshold order
pub fn achievement_board(unlocked: &BTreeSet<u32>) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|a| AchievementStatus {
            threshold: a.threshold,
            label: a.label(),
            color: a.color,
            unlocked: unlocked.contains(&a.threshold),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_ascending() {
        let thresholds: Vec<u32> = ACHIEVEMENTS.iter().map(|a| a.threshold).collect();
        assert_eq!(thresholds, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_board_marks_unlocked() {
        let unlocked: BTreeSet<u32> = [25, 50].into_iter().collect();
        let board = achievement_board(&unlocked);
        assert_eq!(board.len(), 4);
        assert!(board[0].unlocked);
        assert!(board[1].unlocked);
        assert!(!board[2].unlocked);
        assert_eq!(board[3].label, "Reached 100 stamps");
    }
}
