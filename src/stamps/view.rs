//! Reasons overview: search, sort, and the export line template

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{StampCollection, StampRecord};

/// Ordering for the reasons list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Timestamp,
    Index,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Timestamp => write!(f, "timestamp"),
            SortKey::Index => write!(f, "index"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timestamp" | "time" => Ok(SortKey::Timestamp),
            "index" => Ok(SortKey::Index),
            other => Err(format!("Unknown sort key: {other}")),
        }
    }
}

/// Records whose reason contains `search_text` (case-insensitive), sorted by `sort_key`
///
/// Empty search matches everything. The sort is stable, so equal keys keep
/// collection order.
pub fn filter_and_sort(
    collection: &StampCollection,
    search_text: &str,
    sort_key: SortKey,
) -> Vec<StampRecord> {
    let needle = search_text.to_lowercase();

    let mut matches: Vec<StampRecord> = collection
        .iter()
        .filter(|r| needle.is_empty() || r.reason.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    match sort_key {
        SortKey::Timestamp => matches.sort_by_key(|r| r.timestamp),
        SortKey::Index => matches.sort_by_key(|r| r.index),
    }

    matches
}

/// Display format for stamp timestamps (UTC)
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Render records with the fixed export template
///
/// Shared by the clipboard copy and the text download.
pub fn format_for_export(records: &[StampRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "Stamp #{} - {}\n{}\n",
                r.index,
                format_timestamp(r.timestamp),
                r.reason
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StampCollection {
        StampCollection::from_records(vec![
            StampRecord::new(9, "Meetings about meetings", 3_000),
            StampRecord::new(2, "Boss took credit", 1_000),
            StampRecord::new(5, "Another pointless MEETING", 2_000),
            StampRecord::new(1, "No raise", 2_000),
        ])
    }

    #[test]
    fn test_empty_search_returns_all_sorted() {
        let by_time = filter_and_sort(&sample(), "", SortKey::Timestamp);
        let indices: Vec<u32> = by_time.iter().map(|r| r.index).collect();
        // 5 and 1 tie on timestamp and keep collection order
        assert_eq!(indices, vec![2, 5, 1, 9]);

        let by_index = filter_and_sort(&sample(), "", SortKey::Index);
        let indices: Vec<u32> = by_index.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 5, 9]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let found = filter_and_sort(&sample(), "meeting", SortKey::Index);
        let indices: Vec<u32> = found.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![5, 9]);
    }

    #[test]
    fn test_search_with_no_match_is_empty() {
        assert!(filter_and_sort(&sample(), "vacation", SortKey::Timestamp).is_empty());
    }

    #[test]
    fn test_filter_does_not_mutate_collection() {
        let collection = sample();
        let before = collection.clone();
        let _ = filter_and_sort(&collection, "no", SortKey::Index);
        assert_eq!(collection, before);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("index".parse::<SortKey>().unwrap(), SortKey::Index);
        assert_eq!("Timestamp".parse::<SortKey>().unwrap(), SortKey::Timestamp);
        assert!("reason".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_export_template() {
        let records = vec![
            StampRecord::new(3, "first", 0),
            StampRecord::new(1, "second", 86_400_000),
        ];
        let text = format_for_export(&records);
        assert_eq!(
            text,
            "Stamp #3 - 1970/01/01 00:00:00\nfirst\n\nStamp #1 - 1970/01/02 00:00:00\nsecond\n"
        );
        assert_eq!(format_for_export(&[]), "");
    }
}
