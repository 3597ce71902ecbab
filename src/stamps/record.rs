//! Stamp records and the per-user collection

use serde::{Deserialize, Serialize};

/// A single collected stamp
///
/// Field order matters: MongoDB compares embedded documents field by field
/// when `$addToSet` deduplicates, so every writer must serialize the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampRecord {
    /// Grid position, 1..=MAX_STAMPS
    pub index: u32,
    /// Trimmed, non-empty justification
    pub reason: String,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl StampRecord {
    pub fn new(index: u32, reason: impl Into<String>, timestamp: i64) -> Self {
        Self {
            index,
            reason: reason.into(),
            timestamp,
        }
    }
}

/// Ordered stamps for one user, insertion order = creation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StampCollection {
    records: Vec<StampRecord>,
}

impl StampCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<StampRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StampRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_index(&self, index: u32) -> bool {
        self.records.iter().any(|r| r.index == index)
    }

    pub fn get(&self, index: u32) -> Option<&StampRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StampRecord> {
        self.records.iter()
    }

    /// Append without validation; callers go through the controller
    pub(crate) fn push(&mut self, record: StampRecord) {
        self.records.push(record);
    }

    /// Remove the last occurrence of exactly `record`
    ///
    /// Returns true if something was removed.
    pub(crate) fn remove_record(&mut self, record: &StampRecord) -> bool {
        match self.records.iter().rposition(|r| r == record) {
            Some(pos) => {
                self.records.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl From<Vec<StampRecord>> for StampCollection {
    fn from(records: Vec<StampRecord>) -> Self {
        Self::from_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_array() {
        let collection =
            StampCollection::from_records(vec![StampRecord::new(3, "late again", 1700)]);
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "index": 3, "reason": "late again", "timestamp": 1700 }])
        );
    }

    #[test]
    fn test_remove_record_only_exact_match() {
        let mut collection = StampCollection::new();
        collection.push(StampRecord::new(1, "a", 10));
        collection.push(StampRecord::new(2, "b", 20));

        assert!(!collection.remove_record(&StampRecord::new(2, "b", 21)));
        assert!(collection.remove_record(&StampRecord::new(2, "b", 20)));
        assert_eq!(collection.len(), 1);
        assert!(collection.contains_index(1));
        assert!(!collection.contains_index(2));
    }
}
