//! Selection report: the persisted artifact of a selection run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Indices chosen for labeling, with the names they map to.
///
/// `selected_indices` is in selection order (most informative first) and
/// `selected_filenames` is parallel to it. `total` is the pool size at
/// selection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub selected_indices: Vec<usize>,
    pub selected_filenames: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub total: usize,
}

impl SelectionReport {
    /// Builds a report from chosen indices and the pool's names.
    ///
    /// `names` must be in the same order the pool was fed to the model; the
    /// report never re-derives names from storage.
    ///
    /// # Errors
    ///
    /// - `DataError::IndexOutOfRange` if an index is not a valid pool position
    /// - `DataError::DuplicateIndex` if an index repeats
    pub fn build(
        indices: Vec<usize>,
        names: &[String],
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DataError> {
        let mut seen = HashSet::with_capacity(indices.len());
        let mut filenames = Vec::with_capacity(indices.len());

        for &index in &indices {
            let name = names.get(index).ok_or(DataError::IndexOutOfRange {
                index,
                pool_size: names.len(),
            })?;
            if !seen.insert(index) {
                return Err(DataError::DuplicateIndex(index));
            }
            filenames.push(name.clone());
        }

        Ok(Self {
            selected_indices: indices,
            selected_filenames: filenames,
            timestamp,
            total: names.len(),
        })
    }

    /// Number of selected samples.
    pub fn len(&self) -> usize {
        self.selected_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_indices.is_empty()
    }

    /// `(index, filename)` pairs in selection order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.selected_indices
            .iter()
            .copied()
            .zip(self.selected_filenames.iter().map(String::as_str))
    }

    /// Serializes to the artifact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses an artifact JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn names() -> Vec<String> {
        ["frame_a.png", "frame_b.png", "frame_c.png", "frame_d.png"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_build_maps_names_in_selection_order() {
        let report = SelectionReport::build(vec![2, 0, 3], &names(), timestamp()).unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(
            report.selected_filenames,
            vec!["frame_c.png", "frame_a.png", "frame_d.png"]
        );
        let entries: Vec<_> = report.entries().collect();
        assert_eq!(entries[0], (2, "frame_c.png"));
    }

    #[test]
    fn test_build_rejects_out_of_range() {
        let err = SelectionReport::build(vec![0, 4], &names(), timestamp()).unwrap_err();
        assert_eq!(
            err,
            DataError::IndexOutOfRange {
                index: 4,
                pool_size: 4
            }
        );
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let err = SelectionReport::build(vec![1, 1], &names(), timestamp()).unwrap_err();
        assert_eq!(err, DataError::DuplicateIndex(1));
    }

    #[test]
    fn test_artifact_schema() {
        let report = SelectionReport::build(vec![1, 3], &names(), timestamp()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["selected_indices"], serde_json::json!([1, 3]));
        assert_eq!(
            value["selected_filenames"],
            serde_json::json!(["frame_b.png", "frame_d.png"])
        );
        assert_eq!(value["total"], 4);
        assert_eq!(value["timestamp"], "2026-03-14T09:26:53Z");
    }

    #[test]
    fn test_json_round_trip() {
        let ts = Utc.timestamp_opt(1_760_000_000, 123_456_789).unwrap();
        let report = SelectionReport::build(vec![3, 1, 0, 2], &names(), ts).unwrap();

        let parsed = SelectionReport::from_json(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.selected_indices, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_empty_selection() {
        let report = SelectionReport::build(Vec::new(), &names(), timestamp()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.total, 4);
    }
}
