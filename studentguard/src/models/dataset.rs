//! Dataset summaries returned by the upload, clean and data endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One preview record, keyed by column name.
pub type PreviewRow = serde_json::Map<String, serde_json::Value>;

/// Shape and quality figures for a dataset at one point in the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Number of records.
    pub total_rows: u64,
    /// Number of columns.
    pub total_columns: u64,
    /// Column names in file order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Inferred type per column.
    #[serde(default)]
    pub data_types: BTreeMap<String, String>,
    /// Missing-value count per column.
    #[serde(default)]
    pub missing_values: BTreeMap<String, u64>,
    /// The first records of the dataset.
    #[serde(default)]
    pub preview: Vec<PreviewRow>,
}

impl DatasetSnapshot {
    /// Sum of the per-column missing-value counts.
    #[must_use]
    pub fn total_missing_values(&self) -> u64 {
        self.missing_values.values().sum()
    }

    /// Columns that still contain missing values.
    #[must_use]
    pub fn columns_with_missing(&self) -> Vec<&str> {
        self.missing_values
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(column, _)| column.as_str())
            .collect()
    }

    /// Drops preview records beyond `limit`.
    pub fn truncate_preview(&mut self, limit: usize) {
        self.preview.truncate(limit);
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// The file name as stored by the service.
    pub filename: String,
    /// The service's confirmation message.
    pub message: String,
    /// The uploaded dataset.
    pub dataset: DatasetSnapshot,
}

impl UploadSummary {
    /// Sum of the per-column missing-value counts.
    #[must_use]
    pub fn total_missing_values(&self) -> u64 {
        self.dataset.total_missing_values()
    }
}

/// Result of a successful clean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanSummary {
    /// The service's confirmation message.
    pub message: String,
    /// Duplicate records removed.
    pub duplicates_removed: u64,
    /// Missing values filled in.
    pub missing_values_handled: u64,
    /// Columns coerced from text to numeric, with a description per column.
    pub text_converted_to_numeric: BTreeMap<String, String>,
    /// Out-of-range values clamped into their valid range.
    pub values_adjusted: u64,
    /// The dataset after cleaning.
    pub cleaned: DatasetSnapshot,
}

impl CleanSummary {
    /// Missing values left after cleaning.
    #[must_use]
    pub fn remaining_missing_values(&self) -> u64 {
        self.cleaned.total_missing_values()
    }
}

/// Counts reported by the clean endpoint.
///
/// Every field defaults, since the service omits steps that did nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningCounts {
    /// Duplicate records removed.
    #[serde(default)]
    pub duplicates_removed: u64,
    /// Missing values filled in.
    #[serde(default)]
    pub missing_values_handled: u64,
    /// Coercions per column.
    #[serde(default, deserialize_with = "deserialize_coercions")]
    pub text_converted_to_numeric: BTreeMap<String, String>,
    /// Out-of-range values clamped.
    #[serde(default)]
    pub values_adjusted: u64,
}

/// Accepts either a description string or a count per column.
fn deserialize_coercions<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(column, value)| {
            let description = match value {
                serde_json::Value::String(text) => text,
                serde_json::Value::Number(count) => format!("{count} text values coerced"),
                other => other.to_string(),
            };
            (column, description)
        })
        .collect())
}

/// Descriptive statistics for the current dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Shape and quality figures.
    #[serde(flatten)]
    pub dataset: DatasetSnapshot,
    /// Whether the figures describe the cleaned dataset.
    #[serde(default)]
    pub is_cleaned: bool,
    /// Per-column statistics (`count`, `mean`, `std`, `min`, quartiles, `max`).
    #[serde(default)]
    pub statistics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

/// Row and missing-value totals for one side of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTotals {
    /// Number of records.
    pub rows: u64,
    /// Total missing values.
    pub missing_values: u64,
}

/// Differences introduced by cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetChanges {
    /// Records dropped by cleaning.
    pub rows_removed: i64,
    /// Missing values eliminated by cleaning.
    pub missing_values_fixed: i64,
}

/// Original versus cleaned dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetComparison {
    /// The uploaded dataset.
    pub original: DatasetTotals,
    /// The cleaned dataset.
    pub cleaned: DatasetTotals,
    /// What changed.
    pub changes: DatasetChanges,
}

/// Confirmation that the service wrote the cleaned dataset out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    /// The service's confirmation message.
    #[serde(default)]
    pub message: String,
    /// Exported file name.
    pub filename: String,
    /// Location on the service host.
    pub path: String,
    /// Records written.
    pub rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_missing(pairs: &[(&str, u64)]) -> DatasetSnapshot {
        DatasetSnapshot {
            missing_values: pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_missing_values() {
        let snapshot = snapshot_with_missing(&[("age", 3), ("score", 2), ("name", 0)]);
        assert_eq!(snapshot.total_missing_values(), 5);
        assert_eq!(snapshot.columns_with_missing(), vec!["age", "score"]);
    }

    #[test]
    fn test_total_missing_values_empty() {
        assert_eq!(DatasetSnapshot::default().total_missing_values(), 0);
    }

    #[test]
    fn test_truncate_preview() {
        let mut snapshot = DatasetSnapshot {
            preview: vec![PreviewRow::new(); 12],
            ..Default::default()
        };
        snapshot.truncate_preview(10);
        assert_eq!(snapshot.preview.len(), 10);
    }

    #[test]
    fn test_cleaning_counts_accepts_counts_and_descriptions() {
        let counts: CleaningCounts = serde_json::from_value(serde_json::json!({
            "duplicates_removed": 1,
            "missing_values_handled": 4,
            "text_converted_to_numeric": {"horas_estudio": 2, "riesgo": "mapped labels"}
        }))
        .unwrap();

        assert_eq!(counts.values_adjusted, 0);
        assert_eq!(
            counts.text_converted_to_numeric.get("horas_estudio").unwrap(),
            "2 text values coerced"
        );
        assert_eq!(
            counts.text_converted_to_numeric.get("riesgo").unwrap(),
            "mapped labels"
        );
    }

    #[test]
    fn test_dataset_info_flattened() {
        let info: DatasetInfo = serde_json::from_value(serde_json::json!({
            "total_rows": 20,
            "total_columns": 2,
            "columns": ["a", "b"],
            "missing_values": {"a": 0, "b": 1},
            "data_types": {"a": "int64", "b": "float64"},
            "is_cleaned": true,
            "statistics": {"a": {"mean": 1.5, "std": null}}
        }))
        .unwrap();

        assert!(info.is_cleaned);
        assert_eq!(info.dataset.total_missing_values(), 1);
        assert_eq!(info.statistics["a"]["mean"], Some(1.5));
        assert_eq!(info.statistics["a"]["std"], None);
    }
}
