//! Data integrity checks run once after loading.
//!
//! Nothing here rejects the dataset; the report is logged at startup and
//! served by the web shell.

use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    InconsistentCoordinates { enhancer_id: String, kept: String, found: String },
    ConflictingAnnotation { enhancer_id: String, field: String, kept: String, found: String },
    NegativeScores { count: usize },
    ScoresAboveOne { count: usize },
    MetadataWithoutAccessibility { count: usize, examples: Vec<String> },
    PlaceholderMetadata { count: usize, examples: Vec<String> },
    DuplicateRowsRemoved { count: usize },
    MetadataRowsWithoutId { count: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

const MAX_EXAMPLES: usize = 5;

impl IntegrityReport {
    pub fn check(dataset: &Dataset) -> Self {
        let notes = dataset.notes();
        let mut issues = Vec::new();

        for (id, found) in &notes.coordinate_conflicts {
            let kept = dataset
                .enhancer(id.as_str())
                .map(|e| e.interval.to_string())
                .unwrap_or_default();
            issues.push(IntegrityIssue::InconsistentCoordinates {
                enhancer_id: id.to_string(),
                kept,
                found: found.to_string(),
            });
        }
        for (id, field, kept, found) in &notes.annotation_conflicts {
            issues.push(IntegrityIssue::ConflictingAnnotation {
                enhancer_id: id.to_string(),
                field: field.to_string(),
                kept: kept.clone(),
                found: found.clone(),
            });
        }

        let negative = dataset.records().iter().filter(|r| r.score < 0.0).count();
        if negative > 0 {
            issues.push(IntegrityIssue::NegativeScores { count: negative });
        }
        let above_one = dataset.records().iter().filter(|r| r.score > 1.0).count();
        if above_one > 0 {
            issues.push(IntegrityIssue::ScoresAboveOne { count: above_one });
        }

        if !notes.metadata_only.is_empty() {
            issues.push(IntegrityIssue::MetadataWithoutAccessibility {
                count: notes.metadata_only.len(),
                examples: notes.metadata_only.iter().take(MAX_EXAMPLES).map(|id| id.to_string()).collect(),
            });
        }
        if !notes.placeholders.is_empty() {
            issues.push(IntegrityIssue::PlaceholderMetadata {
                count: notes.placeholders.len(),
                examples: notes.placeholders.iter().take(MAX_EXAMPLES).map(|id| id.to_string()).collect(),
            });
        }
        if notes.duplicates_removed > 0 {
            issues.push(IntegrityIssue::DuplicateRowsRemoved { count: notes.duplicates_removed });
        }
        if notes.skipped_metadata_rows > 0 {
            issues.push(IntegrityIssue::MetadataRowsWithoutId { count: notes.skipped_metadata_rows });
        }

        Self { issues }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn log(&self) {
        if self.is_clean() {
            info!("Data integrity check passed");
            return;
        }
        for issue in &self.issues {
            warn!(?issue, "Data integrity warning");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessibilityRow, CellTypeRegistry, JoinOptions, MetadataRow};

    fn row(chrom: &str, start: u64, score: f64) -> AccessibilityRow {
        AccessibilityRow {
            enhancer_id: "E1".into(),
            chrom: chrom.into(),
            start,
            end: start + 500,
            cell_type: "cell_type_1".into(),
            position: start + 10,
            score,
        }
    }

    #[test]
    fn test_flags_coordinates_and_score_range() {
        let dataset = Dataset::from_parts(
            vec![MetadataRow { cargo: Some("GFP".into()), ..MetadataRow::new("E1") }],
            vec![row("chr1", 100, 0.5), row("chr1", 200, -0.1), row("chr1", 100, 1.4)],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
        .unwrap();

        let report = IntegrityReport::check(&dataset);
        assert!(!report.is_clean());
        assert!(report.issues.contains(&IntegrityIssue::InconsistentCoordinates {
            enhancer_id: "E1".into(),
            kept: "chr1:100-600".into(),
            found: "chr1:200-700".into(),
        }));
        assert!(report.issues.contains(&IntegrityIssue::NegativeScores { count: 1 }));
        assert!(report.issues.contains(&IntegrityIssue::ScoresAboveOne { count: 1 }));
    }

    #[test]
    fn test_clean_dataset() {
        let dataset = Dataset::from_parts(
            vec![MetadataRow::new("E1")],
            vec![row("chr1", 100, 0.5)],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
        .unwrap();
        assert!(IntegrityReport::check(&dataset).is_clean());
    }
}
