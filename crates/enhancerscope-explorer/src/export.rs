//! Delimited export of filtered rows.
//!
//! The export carries the on-disk accessibility columns, one row per
//! record, with the canonical enhancer coordinates and the cell type's
//! display name. Reading it back and rejoining against the dataset yields
//! the same records.

use enhancerscope_common::config::ExportFormat;
use enhancerscope_common::entities::AccessibilityRecord;
use enhancerscope_data::{AccessibilityRow, Dataset};
use tracing::debug;

use crate::error::ExportError;
use crate::filter::FilteredRows;
use crate::selection::Selections;

/// Rows of a filtered view in export shape, in view order.
pub fn export_rows(rows: &FilteredRows<'_>) -> Vec<AccessibilityRow> {
    rows.iter().filter_map(|record| export_row(rows.dataset(), record)).collect()
}

/// The first `limit` export rows, for display.
pub fn preview_rows(rows: &FilteredRows<'_>, limit: usize) -> Vec<AccessibilityRow> {
    rows.iter()
        .filter_map(|record| export_row(rows.dataset(), record))
        .take(limit)
        .collect()
}

fn export_row(dataset: &Dataset, record: &AccessibilityRecord) -> Option<AccessibilityRow> {
    let enhancer = dataset.enhancer(record.enhancer_id.as_str())?;
    Some(AccessibilityRow {
        enhancer_id: record.enhancer_id.to_string(),
        chrom: enhancer.interval.chrom.clone(),
        start: enhancer.interval.start,
        end: enhancer.interval.end,
        cell_type: dataset.cell_type_name(record.cell_type),
        position: record.position,
        score: record.score,
    })
}

/// Serialize the filtered rows with a header line. An empty selection
/// produces the header alone.
pub fn to_delimited(rows: &FilteredRows<'_>, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(enhancerscope_data::accessibility::ACCESSIBILITY_COLUMNS)?;
    for row in export_rows(rows) {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::Buffer(e.to_string()))?;
    debug!("Exported {} rows ({} bytes) as {:?}", rows.len(), bytes.len(), format);
    Ok(bytes)
}

/// Parse an export produced by [`to_delimited`].
pub fn parse_delimited(bytes: &[u8], format: ExportFormat) -> Result<Vec<AccessibilityRow>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .from_reader(bytes);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// `{enhancer}_accessibility_data.csv` when one enhancer is selected,
/// `filtered_accessibility_data.csv` otherwise. Characters outside
/// `[A-Za-z0-9._-]` in the id become `_`.
pub fn export_file_name(selections: &Selections, format: ExportFormat) -> String {
    let stem = selections
        .enhancer
        .as_ref()
        .map(|id| file_safe(id.as_str()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "filtered".to_string());
    format!("{}_accessibility_data.{}", stem, format.extension())
}

fn file_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterEngine;
    use enhancerscope_data::{CellTypeRegistry, JoinOptions};
    use enhancerscope_test_utils::reference_fixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_and_column_order() {
        let dataset = reference_fixture().build();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_enhancer("E3"));
        let bytes = to_delimited(&rows, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("enhancer_id,chr,start,end,cell_type,position_index,accessibility_score")
        );
        assert_eq!(lines.next(), Some("E3,chr1,5000,5400,cell_type_4,5010,0.1"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_empty_selection_writes_header_only() {
        let dataset = reference_fixture().build();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_cargo("none"));
        let bytes = to_delimited(&rows, ExportFormat::Tsv).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "enhancer_id\tchr\tstart\tend\tcell_type\tposition_index\taccessibility_score\n"
        );
    }

    #[test]
    fn test_round_trip_rejoins_same_records() {
        let dataset = reference_fixture().build();
        let s = Selections::all().with_cargo("GFP");
        let rows = FilterEngine::new(&dataset).apply_filters(&s);

        for format in [ExportFormat::Csv, ExportFormat::Tsv] {
            let bytes = to_delimited(&rows, format).unwrap();
            let parsed = parse_delimited(&bytes, format).unwrap();
            assert_eq!(parsed, export_rows(&rows));
            assert_eq!(dataset.rejoin(&parsed).unwrap(), rows.indices());
        }
    }

    #[test]
    fn test_preview_is_a_prefix_of_the_export() {
        let dataset = reference_fixture().build();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_cargo("GFP"));
        let all = export_rows(&rows);
        assert_eq!(preview_rows(&rows, 4), all[..4].to_vec());
        assert_eq!(preview_rows(&rows, 1000), all);
        assert!(preview_rows(&rows, 0).is_empty());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            export_file_name(&Selections::all().with_enhancer("E1"), ExportFormat::Csv),
            "E1_accessibility_data.csv"
        );
        assert_eq!(export_file_name(&Selections::all(), ExportFormat::Tsv), "filtered_accessibility_data.tsv");
    }

    #[test]
    fn test_file_name_replaces_header_unsafe_characters() {
        assert_eq!(
            export_file_name(&Selections::all().with_enhancer("a\"b/c d"), ExportFormat::Csv),
            "a_b_c_d_accessibility_data.csv"
        );
        assert_eq!(
            export_file_name(&Selections::all().with_enhancer("hs1.2-x_y"), ExportFormat::Csv),
            "hs1.2-x_y_accessibility_data.csv"
        );
    }

    #[test]
    fn test_round_trip_keeps_repeated_rows() {
        let fixture = reference_fixture()
            .record("E1", "cell_type_1", 1010, 0.4)
            .record("E1", "cell_type_1", 1010, 0.4);
        let dataset = Dataset::from_parts(
            fixture.metadata_rows().to_vec(),
            fixture.accessibility_rows().to_vec(),
            CellTypeRegistry::new(),
            JoinOptions { allow_missing_metadata: false, deduplicate: false },
        )
        .unwrap();
        let rows = FilterEngine::new(&dataset).apply_filters(&Selections::all().with_enhancer("E1"));

        let bytes = to_delimited(&rows, ExportFormat::Csv).unwrap();
        let parsed = parse_delimited(&bytes, ExportFormat::Csv).unwrap();
        let indices = dataset.rejoin(&parsed).unwrap();
        assert_eq!(indices, rows.indices());
        let distinct: std::collections::BTreeSet<usize> = indices.iter().copied().collect();
        assert_eq!(distinct.len(), indices.len());
    }
}
