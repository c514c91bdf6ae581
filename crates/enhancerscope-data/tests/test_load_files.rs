//! End-to-end loading from a data directory laid out like production.

use enhancerscope_data::{
    DatasetSource, DatasetSummary, FileDatasetSource, IntegrityIssue, IntegrityReport, LoadError,
};
use enhancerscope_test_utils::{reference_fixture, FixtureBuilder};
use pretty_assertions::assert_eq;

#[test]
fn test_loads_chunked_directory() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = reference_fixture();
    let config = fixture.write_to(dir.path(), 7);

    let dataset = FileDatasetSource::new(config).load().unwrap();
    assert_eq!(dataset.enhancer_count(), 3);
    assert_eq!(dataset.records().len(), fixture.accessibility_rows().len());

    let e1: Vec<u8> = dataset.cell_types_for("E1").iter().map(|o| o.get()).collect();
    assert_eq!(e1, vec![1, 3, 5]);
    assert_eq!(dataset.experiments_for("E1").len(), 2);

    let lightsheet = dataset
        .experiments_for("E1")
        .iter()
        .find(|e| e.experiment == "Lightsheet")
        .unwrap();
    assert_eq!(lightsheet.assets.coronal_mip.as_deref(), Some("https://img.example.org/E1/coronal_mip.png"));
    assert_eq!(lightsheet.gc_delivered.as_ref().and_then(|g| g.value()), Some(5e9));

    let summary = DatasetSummary::compute(&dataset);
    assert_eq!(summary.total_enhancers, 3);
    assert_eq!(summary.total_cell_types, 5);
    assert_eq!(summary.chromosomes, 2);
    assert_eq!(summary.most_common_chromosome.as_deref(), Some("chr1"));
    assert_eq!(summary.most_common_cell_type.as_deref(), Some("cell_type_3"));
    assert_eq!(summary.total_genomic_span, 500 + 800 + 400);

    assert!(IntegrityReport::check(&dataset).is_clean());
}

#[test]
fn test_duplicates_across_chunks_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = FixtureBuilder::new()
        .enhancer("E1", "chr1", 100, 400)
        .experiment("E1", "GFP", "Gad2", "EPI", None)
        .record("E1", "cell_type_1", 110, 0.2)
        .record("E1", "cell_type_1", 120, 0.3)
        .record("E1", "cell_type_1", 110, 0.2);
    let config = fixture.write_to(dir.path(), 2);

    let dataset = FileDatasetSource::new(config).load().unwrap();
    assert_eq!(dataset.records().len(), 2);
    assert!(IntegrityReport::check(&dataset)
        .issues
        .contains(&IntegrityIssue::DuplicateRowsRemoved { count: 1 }));
}

#[test]
fn test_unresolved_enhancer_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = FixtureBuilder::new()
        .enhancer("E1", "chr1", 100, 400)
        .enhancer("E2", "chr1", 500, 900)
        .experiment("E1", "GFP", "Gad2", "EPI", None)
        .record("E1", "cell_type_1", 110, 0.2)
        .record("E2", "cell_type_1", 510, 0.4);
    let mut config = fixture.write_to(dir.path(), 10);

    match FileDatasetSource::new(config.clone()).load() {
        Err(LoadError::UnresolvedEnhancer(id)) => assert_eq!(id, "E2"),
        other => panic!("expected UnresolvedEnhancer, got {other:?}"),
    }

    config.allow_missing_metadata = true;
    let dataset = FileDatasetSource::new(config).load().unwrap();
    assert_eq!(dataset.enhancer_count(), 2);
    assert_eq!(dataset.notes().placeholders.len(), 1);
}

#[test]
fn test_unresolved_cell_type_aborts_load() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = FixtureBuilder::new()
        .enhancer("E1", "chr1", 100, 400)
        .experiment("E1", "GFP", "Gad2", "EPI", None)
        .record("E1", "Astrocytes", 110, 0.2);
    let config = fixture.write_to(dir.path(), 10);

    assert!(matches!(
        FileDatasetSource::new(config).load(),
        Err(LoadError::UnresolvedCellType(label)) if label == "Astrocytes"
    ));
}

#[test]
fn test_missing_metadata_file() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = reference_fixture();
    let config = fixture.write_to(dir.path(), 100);
    std::fs::remove_file(&config.metadata_file).unwrap();

    assert!(matches!(
        FileDatasetSource::new(config).load(),
        Err(LoadError::MissingFile(_))
    ));
}
