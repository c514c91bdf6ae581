//! The joined, read-only dataset snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Range;

use chrono::{DateTime, Utc};
use enhancerscope_common::entities::{
    AccessibilityRecord, CellType, CellTypeOrdinal, Enhancer, EnhancerId, ExperimentKind,
    ExperimentMetadata, GenomeCopies, GenomicInterval, ImagingAssets, NOT_SPECIFIED,
};
use tracing::{info, warn};

use crate::accessibility::AccessibilityRow;
use crate::cell_types::CellTypeRegistry;
use crate::error::{LoadError, Result};
use crate::metadata::MetadataRow;

#[derive(Debug, Clone, Copy)]
pub struct JoinOptions {
    /// Synthesize placeholder metadata instead of failing on enhancers that
    /// only appear in the accessibility tables.
    pub allow_missing_metadata: bool,
    pub deduplicate: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self { allow_missing_metadata: false, deduplicate: true }
    }
}

/// What the join noticed but did not reject. Feeds the integrity report.
#[derive(Debug, Clone, Default)]
pub struct LoadNotes {
    pub duplicates_removed: usize,
    pub skipped_metadata_rows: usize,
    /// Metadata enhancers without accessibility data, excluded from the snapshot.
    pub metadata_only: Vec<EnhancerId>,
    /// Enhancers given placeholder metadata.
    pub placeholders: Vec<EnhancerId>,
    /// Rows whose coordinates disagree with the enhancer's first row.
    pub coordinate_conflicts: Vec<(EnhancerId, GenomicInterval)>,
    /// (enhancer, field, kept value, conflicting value)
    pub annotation_conflicts: Vec<(EnhancerId, &'static str, String, String)>,
}

/// Immutable snapshot of every enhancer, experiment and accessibility record.
///
/// Records are sorted by (enhancer, cell type ordinal, position) and
/// indexed per enhancer; every record resolves to a known enhancer and
/// cell type.
#[derive(Debug, Clone)]
pub struct Dataset {
    enhancers: BTreeMap<EnhancerId, Enhancer>,
    experiments: BTreeMap<EnhancerId, Vec<ExperimentMetadata>>,
    cell_types: CellTypeRegistry,
    records: Vec<AccessibilityRecord>,
    ranges: HashMap<EnhancerId, Range<usize>>,
    cell_type_sets: HashMap<EnhancerId, BTreeSet<CellTypeOrdinal>>,
    notes: LoadNotes,
    loaded_at: DateTime<Utc>,
}

struct Annotation {
    cargo: String,
    gene: String,
}

impl Dataset {
    /// Join metadata rows and accessibility rows.
    ///
    /// Fails when an accessibility row names an enhancer with no metadata
    /// (unless placeholders are allowed) or a cell type the registry cannot
    /// resolve.
    pub fn from_parts(
        metadata: Vec<MetadataRow>,
        rows: Vec<AccessibilityRow>,
        mut cell_types: CellTypeRegistry,
        options: JoinOptions,
    ) -> Result<Self> {
        let mut notes = LoadNotes::default();

        // Enhancer annotations and experiments from metadata.
        let mut annotations: BTreeMap<EnhancerId, Annotation> = BTreeMap::new();
        let mut experiments: BTreeMap<EnhancerId, Vec<ExperimentMetadata>> = BTreeMap::new();
        for row in metadata {
            let id = EnhancerId::new(row.enhancer_id.as_str());
            let cargo = row.cargo.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());
            let gene = row.proximal_gene.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());
            match annotations.get(&id) {
                Some(existing) => {
                    if existing.cargo != cargo {
                        notes.annotation_conflicts.push((id.clone(), "cargo", existing.cargo.clone(), cargo));
                    }
                    if existing.gene != gene {
                        notes.annotation_conflicts.push((id.clone(), "proximal_gene", existing.gene.clone(), gene));
                    }
                }
                None => {
                    annotations.insert(id.clone(), Annotation { cargo, gene });
                }
            }
            experiments.entry(id.clone()).or_default().push(experiment_from_row(id, row));
        }

        // Accessibility records.
        let total_rows = rows.len();
        let mut seen: HashSet<(String, String, u64, u64, String, u64, u64)> = HashSet::new();
        let mut intervals: BTreeMap<EnhancerId, GenomicInterval> = BTreeMap::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            if options.deduplicate {
                let key = (
                    row.enhancer_id.clone(),
                    row.chrom.clone(),
                    row.start,
                    row.end,
                    row.cell_type.clone(),
                    row.position,
                    row.score.to_bits(),
                );
                if !seen.insert(key) {
                    notes.duplicates_removed += 1;
                    continue;
                }
            }

            let id = EnhancerId::new(row.enhancer_id.as_str());
            if !annotations.contains_key(&id) {
                if !options.allow_missing_metadata {
                    return Err(LoadError::UnresolvedEnhancer(row.enhancer_id));
                }
                annotations.insert(
                    id.clone(),
                    Annotation { cargo: NOT_SPECIFIED.to_string(), gene: NOT_SPECIFIED.to_string() },
                );
                experiments.insert(id.clone(), vec![placeholder_experiment(id.clone())]);
                notes.placeholders.push(id.clone());
            }

            let cell_type = cell_types.resolve(&row.cell_type)?;
            let interval = GenomicInterval::new(row.chrom.as_str(), row.start, row.end).ok_or_else(|| {
                LoadError::InvalidInterval { enhancer_id: row.enhancer_id.clone(), start: row.start, end: row.end }
            })?;
            match intervals.get(&id) {
                Some(first) if *first != interval => {
                    notes.coordinate_conflicts.push((id.clone(), interval));
                }
                Some(_) => {}
                None => {
                    intervals.insert(id.clone(), interval);
                }
            }

            records.push(AccessibilityRecord {
                enhancer_id: id,
                cell_type,
                position: row.position,
                score: row.score,
            });
        }

        if records.is_empty() {
            return Err(LoadError::Empty);
        }
        if notes.duplicates_removed > 0 {
            info!("Removed {} duplicate accessibility rows of {}", notes.duplicates_removed, total_rows);
        }
        if !notes.placeholders.is_empty() {
            warn!(
                "{} enhancers have accessibility data but no metadata; using placeholders",
                notes.placeholders.len()
            );
        }

        // Enhancers are the ones with accessibility data.
        let mut enhancers = BTreeMap::new();
        for (id, interval) in intervals {
            let Some(annotation) = annotations.remove(&id) else {
                continue;
            };
            enhancers.insert(
                id.clone(),
                Enhancer { id, interval, proximal_gene: annotation.gene, cargo: annotation.cargo },
            );
        }
        notes.metadata_only = annotations.into_keys().collect();
        if !notes.metadata_only.is_empty() {
            info!(
                "{} metadata enhancers have no accessibility data and are excluded",
                notes.metadata_only.len()
            );
        }
        experiments.retain(|id, _| enhancers.contains_key(id));
        for rows in experiments.values_mut() {
            rows.sort_by(|a, b| a.experiment.cmp(&b.experiment));
        }

        records.sort_by(|a, b| {
            a.enhancer_id
                .cmp(&b.enhancer_id)
                .then(a.cell_type.cmp(&b.cell_type))
                .then(a.position.cmp(&b.position))
                .then(a.score.total_cmp(&b.score))
        });
        let ranges = index_ranges(&records);
        let cell_type_sets: HashMap<EnhancerId, BTreeSet<CellTypeOrdinal>> = ranges
            .iter()
            .map(|(id, range)| (id.clone(), records[range.clone()].iter().map(|r| r.cell_type).collect()))
            .collect();
        let used: BTreeSet<CellTypeOrdinal> = cell_type_sets.values().flatten().copied().collect();
        cell_types.retain(|o| used.contains(&o));

        Ok(Self {
            enhancers,
            experiments,
            cell_types,
            records,
            ranges,
            cell_type_sets,
            notes,
            loaded_at: Utc::now(),
        })
    }

    pub(crate) fn with_skipped_metadata_rows(mut self, skipped: usize) -> Self {
        self.notes.skipped_metadata_rows = skipped;
        self
    }

    // ── Reference tables ─────────────────────────────────────────────────

    /// Enhancers in identifier order.
    pub fn enhancers(&self) -> impl Iterator<Item = &Enhancer> {
        self.enhancers.values()
    }

    pub fn enhancer(&self, id: &str) -> Option<&Enhancer> {
        self.enhancers.get(id)
    }

    pub fn enhancer_count(&self) -> usize {
        self.enhancers.len()
    }

    /// Experiment rows of an enhancer, sorted by experiment label.
    pub fn experiments_for(&self, id: &str) -> &[ExperimentMetadata] {
        self.experiments.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn experiments(&self) -> impl Iterator<Item = &ExperimentMetadata> {
        self.experiments.values().flatten()
    }

    /// Cell types present in the records, in ordinal order.
    pub fn cell_types(&self) -> impl Iterator<Item = &CellType> {
        self.cell_types.iter()
    }

    pub fn cell_type(&self, ordinal: CellTypeOrdinal) -> Option<&CellType> {
        self.cell_types.get(ordinal)
    }

    pub fn cell_type_name(&self, ordinal: CellTypeOrdinal) -> String {
        self.cell_types.name(ordinal)
    }

    /// Resolve a cell type label or bare ordinal.
    pub fn resolve_cell_type(&self, label: &str) -> Option<CellTypeOrdinal> {
        self.cell_types.lookup(label)
    }

    // ── Records ──────────────────────────────────────────────────────────

    pub fn records(&self) -> &[AccessibilityRecord] {
        &self.records
    }

    /// Index range into [`Dataset::records`] for one enhancer.
    pub fn record_range(&self, id: &str) -> Range<usize> {
        self.ranges.get(id).cloned().unwrap_or(0..0)
    }

    pub fn records_for(&self, id: &str) -> &[AccessibilityRecord] {
        &self.records[self.record_range(id)]
    }

    /// Distinct cell types measured for an enhancer.
    pub fn cell_types_for(&self, id: &str) -> &BTreeSet<CellTypeOrdinal> {
        static NONE: BTreeSet<CellTypeOrdinal> = BTreeSet::new();
        self.cell_type_sets.get(id).unwrap_or(&NONE)
    }

    pub fn notes(&self) -> &LoadNotes {
        &self.notes
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Map exported rows back to record indices.
    ///
    /// Each row must name a loaded enhancer with its canonical coordinates, a
    /// known cell type, and a (position, score) pair present in the records.
    /// The nth repeat of an identical row maps to the nth matching record, so
    /// duplicates kept at load time come back as distinct indices.
    pub fn rejoin(&self, rows: &[AccessibilityRow]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(rows.len());
        let mut taken: HashSet<usize> = HashSet::with_capacity(rows.len());
        for row in rows {
            let unmatched = || LoadError::UnmatchedRecord {
                enhancer_id: row.enhancer_id.clone(),
                cell_type: row.cell_type.clone(),
                position: row.position,
            };
            let enhancer = self
                .enhancer(&row.enhancer_id)
                .ok_or_else(|| LoadError::UnresolvedEnhancer(row.enhancer_id.clone()))?;
            let interval = &enhancer.interval;
            if interval.chrom != row.chrom || interval.start != row.start || interval.end != row.end {
                return Err(unmatched());
            }
            let cell_type = self
                .resolve_cell_type(&row.cell_type)
                .ok_or_else(|| LoadError::UnresolvedCellType(row.cell_type.clone()))?;

            let range = self.record_range(&row.enhancer_id);
            let slice = &self.records[range.clone()];
            let first = slice.partition_point(|r| (r.cell_type, r.position) < (cell_type, row.position));
            let index = slice[first..]
                .iter()
                .take_while(|r| r.cell_type == cell_type && r.position == row.position)
                .enumerate()
                .filter(|(_, r)| r.score.to_bits() == row.score.to_bits())
                .map(|(offset, _)| range.start + first + offset)
                .find(|index| !taken.contains(index))
                .ok_or_else(unmatched)?;
            taken.insert(index);
            indices.push(index);
        }
        Ok(indices)
    }
}

fn experiment_from_row(enhancer_id: EnhancerId, row: MetadataRow) -> ExperimentMetadata {
    let experiment = row.experiment.unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let assets = ImagingAssets {
        image_links: row.image_link.as_deref().map(ImagingAssets::split_links).unwrap_or_default(),
        neuroglancer_1: row.neuroglancer_1.as_deref().and_then(ImagingAssets::link),
        neuroglancer_3: row.neuroglancer_3.as_deref().and_then(ImagingAssets::link),
        viewer_link: row.viewer_link.as_deref().and_then(ImagingAssets::link),
        coronal_mip: row.coronal_mip.as_deref().and_then(ImagingAssets::link),
        sagittal_mip: row.sagittal_mip.as_deref().and_then(ImagingAssets::link),
    };
    ExperimentMetadata {
        enhancer_id,
        kind: ExperimentKind::classify(&experiment),
        experiment,
        gc_delivered: row.gc_delivered.map(GenomeCopies::new),
        assets,
    }
}

fn placeholder_experiment(enhancer_id: EnhancerId) -> ExperimentMetadata {
    ExperimentMetadata {
        enhancer_id,
        experiment: NOT_SPECIFIED.to_string(),
        kind: ExperimentKind::Other,
        gc_delivered: None,
        assets: ImagingAssets::default(),
    }
}

/// Contiguous record ranges per enhancer. Records must already be sorted.
fn index_ranges(records: &[AccessibilityRecord]) -> HashMap<EnhancerId, Range<usize>> {
    let mut ranges: HashMap<EnhancerId, Range<usize>> = HashMap::new();
    let mut start = 0;
    for i in 1..=records.len() {
        if i == records.len() || records[i].enhancer_id != records[start].enhancer_id {
            ranges.insert(records[start].enhancer_id.clone(), start..i);
            start = i;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn meta(id: &str, cargo: &str, experiment: &str) -> MetadataRow {
        MetadataRow {
            cargo: Some(cargo.into()),
            experiment: Some(experiment.into()),
            proximal_gene: Some("Gad2".into()),
            ..MetadataRow::new(id)
        }
    }

    fn row(id: &str, cell_type: &str, position: u64, score: f64) -> AccessibilityRow {
        AccessibilityRow {
            enhancer_id: id.into(),
            chrom: "chr1".into(),
            start: 1000,
            end: 2000,
            cell_type: cell_type.into(),
            position,
            score,
        }
    }

    #[test]
    fn test_join_sorts_and_indexes_records() {
        let dataset = Dataset::from_parts(
            vec![meta("E2", "GFP", "EPI"), meta("E1", "GFP", "EPI")],
            vec![
                row("E2", "cell_type_3", 1500, 0.3),
                row("E1", "cell_type_5", 1200, 0.5),
                row("E1", "cell_type_1", 1300, 0.1),
                row("E1", "cell_type_1", 1100, 0.2),
            ],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
        .unwrap();

        assert_eq!(dataset.enhancer_count(), 2);
        let e1: Vec<(u8, u64)> = dataset
            .records_for("E1")
            .iter()
            .map(|r| (r.cell_type.get(), r.position))
            .collect();
        assert_eq!(e1, vec![(1, 1100), (1, 1300), (5, 1200)]);
        assert_eq!(dataset.record_range("E2"), 3..4);
        assert_eq!(dataset.cell_types().count(), 3);
        assert_eq!(dataset.enhancer("E1").unwrap().interval.len(), 1000);
    }

    #[test]
    fn test_unresolved_enhancer_fails_without_placeholders() {
        let result = Dataset::from_parts(
            vec![meta("E1", "GFP", "EPI")],
            vec![row("E9", "cell_type_1", 1100, 0.2)],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        );
        assert!(matches!(result, Err(LoadError::UnresolvedEnhancer(id)) if id == "E9"));
    }

    #[test]
    fn test_placeholders_when_metadata_missing_is_allowed() {
        let dataset = Dataset::from_parts(
            vec![],
            vec![row("E9", "cell_type_1", 1100, 0.2)],
            CellTypeRegistry::new(),
            JoinOptions { allow_missing_metadata: true, deduplicate: true },
        )
        .unwrap();
        let enhancer = dataset.enhancer("E9").unwrap();
        assert_eq!(enhancer.cargo, NOT_SPECIFIED);
        assert_eq!(dataset.experiments_for("E9")[0].experiment, NOT_SPECIFIED);
        assert_eq!(dataset.notes().placeholders.len(), 1);
    }

    #[test]
    fn test_duplicates_removed_and_metadata_only_noted() {
        let dataset = Dataset::from_parts(
            vec![meta("E1", "GFP", "EPI"), meta("E1", "SYFP", "Lightsheet"), meta("E7", "GFP", "EPI")],
            vec![row("E1", "cell_type_1", 1100, 0.2), row("E1", "cell_type_1", 1100, 0.2)],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
        .unwrap();
        assert_eq!(dataset.records().len(), 1);
        assert_eq!(dataset.notes().duplicates_removed, 1);
        assert_eq!(dataset.notes().metadata_only, vec![EnhancerId::new("E7")]);
        assert_eq!(dataset.notes().annotation_conflicts.len(), 1);
        assert_eq!(dataset.experiments_for("E1").len(), 2);
        assert!(dataset.experiments_for("E7").is_empty());
    }

    #[test]
    fn test_rejoin_finds_records() {
        let dataset = Dataset::from_parts(
            vec![meta("E1", "GFP", "EPI")],
            vec![row("E1", "cell_type_1", 1100, 0.2), row("E1", "cell_type_5", 1100, 0.7)],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
        .unwrap();

        let indices = dataset
            .rejoin(&[row("E1", "cell_type_5", 1100, 0.7), row("E1", "cell_type_1", 1100, 0.2)])
            .unwrap();
        assert_eq!(indices, vec![1, 0]);

        assert!(matches!(
            dataset.rejoin(&[row("E1", "cell_type_5", 1100, 0.70001)]),
            Err(LoadError::UnmatchedRecord { .. })
        ));
        assert!(matches!(
            dataset.rejoin(&[row("E2", "cell_type_5", 1100, 0.7)]),
            Err(LoadError::UnresolvedEnhancer(_))
        ));
    }

    #[test]
    fn test_rejoin_keeps_repeated_rows_distinct() {
        let dataset = Dataset::from_parts(
            vec![meta("E1", "GFP", "EPI")],
            vec![row("E1", "cell_type_1", 1100, 0.2), row("E1", "cell_type_1", 1100, 0.2)],
            CellTypeRegistry::new(),
            JoinOptions { allow_missing_metadata: false, deduplicate: false },
        )
        .unwrap();
        assert_eq!(dataset.records().len(), 2);

        let repeated = row("E1", "cell_type_1", 1100, 0.2);
        let indices = dataset.rejoin(&[repeated.clone(), repeated.clone()]).unwrap();
        assert_eq!(indices, vec![0, 1]);

        assert!(matches!(
            dataset.rejoin(&[repeated.clone(), repeated.clone(), repeated]),
            Err(LoadError::UnmatchedRecord { .. })
        ));
    }

    #[test]
    fn test_empty_accessibility_is_an_error() {
        let result = Dataset::from_parts(
            vec![meta("E1", "GFP", "EPI")],
            vec![],
            CellTypeRegistry::new(),
            JoinOptions::default(),
        );
        assert!(matches!(result, Err(LoadError::Empty)));
    }
}
