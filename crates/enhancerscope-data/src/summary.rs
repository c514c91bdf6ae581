//! Whole-dataset summary figures shown on the overview panel.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::Dataset;

/// Descriptive statistics of a set of scores. Standard deviation is the
/// population value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

impl ScoreStats {
    /// `None` for an empty input.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median: quantile_sorted(&sorted, 0.5),
            std: variance.sqrt(),
        })
    }
}

/// Linearly interpolated quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total_enhancers: usize,
    pub total_cell_types: usize,
    pub total_records: usize,
    pub scores: Option<ScoreStats>,
    pub mean_enhancer_length: f64,
    pub median_enhancer_length: f64,
    pub total_genomic_span: u64,
    pub most_common_cell_type: Option<String>,
    pub least_common_cell_type: Option<String>,
    pub chromosomes: usize,
    pub most_common_chromosome: Option<String>,
    pub loaded_at: String,
}

impl DatasetSummary {
    pub fn compute(dataset: &Dataset) -> Self {
        let scores = ScoreStats::from_values(dataset.records().iter().map(|r| r.score));

        let lengths: Vec<f64> = dataset.enhancers().map(|e| e.interval.len() as f64).collect();
        let length_stats = ScoreStats::from_values(lengths.iter().copied());
        let total_genomic_span = dataset.enhancers().map(|e| e.interval.len()).sum();

        let mut per_cell_type: BTreeMap<_, usize> = BTreeMap::new();
        for record in dataset.records() {
            *per_cell_type.entry(record.cell_type).or_default() += 1;
        }
        // Ties resolve to the lowest ordinal.
        let most_common = per_cell_type
            .iter()
            .fold(None, |best: Option<(_, usize)>, (o, n)| match best {
                Some((_, b)) if b >= *n => best,
                _ => Some((*o, *n)),
            })
            .map(|(o, _)| dataset.cell_type_name(o));
        let least_common = per_cell_type
            .iter()
            .fold(None, |best: Option<(_, usize)>, (o, n)| match best {
                Some((_, b)) if b <= *n => best,
                _ => Some((*o, *n)),
            })
            .map(|(o, _)| dataset.cell_type_name(o));

        let mut per_chrom: BTreeMap<&str, usize> = BTreeMap::new();
        for enhancer in dataset.enhancers() {
            *per_chrom.entry(enhancer.interval.chrom.as_str()).or_default() += 1;
        }
        let most_common_chromosome = per_chrom
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (c, n)| match best {
                Some((_, b)) if b >= *n => best,
                _ => Some((*c, *n)),
            })
            .map(|(c, _)| c.to_string());

        Self {
            total_enhancers: dataset.enhancer_count(),
            total_cell_types: dataset.cell_types().count(),
            total_records: dataset.records().len(),
            scores,
            mean_enhancer_length: length_stats.map(|s| s.mean).unwrap_or_default(),
            median_enhancer_length: length_stats.map(|s| s.median).unwrap_or_default(),
            total_genomic_span,
            most_common_cell_type: most_common,
            least_common_cell_type: least_common,
            chromosomes: per_chrom.len(),
            most_common_chromosome,
            loaded_at: dataset.loaded_at().to_rfc3339(),
        }
    }
}
