//! Interdependent filters over the dataset snapshot.
//!
//! Predicates by level:
//! - enhancer, cargo, gene: properties of the enhancer
//! - experiment, gc delivered: must hold on the *same* experiment row
//! - cell type: property of each accessibility record
//!
//! The options for a dimension are computed with that dimension's own
//! selection removed, so the selected value always stays selectable.

use std::collections::BTreeSet;

use enhancerscope_common::entities::{AccessibilityRecord, CellTypeOrdinal, Enhancer, ExperimentMetadata};
use enhancerscope_data::Dataset;
use serde::Serialize;

use crate::selection::{Dimension, Selections};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellTypeOption {
    pub ordinal: u8,
    pub name: String,
}

/// Valid values per dimension. All lists are empty, and `empty` is set,
/// when the current selections match no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub enhancers: Vec<String>,
    pub cargos: Vec<String>,
    pub experiments: Vec<String>,
    pub genes: Vec<String>,
    pub gc_delivered: Vec<String>,
    pub cell_types: Vec<CellTypeOption>,
    pub empty: bool,
}

impl FilterOptions {
    /// Values of one dimension as display strings.
    pub fn values(&self, dimension: Dimension) -> Vec<String> {
        match dimension {
            Dimension::Enhancer => self.enhancers.clone(),
            Dimension::Cargo => self.cargos.clone(),
            Dimension::Experiment => self.experiments.clone(),
            Dimension::Gene => self.genes.clone(),
            Dimension::GcDelivered => self.gc_delivered.clone(),
            Dimension::CellType => self.cell_types.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// Records matching a selection, as indices into [`Dataset::records`] in
/// dataset order (enhancer, cell type ordinal, position).
#[derive(Debug, Clone)]
pub struct FilteredRows<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredRows<'a> {
    pub fn from_indices(dataset: &'a Dataset, mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { dataset, indices }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a AccessibilityRecord> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    /// Distinct enhancers, in identifier order.
    pub fn enhancers(&self) -> Vec<&'a Enhancer> {
        let ids: BTreeSet<&str> = self.iter().map(|r| r.enhancer_id.as_str()).collect();
        ids.into_iter().filter_map(|id| self.dataset.enhancer(id)).collect()
    }

    /// Distinct cell types, in ordinal order.
    pub fn cell_types(&self) -> BTreeSet<CellTypeOrdinal> {
        self.iter().map(|r| r.cell_type).collect()
    }
}

/// Filter engine over one dataset snapshot. Holds no other state.
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine<'a> {
    dataset: &'a Dataset,
}

impl<'a> FilterEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    fn enhancer_matches(enhancer: &Enhancer, s: &Selections) -> bool {
        s.enhancer.as_ref().map_or(true, |id| *id == enhancer.id)
            && s.cargo.as_ref().map_or(true, |c| *c == enhancer.cargo)
            && s.gene.as_ref().map_or(true, |g| *g == enhancer.proximal_gene)
    }

    fn experiment_matches(experiment: &ExperimentMetadata, s: &Selections) -> bool {
        s.experiment.as_ref().map_or(true, |e| *e == experiment.experiment)
            && s.gc_delivered
                .as_ref()
                .map_or(true, |gc| experiment.gc_delivered.as_ref() == Some(gc))
    }

    /// Experiment rows of an enhancer compatible with the selections.
    fn matching_experiments<'s>(
        &'s self,
        enhancer: &Enhancer,
        s: &'s Selections,
    ) -> impl Iterator<Item = &'a ExperimentMetadata> + 's {
        self.dataset
            .experiments_for(enhancer.id.as_str())
            .iter()
            .filter(move |e| Self::experiment_matches(e, s))
    }

    /// Enhancers with at least one row under the selections.
    fn surviving_enhancers<'s>(&'s self, s: &'s Selections) -> impl Iterator<Item = &'a Enhancer> + 's {
        self.dataset.enhancers().filter(move |enhancer| {
            Self::enhancer_matches(enhancer, s)
                && (s.experiment.is_none() && s.gc_delivered.is_none()
                    || self.matching_experiments(enhancer, s).next().is_some())
                && s.cell_type.map_or(true, |ct| {
                    self.dataset.cell_types_for(enhancer.id.as_str()).contains(&ct)
                })
        })
    }

    /// The conjunction of every active selection.
    pub fn apply_filters(&self, s: &Selections) -> FilteredRows<'a> {
        let records = self.dataset.records();
        let mut indices = Vec::new();
        for enhancer in self.surviving_enhancers(s) {
            let range = self.dataset.record_range(enhancer.id.as_str());
            match s.cell_type {
                Some(ct) => indices.extend(range.filter(|&i| records[i].cell_type == ct)),
                None => indices.extend(range),
            }
        }
        FilteredRows { dataset: self.dataset, indices }
    }

    /// Valid values for each dimension given the other selections.
    pub fn compute_options(&self, s: &Selections) -> FilterOptions {
        if self.surviving_enhancers(s).next().is_none() {
            return FilterOptions { empty: true, ..FilterOptions::default() };
        }

        let mut options = FilterOptions::default();
        for dimension in Dimension::ALL {
            let relaxed = s.without(dimension);
            let enhancers: Vec<&Enhancer> = self.surviving_enhancers(&relaxed).collect();
            match dimension {
                Dimension::Enhancer => {
                    options.enhancers = enhancers.iter().map(|e| e.id.to_string()).collect();
                }
                Dimension::Cargo => {
                    options.cargos = sorted_distinct(enhancers.iter().map(|e| e.cargo.clone()));
                }
                Dimension::Gene => {
                    options.genes = sorted_distinct(enhancers.iter().map(|e| e.proximal_gene.clone()));
                }
                Dimension::Experiment => {
                    options.experiments = sorted_distinct(
                        enhancers
                            .iter()
                            .flat_map(|e| self.matching_experiments(e, &relaxed))
                            .map(|e| e.experiment.clone()),
                    );
                }
                Dimension::GcDelivered => {
                    let mut gcs: Vec<_> = enhancers
                        .iter()
                        .flat_map(|e| self.matching_experiments(e, &relaxed))
                        .filter_map(|e| e.gc_delivered.clone())
                        .collect();
                    gcs.sort_by(|a, b| a.cmp_numeric(b));
                    gcs.dedup();
                    options.gc_delivered = gcs.iter().map(ToString::to_string).collect();
                }
                Dimension::CellType => {
                    let ordinals: BTreeSet<CellTypeOrdinal> = enhancers
                        .iter()
                        .flat_map(|e| self.dataset.cell_types_for(e.id.as_str()).iter().copied())
                        .collect();
                    options.cell_types = ordinals
                        .into_iter()
                        .map(|o| CellTypeOption { ordinal: o.get(), name: self.dataset.cell_type_name(o) })
                        .collect();
                }
            }
        }
        options
    }
}

fn sorted_distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}
