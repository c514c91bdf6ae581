//! Enhancer catalog: one row per enhancer in the filtered view.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::filter::FilteredRows;
use crate::selection::Selections;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    pub enhancer_id: String,
    pub location: String,
    pub length: u64,
    pub cargo: String,
    pub proximal_gene: String,
    /// First experiment row compatible with the selections.
    pub experiment: String,
    pub gc_delivered: Option<String>,
    /// Distinct experiment labels recorded for the enhancer.
    pub experiment_count: usize,
    pub cell_type_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnhancerCatalog {
    pub rows: Vec<CatalogRow>,
    pub unique_cargos: usize,
    pub unique_experiments: usize,
    pub unique_genes: usize,
}

impl EnhancerCatalog {
    pub fn from_rows(rows: &FilteredRows<'_>, selections: &Selections) -> Self {
        let dataset = rows.dataset();
        let mut catalog = Vec::new();
        let mut cargos = BTreeSet::new();
        let mut experiments = BTreeSet::new();
        let mut genes = BTreeSet::new();

        for enhancer in rows.enhancers() {
            let id = enhancer.id.as_str();
            let in_view = rows.iter().filter(|r| r.enhancer_id.as_str() == id);
            let (record_count, cell_types) = in_view.fold((0, BTreeSet::new()), |(n, mut cts), r| {
                cts.insert(r.cell_type);
                (n + 1, cts)
            });

            let rows_for = dataset.experiments_for(id);
            let labels: BTreeSet<&str> = rows_for.iter().map(|e| e.experiment.as_str()).collect();
            let first = rows_for
                .iter()
                .find(|e| {
                    selections.experiment.as_ref().map_or(true, |x| *x == e.experiment)
                        && selections.gc_delivered.as_ref().map_or(true, |gc| e.gc_delivered.as_ref() == Some(gc))
                })
                .or_else(|| rows_for.first());

            cargos.insert(enhancer.cargo.as_str());
            genes.insert(enhancer.proximal_gene.as_str());
            experiments.extend(labels.iter().copied());

            catalog.push(CatalogRow {
                enhancer_id: id.to_string(),
                location: enhancer.interval.to_string(),
                length: enhancer.interval.len(),
                cargo: enhancer.cargo.clone(),
                proximal_gene: enhancer.proximal_gene.clone(),
                experiment: first.map(|e| e.experiment.clone()).unwrap_or_default(),
                gc_delivered: first.and_then(|e| e.gc_delivered.as_ref()).map(ToString::to_string),
                experiment_count: labels.len(),
                cell_type_count: cell_types.len(),
                record_count,
            });
        }

        Self {
            rows: catalog,
            unique_cargos: cargos.len(),
            unique_experiments: experiments.len(),
            unique_genes: genes.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
