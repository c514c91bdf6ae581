//! Filter dimensions and the per-request selection state.

use std::fmt;

use enhancerscope_common::entities::{CellTypeOrdinal, EnhancerId, GenomeCopies};
use enhancerscope_data::Dataset;
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Enhancer,
    Cargo,
    Experiment,
    Gene,
    GcDelivered,
    CellType,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Enhancer,
        Dimension::Cargo,
        Dimension::Experiment,
        Dimension::Gene,
        Dimension::GcDelivered,
        Dimension::CellType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Enhancer => "enhancer",
            Dimension::Cargo => "cargo",
            Dimension::Experiment => "experiment",
            Dimension::Gene => "gene",
            Dimension::GcDelivered => "gc_delivered",
            Dimension::CellType => "cell_type",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Enhancer => "Enhancer",
            Dimension::Cargo => "Cargo",
            Dimension::Experiment => "Experiment",
            Dimension::Gene => "Proximal Gene",
            Dimension::GcDelivered => "GC Delivered",
            Dimension::CellType => "Cell Type",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selections as they arrive from a query string or JSON body. Empty and
/// `All` mean no selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSelections {
    pub enhancer: Option<String>,
    pub cargo: Option<String>,
    pub experiment: Option<String>,
    pub gene: Option<String>,
    pub gc_delivered: Option<String>,
    pub cell_type: Option<String>,
}

fn chosen(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// One optional value per dimension; `None` is "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Selections {
    pub enhancer: Option<EnhancerId>,
    pub cargo: Option<String>,
    pub experiment: Option<String>,
    pub gene: Option<String>,
    pub gc_delivered: Option<GenomeCopies>,
    pub cell_type: Option<CellTypeOrdinal>,
}

impl Selections {
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve raw input against the dataset. Cell types may be given as a
    /// label or a bare ordinal; other values are taken as-is and simply
    /// match nothing when unknown.
    pub fn resolve(raw: &RawSelections, dataset: &Dataset) -> Result<Self> {
        let cell_type = match chosen(&raw.cell_type) {
            Some(label) => Some(
                dataset
                    .resolve_cell_type(label)
                    .ok_or_else(|| ExplorerError::UnknownCellType(label.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            enhancer: chosen(&raw.enhancer).map(EnhancerId::from),
            cargo: chosen(&raw.cargo).map(str::to_string),
            experiment: chosen(&raw.experiment).map(str::to_string),
            gene: chosen(&raw.gene).map(str::to_string),
            gc_delivered: chosen(&raw.gc_delivered).map(GenomeCopies::new),
            cell_type,
        })
    }

    pub fn with_enhancer(mut self, id: &str) -> Self {
        self.enhancer = Some(EnhancerId::new(id));
        self
    }

    pub fn with_cargo(mut self, cargo: &str) -> Self {
        self.cargo = Some(cargo.to_string());
        self
    }

    pub fn with_experiment(mut self, experiment: &str) -> Self {
        self.experiment = Some(experiment.to_string());
        self
    }

    pub fn with_gene(mut self, gene: &str) -> Self {
        self.gene = Some(gene.to_string());
        self
    }

    pub fn with_gc_delivered(mut self, gc: &str) -> Self {
        self.gc_delivered = Some(GenomeCopies::new(gc));
        self
    }

    pub fn with_cell_type(mut self, ordinal: CellTypeOrdinal) -> Self {
        self.cell_type = Some(ordinal);
        self
    }

    /// The same selections with `dimension` reset to "All".
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut s = self.clone();
        match dimension {
            Dimension::Enhancer => s.enhancer = None,
            Dimension::Cargo => s.cargo = None,
            Dimension::Experiment => s.experiment = None,
            Dimension::Gene => s.gene = None,
            Dimension::GcDelivered => s.gc_delivered = None,
            Dimension::CellType => s.cell_type = None,
        }
        s
    }

    pub fn is_set(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Enhancer => self.enhancer.is_some(),
            Dimension::Cargo => self.cargo.is_some(),
            Dimension::Experiment => self.experiment.is_some(),
            Dimension::Gene => self.gene.is_some(),
            Dimension::GcDelivered => self.gc_delivered.is_some(),
            Dimension::CellType => self.cell_type.is_some(),
        }
    }

    /// Selected value as shown in option lists. Cell types use the
    /// dataset's display name.
    pub fn value(&self, dimension: Dimension, dataset: &Dataset) -> Option<String> {
        match dimension {
            Dimension::Enhancer => self.enhancer.as_ref().map(ToString::to_string),
            Dimension::Cargo => self.cargo.clone(),
            Dimension::Experiment => self.experiment.clone(),
            Dimension::Gene => self.gene.clone(),
            Dimension::GcDelivered => self.gc_delivered.as_ref().map(ToString::to_string),
            Dimension::CellType => self.cell_type.map(|o| dataset.cell_type_name(o)),
        }
    }

    pub fn to_raw(&self, dataset: &Dataset) -> RawSelections {
        RawSelections {
            enhancer: self.value(Dimension::Enhancer, dataset),
            cargo: self.cargo.clone(),
            experiment: self.experiment.clone(),
            gene: self.gene.clone(),
            gc_delivered: self.value(Dimension::GcDelivered, dataset),
            cell_type: self.value(Dimension::CellType, dataset),
        }
    }
}
