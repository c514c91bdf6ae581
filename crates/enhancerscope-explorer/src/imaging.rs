//! Imaging link resolution.
//!
//! Picks the imaging to show for an enhancer/experiment from the experiment
//! metadata. Modalities are tried in [`ImagingPolicy`] order (lightsheet
//! before EPI by default); the first with at least one usable link wins.
//! The result is either a set of links or an explicit `Unavailable`.

use enhancerscope_common::config::ImagingConfig;
use enhancerscope_common::entities::{ExperimentKind, ExperimentMetadata, GenomeCopies};
use enhancerscope_data::Dataset;
use serde::Serialize;
use tracing::debug;

/// Preference order of imaging modalities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingPolicy {
    priority: Vec<ExperimentKind>,
}

impl ImagingPolicy {
    pub fn new(priority: Vec<ExperimentKind>) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> &[ExperimentKind] {
        &self.priority
    }
}

impl Default for ImagingPolicy {
    fn default() -> Self {
        Self::from(&ImagingConfig::default())
    }
}

impl From<&ImagingConfig> for ImagingPolicy {
    fn from(config: &ImagingConfig) -> Self {
        Self::new(config.priority.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    ContactSheet,
    Viewer3d,
    CoronalMip,
    SagittalMip,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::ContactSheet => "Contact Sheet",
            AssetKind::Viewer3d => "3D Viewer",
            AssetKind::CoronalMip => "Coronal MIP",
            AssetKind::SagittalMip => "Sagittal MIP",
        }
    }

    /// Rendered in an iframe rather than an `<img>`.
    pub fn is_embedded_viewer(self) -> bool {
        matches!(self, AssetKind::Viewer3d)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagingAsset {
    pub kind: AssetKind,
    pub label: &'static str,
    pub url: String,
}

impl ImagingAsset {
    fn new(kind: AssetKind, url: &str) -> Self {
        Self { kind, label: kind.label(), url: url.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImagingLinks {
    Available {
        enhancer_id: String,
        experiment: String,
        modality: ExperimentKind,
        assets: Vec<ImagingAsset>,
    },
    Unavailable {
        enhancer_id: String,
        reason: String,
    },
}

impl ImagingLinks {
    pub fn is_available(&self) -> bool {
        matches!(self, ImagingLinks::Available { .. })
    }

    pub fn modality(&self) -> Option<ExperimentKind> {
        match self {
            ImagingLinks::Available { modality, .. } => Some(*modality),
            ImagingLinks::Unavailable { .. } => None,
        }
    }

    pub fn assets(&self) -> &[ImagingAsset] {
        match self {
            ImagingLinks::Available { assets, .. } => assets,
            ImagingLinks::Unavailable { .. } => &[],
        }
    }
}

/// Assets an experiment row offers for a modality, in display order.
fn assets_for(kind: ExperimentKind, experiment: &ExperimentMetadata) -> Vec<ImagingAsset> {
    let a = &experiment.assets;
    let mut assets = Vec::new();
    match kind {
        ExperimentKind::Lightsheet => {
            if let Some(url) = a.viewer() {
                assets.push(ImagingAsset::new(AssetKind::Viewer3d, url));
            }
            if let Some(url) = &a.coronal_mip {
                assets.push(ImagingAsset::new(AssetKind::CoronalMip, url));
            }
            if let Some(url) = &a.sagittal_mip {
                assets.push(ImagingAsset::new(AssetKind::SagittalMip, url));
            }
        }
        ExperimentKind::Epi | ExperimentKind::Stpt | ExperimentKind::Other => {
            if let Some(url) = a.contact_sheet() {
                assets.push(ImagingAsset::new(AssetKind::ContactSheet, url));
            }
            if let Some(url) = a.viewer() {
                assets.push(ImagingAsset::new(AssetKind::Viewer3d, url));
            }
        }
    }
    assets
}

/// Deterministic lookup over the dataset's experiment metadata.
#[derive(Debug, Clone)]
pub struct ImagingResolver<'a> {
    dataset: &'a Dataset,
    policy: ImagingPolicy,
}

impl<'a> ImagingResolver<'a> {
    pub fn new(dataset: &'a Dataset, policy: ImagingPolicy) -> Self {
        Self { dataset, policy }
    }

    /// Imaging for an enhancer, narrowed to an experiment label when given.
    pub fn resolve(&self, enhancer_id: &str, experiment: Option<&str>) -> ImagingLinks {
        self.resolve_with_copies(enhancer_id, experiment, None)
    }

    /// Like [`ImagingResolver::resolve`], also narrowing on delivered genome
    /// copies. When nothing matches the narrowing, every experiment row of the
    /// enhancer is considered instead.
    pub fn resolve_with_copies(
        &self,
        enhancer_id: &str,
        experiment: Option<&str>,
        gc_delivered: Option<&GenomeCopies>,
    ) -> ImagingLinks {
        let rows = self.dataset.experiments_for(enhancer_id);
        if rows.is_empty() {
            return ImagingLinks::Unavailable {
                enhancer_id: enhancer_id.to_string(),
                reason: format!("No experiment metadata for {enhancer_id}"),
            };
        }

        let narrowed: Vec<&ExperimentMetadata> = rows
            .iter()
            .filter(|e| experiment.map_or(true, |x| e.experiment == x))
            .filter(|e| gc_delivered.map_or(true, |gc| e.gc_delivered.as_ref() == Some(gc)))
            .collect();
        let candidates: Vec<&ExperimentMetadata> = if narrowed.is_empty() {
            debug!("No experiment rows match the selection for {}, using all", enhancer_id);
            rows.iter().collect()
        } else {
            narrowed
        };

        for &kind in self.policy.priority() {
            for row in candidates.iter().filter(|e| e.kind == kind) {
                let assets = assets_for(kind, row);
                if !assets.is_empty() {
                    return ImagingLinks::Available {
                        enhancer_id: enhancer_id.to_string(),
                        experiment: row.experiment.clone(),
                        modality: kind,
                        assets,
                    };
                }
            }
        }

        let tried: Vec<&str> = self.policy.priority().iter().map(|k| k.as_str()).collect();
        ImagingLinks::Unavailable {
            enhancer_id: enhancer_id.to_string(),
            reason: format!("No {} imaging available for {}", tried.join(" or "), enhancer_id),
        }
    }
}
