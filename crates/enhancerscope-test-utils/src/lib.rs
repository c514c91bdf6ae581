//! Shared fixtures for enhancerscope tests.
//!
//! [`FixtureBuilder`] assembles a small dataset either in memory or as files
//! in a temporary directory laid out like the production data directory.

use std::path::Path;

use enhancerscope_common::config::DataConfig;
use enhancerscope_data::{
    AccessibilityRow, CellTypeRegistry, Dataset, DatasetSource, JoinOptions, LoadError, MetadataRow,
};

/// Builder for enhancers, experiments and accessibility rows.
#[derive(Debug, Clone, Default)]
pub struct FixtureBuilder {
    metadata: Vec<MetadataRow>,
    rows: Vec<AccessibilityRow>,
    intervals: Vec<(String, String, u64, u64)>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enhancer's coordinates. Records added later use them.
    pub fn enhancer(mut self, id: &str, chrom: &str, start: u64, end: u64) -> Self {
        self.intervals.push((id.to_string(), chrom.to_string(), start, end));
        self
    }

    /// Add an experiment row for an enhancer.
    pub fn experiment(
        mut self,
        id: &str,
        cargo: &str,
        gene: &str,
        experiment: &str,
        gc_delivered: Option<&str>,
    ) -> Self {
        self.metadata.push(MetadataRow {
            cargo: Some(cargo.to_string()),
            proximal_gene: Some(gene.to_string()),
            experiment: Some(experiment.to_string()),
            gc_delivered: gc_delivered.map(str::to_string),
            ..MetadataRow::new(id)
        });
        self
    }

    /// Modify the last experiment row added, e.g. to attach imaging links.
    pub fn with_last_experiment(mut self, edit: impl FnOnce(&mut MetadataRow)) -> Self {
        if let Some(row) = self.metadata.last_mut() {
            edit(row);
        }
        self
    }

    /// Add one measurement. The enhancer must have been registered with
    /// [`FixtureBuilder::enhancer`].
    pub fn record(mut self, id: &str, cell_type: &str, position: u64, score: f64) -> Self {
        let (_, chrom, start, end) = self
            .intervals
            .iter()
            .find(|(e, ..)| e == id)
            .cloned()
            .unwrap_or_else(|| panic!("enhancer {id} not registered in fixture"));
        self.rows.push(AccessibilityRow {
            enhancer_id: id.to_string(),
            chrom,
            start,
            end,
            cell_type: cell_type.to_string(),
            position,
            score,
        });
        self
    }

    /// One record per cell type label at evenly spaced positions with
    /// increasing scores.
    pub fn profile(mut self, id: &str, cell_types: &[&str], points: usize) -> Self {
        let start = self
            .intervals
            .iter()
            .find(|(e, ..)| e == id)
            .map(|(_, _, s, _)| *s)
            .unwrap_or_else(|| panic!("enhancer {id} not registered in fixture"));
        for (c, cell_type) in cell_types.iter().enumerate() {
            for p in 0..points {
                let score = 0.1 + 0.05 * (p as f64) + 0.01 * (c as f64);
                self = self.record(id, cell_type, start + 10 * (p as u64 + 1), score);
            }
        }
        self
    }

    pub fn metadata_rows(&self) -> &[MetadataRow] {
        &self.metadata
    }

    pub fn accessibility_rows(&self) -> &[AccessibilityRow] {
        &self.rows
    }

    pub fn try_build(&self) -> Result<Dataset, LoadError> {
        Dataset::from_parts(
            self.metadata.clone(),
            self.rows.clone(),
            CellTypeRegistry::new(),
            JoinOptions::default(),
        )
    }

    pub fn build(&self) -> Dataset {
        self.try_build().expect("fixture dataset should join")
    }

    /// Write `metadata.csv` and accessibility chunks of `chunk_size` rows
    /// (`part1_chunk_001.csv`, ...) into `dir`, returning a matching config.
    pub fn write_to(&self, dir: &Path, chunk_size: usize) -> DataConfig {
        let metadata_path = dir.join("metadata.csv");
        let mut writer = csv::Writer::from_path(&metadata_path).expect("create metadata.csv");
        writer
            .write_record([
                "Enhancer_ID",
                "Cargo",
                "Experiment_Type",
                "Proximal_Gene",
                "GC delivered",
                "image_link",
                "neuroglancer_1",
                "Viewer Link",
                "coronal_mip",
                "sagittal_mip",
            ])
            .expect("write metadata header");
        for row in &self.metadata {
            let cell = |v: &Option<String>| v.clone().unwrap_or_else(|| "nan".to_string());
            writer
                .write_record([
                    row.enhancer_id.clone(),
                    cell(&row.cargo),
                    cell(&row.experiment),
                    cell(&row.proximal_gene),
                    cell(&row.gc_delivered),
                    cell(&row.image_link),
                    cell(&row.neuroglancer_1),
                    cell(&row.viewer_link),
                    cell(&row.coronal_mip),
                    cell(&row.sagittal_mip),
                ])
                .expect("write metadata row");
        }
        writer.flush().expect("flush metadata.csv");

        for (i, chunk) in self.rows.chunks(chunk_size.max(1)).enumerate() {
            let path = dir.join(format!("part1_chunk_{:03}.csv", i + 1));
            let mut writer = csv::Writer::from_path(&path).expect("create chunk");
            for row in chunk {
                writer.serialize(row).expect("write chunk row");
            }
            writer.flush().expect("flush chunk");
        }

        DataConfig {
            metadata_file: metadata_path,
            ..DataConfig::in_dir(dir)
        }
    }
}

/// In-memory [`DatasetSource`] over a fixture.
pub struct FixtureSource(pub FixtureBuilder);

impl DatasetSource for FixtureSource {
    fn describe(&self) -> String {
        "in-memory fixture".to_string()
    }

    fn load(&self) -> Result<Dataset, LoadError> {
        self.0.try_build()
    }
}

pub const GFP: &str = "GFP";
pub const SYFP: &str = "SYFP2";

/// The reference scenario used across the workspace tests:
///
/// | enhancer | cargo | gene | cell types | experiments |
/// |---|---|---|---|---|
/// | E1 | GFP | Gad2 | 1, 3, 5 | EPI (1e10, contact sheet), Lightsheet (5e9, viewer + MIPs) |
/// | E2 | SYFP2 | Sst | 2, 3 | EPI (1e10, contact sheet) |
/// | E3 | GFP | Pvalb | 4 | STPT (no imaging) |
pub fn reference_fixture() -> FixtureBuilder {
    FixtureBuilder::new()
        .enhancer("E1", "chr1", 1_000, 1_500)
        .enhancer("E2", "chr2", 20_000, 20_800)
        .enhancer("E3", "chr1", 5_000, 5_400)
        .experiment("E1", GFP, "Gad2", "EPI", Some("1e10"))
        .with_last_experiment(|row| {
            row.image_link = Some(
                "https://img.example.org/E1/section_01.png,https://img.example.org/E1/contact_sheet.png"
                    .to_string(),
            );
            row.neuroglancer_1 = Some("https://viewer.example.org/#E1-epi".to_string());
        })
        .experiment("E1", GFP, "Gad2", "Lightsheet", Some("5e9"))
        .with_last_experiment(|row| {
            row.neuroglancer_1 = Some("https://viewer.example.org/#E1-ls".to_string());
            row.coronal_mip = Some("https://img.example.org/E1/coronal_mip.png".to_string());
            row.sagittal_mip = Some("https://img.example.org/E1/sagittal_mip.png".to_string());
        })
        .experiment("E2", SYFP, "Sst", "EPI", Some("1e10"))
        .with_last_experiment(|row| {
            row.image_link = Some("https://img.example.org/E2/contact_sheet.png".to_string());
        })
        .experiment("E3", GFP, "Pvalb", "STPT", None)
        .profile("E1", &["cell_type_1", "cell_type_3", "cell_type_5"], 5)
        .profile("E2", &["cell_type_2", "cell_type_3"], 4)
        .profile("E3", &["cell_type_4"], 3)
}
