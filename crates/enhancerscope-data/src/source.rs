//! Where a [`Dataset`] comes from.

use std::path::PathBuf;

use enhancerscope_common::config::DataConfig;
use regex::Regex;
use tracing::{debug, info};

use crate::accessibility::read_accessibility;
use crate::cell_types::CellTypeRegistry;
use crate::dataset::{Dataset, JoinOptions};
use crate::error::{LoadError, Result};
use crate::metadata::read_metadata;

/// Trait for building the dataset snapshot.
///
/// Implementations can use:
/// - Metadata + chunked accessibility files on disk
/// - In-memory fixtures (testing)
pub trait DatasetSource: Send + Sync {
    /// Human readable origin, for logs.
    fn describe(&self) -> String;

    /// Build the snapshot. Called once at startup.
    fn load(&self) -> Result<Dataset>;
}

/// Loads the dataset from the files named by a [`DataConfig`].
#[derive(Debug, Clone)]
pub struct FileDatasetSource {
    config: DataConfig,
}

impl FileDatasetSource {
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Accessibility chunks in load order: the explicit list as given, or the
    /// pattern matches in `dir` sorted by file name.
    pub fn accessibility_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.config.accessibility_files.is_empty() {
            let paths: Vec<PathBuf> = self
                .config
                .accessibility_files
                .iter()
                .map(|p| self.config.resolve(p))
                .collect();
            if let Some(missing) = paths.iter().find(|p| !p.exists()) {
                return Err(LoadError::MissingFile(missing.clone()));
            }
            return Ok(paths);
        }

        let pattern = &self.config.accessibility_pattern;
        let regex = Regex::new(pattern).map_err(|e| LoadError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        let dir = &self.config.dir;
        let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::io(dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if regex.is_match(name) && entry.path().is_file() {
                paths.push(entry.path());
            }
        }
        if paths.is_empty() {
            return Err(LoadError::NoAccessibilityFiles { dir: dir.clone(), pattern: pattern.clone() });
        }
        paths.sort();
        Ok(paths)
    }
}

impl DatasetSource for FileDatasetSource {
    fn describe(&self) -> String {
        format!("files in {}", self.config.dir.display())
    }

    fn load(&self) -> Result<Dataset> {
        let metadata_path = self.config.metadata_path();
        info!("Loading enhancer metadata from {:?}", metadata_path);
        let (metadata, skipped) = read_metadata(&metadata_path)?;
        info!("Loaded {} metadata rows", metadata.len());

        let cell_types = match self.config.cell_types_path() {
            Some(path) => CellTypeRegistry::from_table(&path)?,
            None => CellTypeRegistry::new(),
        };

        let paths = self.accessibility_paths()?;
        info!("Loading accessibility data from {} files", paths.len());
        let mut rows = Vec::new();
        for path in &paths {
            let chunk = read_accessibility(path)?;
            debug!("{:?}: {} rows", path.file_name().unwrap_or_default(), chunk.len());
            rows.extend(chunk);
        }
        info!("Read {} accessibility rows", rows.len());

        let options = JoinOptions {
            allow_missing_metadata: self.config.allow_missing_metadata,
            deduplicate: self.config.deduplicate,
        };
        let dataset = Dataset::from_parts(metadata, rows, cell_types, options)?
            .with_skipped_metadata_rows(skipped);

        info!(
            "Dataset ready: {} enhancers, {} cell types, {} records",
            dataset.enhancer_count(),
            dataset.cell_types().count(),
            dataset.records().len()
        );
        Ok(dataset)
    }
}
