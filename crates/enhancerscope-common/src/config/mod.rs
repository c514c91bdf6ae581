//! Configuration loading for enhancerscope.
//! Reads enhancerscope.toml from the current directory or the path in the
//! ENHANCERSCOPE_CONFIG env var. YAML and JSON files are accepted by extension.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entities::ExperimentKind;
use crate::error::ConfigError;

pub const CONFIG_ENV_VAR: &str = "ENHANCERSCOPE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "enhancerscope.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub figure: FigureConfig,
    #[serde(default)]
    pub imaging: ImagingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

// ── Server ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
    /// Empty means any origin when CORS is enabled.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_xsrf_protection: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }
fn default_true() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: false,
            cors_allowed_origins: vec![],
            enable_xsrf_protection: true,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.host '{}' is not an IP address", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// ── Data files ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Base directory; relative file names below are resolved against it.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
    /// Explicit accessibility tables. When empty, `accessibility_pattern` is
    /// matched against the file names in `dir`.
    #[serde(default)]
    pub accessibility_files: Vec<PathBuf>,
    #[serde(default = "default_accessibility_pattern")]
    pub accessibility_pattern: String,
    /// Optional `ordinal,name` table of cell types.
    #[serde(default)]
    pub cell_types_file: Option<PathBuf>,
    #[serde(default)]
    pub allow_missing_metadata: bool,
    #[serde(default = "default_true")]
    pub deduplicate: bool,
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_metadata_file() -> PathBuf { PathBuf::from("Enhancer_and_experiment_metadata.feather") }
fn default_accessibility_pattern() -> String { r"^part.*\.csv$".to_string() }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            metadata_file: default_metadata_file(),
            accessibility_files: vec![],
            accessibility_pattern: default_accessibility_pattern(),
            cell_types_file: None,
            allow_missing_metadata: false,
            deduplicate: true,
        }
    }
}

impl DataConfig {
    /// A config rooted at `dir` with every other field defaulted.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), ..Self::default() }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.metadata_file)
    }

    pub fn cell_types_path(&self) -> Option<PathBuf> {
        self.cell_types_file.as_deref().map(|p| self.resolve(p))
    }
}

// ── Figure layout ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FigureConfig {
    #[serde(default = "default_track_height")]
    pub track_height_px: u32,
    #[serde(default = "default_min_height")]
    pub min_height_px: u32,
    #[serde(default = "default_empty_height")]
    pub empty_height_px: u32,
    /// Multiplier applied to the highest score for the shared y range.
    #[serde(default = "default_y_padding")]
    pub y_padding: f64,
    /// Quantile above which a point is marked as a peak.
    #[serde(default = "default_peak_quantile")]
    pub peak_quantile: f64,
}

fn default_track_height() -> u32 { 120 }
fn default_min_height() -> u32 { 500 }
fn default_empty_height() -> u32 { 300 }
fn default_y_padding() -> f64 { 1.1 }
fn default_peak_quantile() -> f64 { 0.8 }

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            track_height_px: default_track_height(),
            min_height_px: default_min_height(),
            empty_height_px: default_empty_height(),
            y_padding: default_y_padding(),
            peak_quantile: default_peak_quantile(),
        }
    }
}

// ── Imaging ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingConfig {
    /// Modalities in order of preference.
    #[serde(default = "default_imaging_priority")]
    pub priority: Vec<ExperimentKind>,
}

fn default_imaging_priority() -> Vec<ExperimentKind> {
    vec![ExperimentKind::Lightsheet, ExperimentKind::Epi]
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self { priority: default_imaging_priority() }
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Tsv => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" => Ok(ExportFormat::Tsv),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,
    /// Rows shown in the dashboard's raw data table. 0 hides it.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_preview_rows() -> usize { 100 }

impl Default for ExportConfig {
    fn default() -> Self {
        Self { format: ExportFormat::default(), preview_rows: default_preview_rows() }
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration.
    /// Checks ENHANCERSCOPE_CONFIG env var first, then the current directory.
    /// Without either, defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_path(path),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_path(DEFAULT_CONFIG_FILE),
            Err(_) => {
                tracing::warn!(
                    "No {} found and {} not set, using defaults",
                    DEFAULT_CONFIG_FILE,
                    CONFIG_ENV_VAR
                );
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed = match ext.as_deref() {
            Some("toml") => Self::from_toml(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        let config = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Rejects values that would only fail later, at load or render time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        self.server.socket_addr()?;

        regex::Regex::new(&self.data.accessibility_pattern).map_err(|e| {
            ConfigError::Invalid(format!("data.accessibility_pattern: {e}"))
        })?;

        if self.imaging.priority.is_empty() {
            return Err(ConfigError::Invalid("imaging.priority must name at least one modality".into()));
        }
        for (i, kind) in self.imaging.priority.iter().enumerate() {
            if self.imaging.priority[..i].contains(kind) {
                return Err(ConfigError::Invalid(format!("imaging.priority lists '{kind}' twice")));
            }
        }

        let figure = &self.figure;
        if !(0.0..=1.0).contains(&figure.peak_quantile) {
            return Err(ConfigError::Invalid("figure.peak_quantile must be within [0, 1]".into()));
        }
        if !(figure.y_padding >= 1.0) {
            return Err(ConfigError::Invalid("figure.y_padding must be at least 1.0".into()));
        }
        if figure.track_height_px == 0 {
            return Err(ConfigError::Invalid("figure.track_height_px must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
