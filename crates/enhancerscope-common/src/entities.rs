//! Typed domain entities shared by the loader, the explorer and the web shell.
//!
//! Reference data (enhancers, cell types, experiments) is immutable once a
//! dataset has been loaded; records refer to it through typed keys
//! ([`EnhancerId`], [`CellTypeOrdinal`]) rather than loose strings.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Highest cell type ordinal in the atlas.
pub const MAX_CELL_TYPE_ORDINAL: u8 = 34;

/// Label used for gene/cargo/experiment when the metadata has no value.
pub const NOT_SPECIFIED: &str = "Not specified";

// ── Enhancer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnhancerId(String);

impl EnhancerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnhancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EnhancerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EnhancerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Half-open genomic span `chrom:start-end`, always with `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicInterval {
    /// Returns `None` for an empty or inverted span.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Option<Self> {
        if start >= end {
            return None;
        }
        Some(Self { chrom: chrom.into(), start, end })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `chr7:1,234,000-1,235,500 (1,500 bp)`, as shown under figure titles.
    pub fn locus_label(&self) -> String {
        format!(
            "{}:{}-{} ({} bp)",
            self.chrom,
            group_thousands(self.start),
            group_thousands(self.end),
            group_thousands(self.len())
        )
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancer {
    pub id: EnhancerId,
    pub interval: GenomicInterval,
    pub proximal_gene: String,
    pub cargo: String,
}

// ── Cell types ───────────────────────────────────────────────────────────────

/// Cell type number in `1..=MAX_CELL_TYPE_ORDINAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CellTypeOrdinal(u8);

impl CellTypeOrdinal {
    pub fn new(ordinal: u8) -> Option<Self> {
        (1..=MAX_CELL_TYPE_ORDINAL).contains(&ordinal).then_some(Self(ordinal))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Reads the ordinal out of a label such as `11_CNU_HYa_GABA` or
    /// `cell_type_5`: the first run of ASCII digits.
    pub fn parse_label(label: &str) -> Option<Self> {
        let digits: String = label
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u8>().ok().and_then(Self::new)
    }
}

impl TryFrom<u8> for CellTypeOrdinal {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!("cell type ordinal {value} outside 1..={MAX_CELL_TYPE_ORDINAL}")
        })
    }
}

impl From<CellTypeOrdinal> for u8 {
    fn from(ordinal: CellTypeOrdinal) -> Self {
        ordinal.0
    }
}

impl fmt::Display for CellTypeOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellType {
    pub ordinal: CellTypeOrdinal,
    pub name: String,
}

// ── Accessibility ────────────────────────────────────────────────────────────

/// One accessibility measurement at a genomic position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityRecord {
    pub enhancer_id: EnhancerId,
    pub cell_type: CellTypeOrdinal,
    pub position: u64,
    pub score: f64,
}

// ── Experiments ──────────────────────────────────────────────────────────────

/// Imaging modality of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    Epi,
    Stpt,
    Lightsheet,
    Other,
}

impl ExperimentKind {
    /// Classifies a free-text experiment label such as `Lightsheet 2x` or `EPI`.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("lightsheet") || lower.contains("light sheet") || lower.contains("light-sheet") {
            ExperimentKind::Lightsheet
        } else if lower.contains("stpt") {
            ExperimentKind::Stpt
        } else if lower.contains("epi") {
            ExperimentKind::Epi
        } else {
            ExperimentKind::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentKind::Epi => "epi",
            ExperimentKind::Stpt => "stpt",
            ExperimentKind::Lightsheet => "lightsheet",
            ExperimentKind::Other => "other",
        }
    }
}

impl FromStr for ExperimentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epi" => Ok(ExperimentKind::Epi),
            "stpt" => Ok(ExperimentKind::Stpt),
            "lightsheet" | "light_sheet" => Ok(ExperimentKind::Lightsheet),
            "other" => Ok(ExperimentKind::Other),
            other => Err(format!("unknown imaging modality '{other}'")),
        }
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Genome copies delivered per injection, kept as the label the metadata
/// carries (`1e10`, `5.0E+09`) because that is what users filter on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeCopies(String);

impl GenomeCopies {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> Option<f64> {
        self.0.replace(',', "").trim().parse::<f64>().ok()
    }

    /// Numeric order where both parse, numbers before text otherwise.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for GenomeCopies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Links to rendered imaging for one experiment row. Every stored URL has
/// already passed [`ImagingAssets::link`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagingAssets {
    pub image_links: Vec<String>,
    pub neuroglancer_1: Option<String>,
    pub neuroglancer_3: Option<String>,
    pub viewer_link: Option<String>,
    pub coronal_mip: Option<String>,
    pub sagittal_mip: Option<String>,
}

impl ImagingAssets {
    /// Accepts only absolute http(s) URLs; placeholders such as `nan` or
    /// `false` become `None`.
    pub fn link(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(trimmed.to_string())
        } else {
            None
        }
    }

    /// Splits a comma separated `image_link` cell into valid URLs.
    pub fn split_links(raw: &str) -> Vec<String> {
        raw.split(',').filter_map(Self::link).collect()
    }

    pub fn contact_sheet(&self) -> Option<&str> {
        self.image_links
            .iter()
            .find(|url| url.contains("contact_sheet"))
            .map(String::as_str)
    }

    pub fn viewer(&self) -> Option<&str> {
        self.neuroglancer_1
            .as_deref()
            .or(self.viewer_link.as_deref())
            .or(self.neuroglancer_3.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.image_links.is_empty()
            && self.neuroglancer_1.is_none()
            && self.neuroglancer_3.is_none()
            && self.viewer_link.is_none()
            && self.coronal_mip.is_none()
            && self.sagittal_mip.is_none()
    }
}

/// One experiment performed with an enhancer construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    pub enhancer_id: EnhancerId,
    pub experiment: String,
    pub kind: ExperimentKind,
    pub gc_delivered: Option<GenomeCopies>,
    pub assets: ImagingAssets,
}
