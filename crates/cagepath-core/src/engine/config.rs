use super::obstacle::RouteAlgorithm;
use crate::core::graph::EdgeWeight;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid configuration in '{path}': {source}")]
    Invalid { path: String, source: ConfigError },
}

/// Built-in values used whenever a parameter is not set explicitly.
pub struct AnalysisDefaults;

impl AnalysisDefaults {
    pub const CELL_SIZE: f64 = 0.5;
    pub const MARGIN: f64 = 2.0;
    pub const AROMATIC_TOLERANCE: f64 = 0.1;
    pub const DENSITY_THRESHOLD: f64 = 0.5;
    pub const PROBE_RADIUS: usize = 1;
    pub const VMAP_DISTANCE: f64 = 1.5;
    pub const MAX_ALTERNATES: usize = 2;
    pub const EDGE_WEIGHT: EdgeWeight = EdgeWeight::BondLength;
    pub const PAIR_PRIORITY: PairPriority = PairPriority::Euclidean;
}

/// Metric used to order pairs before they are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairPriority {
    /// Straight-line distance between the two atoms.
    #[default]
    Euclidean,
    /// Voxel route length around occupied space, found with A*.
    ObstacleAStar,
    /// Voxel route length around occupied space, found with Dijkstra.
    ObstacleDijkstra,
}

impl PairPriority {
    pub fn route_algorithm(self) -> Option<RouteAlgorithm> {
        match self {
            Self::Euclidean => None,
            Self::ObstacleAStar => Some(RouteAlgorithm::AStar),
            Self::ObstacleDijkstra => Some(RouteAlgorithm::Dijkstra),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub cell_size: f64,
    pub margin: f64,
    /// Minimum corner of the grid; derived from the bounding box when absent.
    pub origin: Option<Point3<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AromaticitySettings {
    /// Maximum distance, in Angstroms, of a ring atom from the ring plane.
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HindranceSettings {
    pub density_threshold: f64,
    /// Half-width, in voxels, of the cube inspected around an atom.
    pub probe_radius: usize,
    /// Segments closer than this to a voxel center are indexed under that voxel.
    pub vmap_distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub edge_weight: EdgeWeight,
    pub max_alternates: usize,
    pub max_heap_pops: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub grid: GridConfig,
    pub aromaticity: AromaticitySettings,
    pub hindrance: HindranceSettings,
    pub search: SearchSettings,
    pub pair_priority: PairPriority,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig {
                cell_size: AnalysisDefaults::CELL_SIZE,
                margin: AnalysisDefaults::MARGIN,
                origin: None,
            },
            aromaticity: AromaticitySettings {
                tolerance: AnalysisDefaults::AROMATIC_TOLERANCE,
            },
            hindrance: HindranceSettings {
                density_threshold: AnalysisDefaults::DENSITY_THRESHOLD,
                probe_radius: AnalysisDefaults::PROBE_RADIUS,
                vmap_distance: AnalysisDefaults::VMAP_DISTANCE,
            },
            search: SearchSettings {
                edge_weight: AnalysisDefaults::EDGE_WEIGHT,
                max_alternates: AnalysisDefaults::MAX_ALTERNATES,
                max_heap_pops: None,
            },
            pair_priority: AnalysisDefaults::PAIR_PRIORITY,
        }
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::with_defaults()
    }

    /// Parses a TOML document whose values override the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigLoadError> {
        Self::parse(content, "<string>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::parse(&content, &display)
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigLoadError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigLoadError::Toml {
            path: path.to_string(),
            source: e,
        })?;
        file.apply(AnalysisConfigBuilder::with_defaults())
            .build()
            .map_err(|e| ConfigLoadError::Invalid {
                path: path.to_string(),
                source: e,
            })
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnalysisConfigBuilder {
    cell_size: Option<f64>,
    margin: Option<f64>,
    origin: Option<Point3<f64>>,
    aromatic_tolerance: Option<f64>,
    density_threshold: Option<f64>,
    probe_radius: Option<usize>,
    vmap_distance: Option<f64>,
    edge_weight: Option<EdgeWeight>,
    max_alternates: Option<usize>,
    max_heap_pops: Option<usize>,
    pair_priority: Option<PairPriority>,
}

impl AnalysisConfigBuilder {
    /// An empty builder; every required parameter must be set before `build`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with [`AnalysisDefaults`].
    pub fn with_defaults() -> Self {
        Self {
            cell_size: Some(AnalysisDefaults::CELL_SIZE),
            margin: Some(AnalysisDefaults::MARGIN),
            origin: None,
            aromatic_tolerance: Some(AnalysisDefaults::AROMATIC_TOLERANCE),
            density_threshold: Some(AnalysisDefaults::DENSITY_THRESHOLD),
            probe_radius: Some(AnalysisDefaults::PROBE_RADIUS),
            vmap_distance: Some(AnalysisDefaults::VMAP_DISTANCE),
            edge_weight: Some(AnalysisDefaults::EDGE_WEIGHT),
            max_alternates: Some(AnalysisDefaults::MAX_ALTERNATES),
            max_heap_pops: None,
            pair_priority: Some(AnalysisDefaults::PAIR_PRIORITY),
        }
    }

    pub fn cell_size(mut self, size: f64) -> Self {
        self.cell_size = Some(size);
        self
    }
    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = Some(margin);
        self
    }
    pub fn origin(mut self, origin: Point3<f64>) -> Self {
        self.origin = Some(origin);
        self
    }
    pub fn aromatic_tolerance(mut self, tolerance: f64) -> Self {
        self.aromatic_tolerance = Some(tolerance);
        self
    }
    pub fn density_threshold(mut self, threshold: f64) -> Self {
        self.density_threshold = Some(threshold);
        self
    }
    pub fn probe_radius(mut self, radius: usize) -> Self {
        self.probe_radius = Some(radius);
        self
    }
    pub fn vmap_distance(mut self, distance: f64) -> Self {
        self.vmap_distance = Some(distance);
        self
    }
    pub fn edge_weight(mut self, weight: EdgeWeight) -> Self {
        self.edge_weight = Some(weight);
        self
    }
    pub fn max_alternates(mut self, n: usize) -> Self {
        self.max_alternates = Some(n);
        self
    }
    pub fn max_heap_pops(mut self, limit: usize) -> Self {
        self.max_heap_pops = Some(limit);
        self
    }
    pub fn pair_priority(mut self, priority: PairPriority) -> Self {
        self.pair_priority = Some(priority);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let cell_size = self
            .cell_size
            .ok_or(ConfigError::MissingParameter("cell_size"))?;
        let margin = self.margin.ok_or(ConfigError::MissingParameter("margin"))?;
        let tolerance = self
            .aromatic_tolerance
            .ok_or(ConfigError::MissingParameter("aromatic_tolerance"))?;
        let density_threshold = self
            .density_threshold
            .ok_or(ConfigError::MissingParameter("density_threshold"))?;
        let vmap_distance = self
            .vmap_distance
            .ok_or(ConfigError::MissingParameter("vmap_distance"))?;

        positive("cell_size", cell_size)?;
        non_negative("margin", margin)?;
        non_negative("aromatic_tolerance", tolerance)?;
        if !density_threshold.is_finite() {
            return Err(invalid("density_threshold", "must be a finite number"));
        }
        positive("vmap_distance", vmap_distance)?;
        if let Some(origin) = &self.origin {
            if !origin.iter().all(|c| c.is_finite()) {
                return Err(invalid("origin", "all coordinates must be finite"));
            }
        }
        if self.max_heap_pops == Some(0) {
            return Err(invalid("max_heap_pops", "must be at least 1"));
        }

        Ok(AnalysisConfig {
            grid: GridConfig {
                cell_size,
                margin,
                origin: self.origin,
            },
            aromaticity: AromaticitySettings { tolerance },
            hindrance: HindranceSettings {
                density_threshold,
                probe_radius: self
                    .probe_radius
                    .ok_or(ConfigError::MissingParameter("probe_radius"))?,
                vmap_distance,
            },
            search: SearchSettings {
                edge_weight: self
                    .edge_weight
                    .ok_or(ConfigError::MissingParameter("edge_weight"))?,
                max_alternates: self
                    .max_alternates
                    .ok_or(ConfigError::MissingParameter("max_alternates"))?,
                max_heap_pops: self.max_heap_pops,
            },
            pair_priority: self
                .pair_priority
                .ok_or(ConfigError::MissingParameter("pair_priority"))?,
        })
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("expected a positive number, got {value}")))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            name,
            &format!("expected a non-negative number, got {value}"),
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    grid: GridSection,
    #[serde(default)]
    aromaticity: AromaticitySection,
    #[serde(default)]
    hindrance: HindranceSection,
    #[serde(default)]
    search: SearchSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct GridSection {
    cell_size: Option<f64>,
    margin: Option<f64>,
    origin: Option<[f64; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AromaticitySection {
    tolerance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct HindranceSection {
    density_threshold: Option<f64>,
    probe_radius: Option<usize>,
    vmap_distance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SearchSection {
    edge_weight: Option<EdgeWeight>,
    max_alternates: Option<usize>,
    max_heap_pops: Option<usize>,
    pair_priority: Option<PairPriority>,
}

impl ConfigFile {
    fn apply(self, mut builder: AnalysisConfigBuilder) -> AnalysisConfigBuilder {
        if let Some(v) = self.grid.cell_size {
            builder = builder.cell_size(v);
        }
        if let Some(v) = self.grid.margin {
            builder = builder.margin(v);
        }
        if let Some([x, y, z]) = self.grid.origin {
            builder = builder.origin(Point3::new(x, y, z));
        }
        if let Some(v) = self.aromaticity.tolerance {
            builder = builder.aromatic_tolerance(v);
        }
        if let Some(v) = self.hindrance.density_threshold {
            builder = builder.density_threshold(v);
        }
        if let Some(v) = self.hindrance.probe_radius {
            builder = builder.probe_radius(v);
        }
        if let Some(v) = self.hindrance.vmap_distance {
            builder = builder.vmap_distance(v);
        }
        if let Some(v) = self.search.edge_weight {
            builder = builder.edge_weight(v);
        }
        if let Some(v) = self.search.max_alternates {
            builder = builder.max_alternates(v);
        }
        if let Some(v) = self.search.max_heap_pops {
            builder = builder.max_heap_pops(v);
        }
        if let Some(v) = self.search.pair_priority {
            builder = builder.pair_priority(v);
        }
        builder
    }
}
