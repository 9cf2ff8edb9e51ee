use thiserror::Error;

use super::config::ConfigError;
use super::voxel::VoxelIndex;
use crate::core::graph::GraphError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed structure: {source}")]
    MalformedStructure {
        #[from]
        source: GraphError,
    },

    #[error("Invalid pair ({start}, {end}): {reason}")]
    InvalidPair {
        start: usize,
        end: usize,
        reason: &'static str,
    },

    #[error("No path found between atoms {start} and {end}")]
    NoPathFound { start: usize, end: usize },

    #[error("Query ({x}, {y}, {z}) lies outside the voxel grid")]
    OutOfBounds { x: f64, y: f64, z: f64 },

    #[error("Cannot voxelize a structure without atoms")]
    EmptyStructure,

    #[error("Voxel grid of {dims:?} cells exceeds the limit of {limit} cells")]
    GridTooLarge { dims: [usize; 3], limit: usize },

    #[error("No free-voxel route from {from:?} to {to:?}")]
    NoVoxelRoute { from: VoxelIndex, to: VoxelIndex },

    #[error("Search aborted after exceeding the limit of {limit} heap pops")]
    SearchLimit { limit: usize },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
