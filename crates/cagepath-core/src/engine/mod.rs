//! # Engine Module
//!
//! The stateful machinery behind an analysis pass: searches, registries and the spatial
//! index.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Grid resolution, aromaticity and hindrance thresholds,
//!   search limits, and the TOML file layer
//! - **Priority Queue** ([`heap`]) - Index-addressable min-heap shared by every search
//! - **Search** ([`search`]) - Pass-local search state and Dijkstra over the bond graph
//! - **Path Finding** ([`pathfinder`]) - Shortest and alternate paths, ring closure, aromatic
//!   ring counting and hindrance flagging
//! - **Registries** ([`registry`]) - Arena-backed pair and path collections with insertion
//!   and priority order
//! - **Voxel Space** ([`voxel`], [`vmap`], [`obstacle`]) - Occupancy grid, voxel-to-segment
//!   index, and routing around occupied space
//! - **Shells** ([`shell`]) - Path sets bounding a region, with a closure test
//! - **Progress Monitoring** ([`progress`]) - Callback-based phase and task events
//! - **Error Handling** ([`error`]) - The engine-wide error type
//!
//! The bond graph and the voxel grid are read-only once built; everything that changes
//! during a search lives in a [`SearchState`](search::SearchState) owned by one worker.

pub mod config;
pub mod error;
pub mod heap;
pub mod obstacle;
pub mod pathfinder;
pub mod progress;
pub mod registry;
pub mod search;
pub mod shell;
pub mod vmap;
pub mod voxel;
