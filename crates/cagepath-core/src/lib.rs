//! # cagepath Core Library
//!
//! Topological path analysis and voxel-space occupancy for molecular structures.
//!
//! Given an already-built molecule (atoms with positions and radii, bonds with orders) the
//! library finds significant paths through the bond graph (shortest routes, ring-closing
//! alternates, aromatic rings) and rasterizes the molecule's occupied volume into a voxel
//! grid whose cells are cross-indexed with the discovered paths for steric-hindrance queries.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Atom`, `Bond`), the
//!   immutable bond [`Graph`](core::graph::Graph), and geometric primitives.
//!
//! - **[`engine`]: The Logic Core.** The stateful machinery: the indexed `NodeHeap`, Dijkstra
//!   and A* searches with pass-local state, the `PathFinder`, arena-backed registries, the
//!   `VoxelGrid` and the voxel-to-path `VMap`.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie `core` and `engine`
//!   together, such as the full [`analyze`](workflows::analyze) pipeline.

pub mod core;
pub mod engine;
pub mod workflows;
