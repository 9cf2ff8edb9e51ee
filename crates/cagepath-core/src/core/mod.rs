//! # Core Module
//!
//! The fundamental, stateless building blocks of cagepath.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds, element defaults and the
//!   molecule container handed over by an external structure loader
//! - **Bond Graph** ([`graph`]) - The undirected, read-only adjacency structure that every
//!   pathfinding pass walks over
//! - **Geometry** ([`utils`]) - Point and vector predicates on top of `nalgebra`
//!
//! Nothing in this module keeps per-pass mutable state; search costs, visited flags and
//! predecessor links live in the engine's pass-local search state so that a `Graph` can be
//! shared freely across threads.

pub mod graph;
pub mod models;
pub mod utils;
