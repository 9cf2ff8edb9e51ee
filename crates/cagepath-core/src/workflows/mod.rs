//! # Workflows Module
//!
//! High-level entry points that run a complete analysis over a molecule.
//!
//! - **Analysis Workflow** ([`analyze`]) - Builds the bond graph and the voxel grid, orders
//!   the requested atom pairs, searches their paths (in parallel with the `parallel`
//!   feature), indexes the paths in voxel space and flags steric hindrance.
//!
//! Every phase reports through a [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and logs through `tracing`; installing a subscriber is left to the caller.

pub mod analyze;
