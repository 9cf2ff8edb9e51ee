//! # Core Models Module
//!
//! Data structures describing the molecule under analysis.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms with element, position, rasterization radius and valence shell
//! - [`element`] - Static per-element defaults (radius, ligands, lone pairs)
//! - [`topology`] - Bond orders and bonds between atom indices
//! - [`molecule`] - The ordered atom/bond container consumed by the engines
//! - [`ids`] - Stable arena keys for pairs and paths
//!
//! ## Usage
//!
//! ```ignore
//! use cagepath::core::models::{atom::Atom, molecule::Molecule, topology::BondOrder};
//!
//! let mut molecule = Molecule::new();
//! let c1 = molecule.add_atom(Atom::new("C", Point3::new(0.0, 0.0, 0.0)));
//! let c2 = molecule.add_atom(Atom::new("C", Point3::new(1.4, 0.0, 0.0)));
//! molecule.add_bond(c1, c2, BondOrder::Aromatic);
//! ```

pub mod atom;
pub mod element;
pub mod ids;
pub mod molecule;
pub mod topology;
