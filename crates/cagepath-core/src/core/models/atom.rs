use super::element::{FALLBACK_RADIUS, element_defaults};
use nalgebra::Point3;
use std::fmt;

/// Orbital hybridization derived from an atom's steric number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hybridization {
    /// Steric number 2, linear geometry.
    Sp,
    /// Steric number 3, trigonal planar geometry.
    Sp2,
    /// Steric number 4, tetrahedral geometry.
    Sp3,
    /// Any other steric number.
    #[default]
    Unknown,
}

impl Hybridization {
    /// Maps a steric number (ligands + lone pairs) to a hybridization.
    pub fn from_steric_number(steric: u8) -> Self {
        match steric {
            2 => Self::Sp,
            3 => Self::Sp2,
            4 => Self::Sp3,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Hybridization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sp => "sp",
            Self::Sp2 => "sp2",
            Self::Sp3 => "sp3",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Represents an atom of the analysed molecule.
///
/// An atom is identified by its index inside the owning [`Molecule`](super::molecule::Molecule);
/// bonded neighbours are served by the bond [`Graph`](crate::core::graph::Graph) built from it.
/// Atoms are immutable for the duration of an analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol (e.g., "C", "N", "Cl").
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The radius, in Angstroms, used when the atom is rasterized into a voxel grid.
    pub radius: f64,
    /// Number of bonded ligands in the atom's valence shell.
    pub ligands: u8,
    /// Number of lone pairs in the atom's valence shell.
    pub lone_pairs: u8,
}

impl Atom {
    /// Creates a new `Atom` whose radius and valence shell come from the element table.
    ///
    /// Unknown elements receive the fallback radius and an empty valence shell.
    ///
    /// # Arguments
    ///
    /// * `element` - The element symbol.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        let defaults = element_defaults(element);
        Self {
            element: element.trim().to_string(),
            position,
            radius: defaults.map_or(FALLBACK_RADIUS, |d| d.radius),
            ligands: defaults.map_or(0, |d| d.ligands),
            lone_pairs: defaults.map_or(0, |d| d.lone_pairs),
        }
    }

    /// Returns a copy of the atom with an explicit radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Returns a copy of the atom with an explicit valence shell.
    pub fn with_valence(mut self, ligands: u8, lone_pairs: u8) -> Self {
        self.ligands = ligands;
        self.lone_pairs = lone_pairs;
        self
    }

    /// Sum of ligands and lone pairs.
    pub fn steric_number(&self) -> u8 {
        self.ligands.saturating_add(self.lone_pairs)
    }

    pub fn hybridization(&self) -> Hybridization {
        Hybridization::from_steric_number(self.steric_number())
    }
}
