use super::atom::Atom;
use super::topology::{Bond, BondOrder};
use crate::core::utils::geometry::bounding_box;
use nalgebra::Point3;

/// An already-built molecular structure: ordered atoms and the bonds between them.
///
/// Atom identity is the index in insertion order. The container performs no consistency
/// checks of its own; these happen when a [`Graph`](crate::core::graph::Graph) is built from
/// it, so that an external loader can hand over raw data and receive a single, explicit
/// `MalformedStructure` error.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    /// Creates a new, empty molecule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a molecule directly from atom and bond lists.
    pub fn from_parts(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        Self { atoms, bonds }
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Records a bond between two atom indices.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) {
        self.bonds.push(Bond::new(atom1, atom2, order));
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Axis-aligned box around the atom centers, or `None` for an empty molecule.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        bounding_box(self.atoms.iter().map(|a| &a.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_carbons() -> Molecule {
        let mut molecule = Molecule::new();
        let a = molecule.add_atom(Atom::new("C", Point3::new(0.0, 0.0, 0.0)).with_radius(1.0));
        let b = molecule.add_atom(Atom::new("C", Point3::new(1.5, 0.0, 0.0)).with_radius(0.5));
        molecule.add_bond(a, b, BondOrder::Single);
        molecule
    }

    #[test]
    fn atoms_are_indexed_in_insertion_order() {
        let molecule = two_carbons();
        assert_eq!(molecule.len(), 2);
        assert_eq!(molecule.atom(1).unwrap().position.x, 1.5);
        assert!(molecule.atom(2).is_none());
        assert_eq!(molecule.bonds(), &[Bond::new(0, 1, BondOrder::Single)]);
    }

    #[test]
    fn bounding_box_covers_atom_centers() {
        let molecule = two_carbons();
        let (min, max) = molecule.bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn from_parts_keeps_raw_data_unchecked() {
        let atoms = vec![Atom::new("C", Point3::origin())];
        let bonds = vec![Bond::new(0, 5, BondOrder::Single)];
        let molecule = Molecule::from_parts(atoms, bonds.clone());
        assert_eq!(molecule.len(), 1);
        assert_eq!(molecule.bonds(), bonds.as_slice());
    }

    #[test]
    fn empty_molecule_has_no_bounding_box() {
        let molecule = Molecule::new();
        assert!(molecule.is_empty());
        assert!(molecule.bounding_box().is_none());
    }
}
