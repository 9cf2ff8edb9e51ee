//! # Bond Graph
//!
//! The undirected adjacency structure built once per molecule and shared read-only by every
//! search pass. Nodes mirror atom indices one-to-one; edges mirror bonds and carry the bond
//! order and the Euclidean bond length between the endpoint positions.

use crate::core::models::atom::Atom;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::{Bond, BondOrder, edge_key};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("Bond #{bond} references atom {atom}, but the structure only has {atom_count} atoms")]
    MissingAtom {
        bond: usize,
        atom: usize,
        atom_count: usize,
    },
    #[error("Bond #{bond} connects atom {atom} to itself")]
    SelfBond { bond: usize, atom: usize },
    #[error("Bond {atom1}-{atom2} is declared twice with conflicting orders ({first} vs {second})")]
    ConflictingBond {
        atom1: usize,
        atom2: usize,
        first: BondOrder,
        second: BondOrder,
    },
    #[error("Atom {atom} has a non-finite position")]
    NonFinitePosition { atom: usize },
}

/// How an edge is weighted during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeWeight {
    /// Euclidean distance between the two bonded atoms.
    #[default]
    BondLength,
    /// Every bond costs 1, so path cost equals hop count.
    Unit,
}

impl EdgeWeight {
    #[inline]
    pub fn cost(self, edge: &Edge) -> f64 {
        match self {
            Self::BondLength => edge.length,
            Self::Unit => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub atom: usize,
    pub position: Point3<f64>,
}

/// A directed half of an undirected bond, stored in the adjacency list of its source node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: usize,
    pub order: BondOrder,
    pub length: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<Edge>>,
    orders: HashMap<(usize, usize), BondOrder>,
}

impl Graph {
    /// Builds the graph from atoms and bonds.
    ///
    /// A bond repeated with the same order is kept once; any other inconsistency is rejected.
    pub fn build(atoms: &[Atom], bonds: &[Bond]) -> Result<Self, GraphError> {
        let atom_count = atoms.len();
        let nodes = atoms
            .iter()
            .enumerate()
            .map(|(atom, a)| {
                if a.position.iter().all(|c| c.is_finite()) {
                    Ok(Node {
                        atom,
                        position: a.position,
                    })
                } else {
                    Err(GraphError::NonFinitePosition { atom })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut adjacency = vec![Vec::new(); atom_count];
        let mut orders = HashMap::with_capacity(bonds.len());

        for (index, bond) in bonds.iter().enumerate() {
            for atom in [bond.atom1, bond.atom2] {
                if atom >= atom_count {
                    return Err(GraphError::MissingAtom {
                        bond: index,
                        atom,
                        atom_count,
                    });
                }
            }
            if bond.atom1 == bond.atom2 {
                return Err(GraphError::SelfBond {
                    bond: index,
                    atom: bond.atom1,
                });
            }

            match orders.entry(bond.key()) {
                Entry::Occupied(existing) => {
                    if *existing.get() != bond.order {
                        let (atom1, atom2) = bond.key();
                        return Err(GraphError::ConflictingBond {
                            atom1,
                            atom2,
                            first: *existing.get(),
                            second: bond.order,
                        });
                    }
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(bond.order);
                }
            }

            let length = (nodes[bond.atom1].position - nodes[bond.atom2].position).norm();
            adjacency[bond.atom1].push(Edge {
                to: bond.atom2,
                order: bond.order,
                length,
            });
            adjacency[bond.atom2].push(Edge {
                to: bond.atom1,
                order: bond.order,
                length,
            });
        }

        Ok(Self {
            nodes,
            adjacency,
            orders,
        })
    }

    pub fn from_molecule(molecule: &Molecule) -> Result<Self, GraphError> {
        Self::build(molecule.atoms(), molecule.bonds())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.orders.len()
    }

    pub fn contains(&self, node: usize) -> bool {
        node < self.nodes.len()
    }

    pub fn node(&self, node: usize) -> Option<&Node> {
        self.nodes.get(node)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Outgoing edges of `node`; empty for an unknown node.
    pub fn edges(&self, node: usize) -> &[Edge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges(node).iter().map(|e| e.to)
    }

    pub fn degree(&self, node: usize) -> usize {
        self.edges(node).len()
    }

    pub fn bond_order(&self, a: usize, b: usize) -> Option<BondOrder> {
        self.orders.get(&edge_key(a, b)).copied()
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&Edge> {
        self.edges(from).iter().find(|e| e.to == to)
    }

    /// Checks that `nodes` is a connected walk without repeated nodes.
    ///
    /// A closed ring (first == last, at least three distinct nodes) may repeat its first node
    /// at the end and nowhere else.
    pub fn is_walk(&self, nodes: &[usize]) -> bool {
        if nodes.len() < 2 || nodes.iter().any(|&n| !self.contains(n)) {
            return false;
        }
        if !nodes.windows(2).all(|w| self.edge(w[0], w[1]).is_some()) {
            return false;
        }
        let closed = nodes.first() == nodes.last();
        let distinct = if closed {
            if nodes.len() < 4 {
                return false;
            }
            &nodes[..nodes.len() - 1]
        } else {
            nodes
        };
        let mut seen = vec![false; self.nodes.len()];
        distinct
            .iter()
            .all(|&n| !std::mem::replace(&mut seen[n], true))
    }

    /// Sum of edge costs along `nodes`, or `None` if some consecutive pair is not bonded.
    pub fn walk_cost(&self, nodes: &[usize], weight: EdgeWeight) -> Option<f64> {
        nodes
            .windows(2)
            .map(|w| self.edge(w[0], w[1]).map(|e| weight.cost(e)))
            .sum()
    }

    /// Atoms lying on at least one cycle, in ascending order.
    ///
    /// An atom is on a cycle exactly when it is incident to an edge that is not a bridge.
    /// Bridges are found with an iterative low-link depth-first search.
    pub fn cycle_atoms(&self) -> Vec<usize> {
        const UNVISITED: usize = usize::MAX;
        let n = self.nodes.len();
        let mut disc = vec![UNVISITED; n];
        let mut low = vec![0; n];
        let mut on_cycle = vec![false; n];
        let mut timer = 0;
        // (node, parent, next edge offset)
        let mut stack: Vec<(usize, Option<usize>, usize)> = Vec::new();

        for root in 0..n {
            if disc[root] != UNVISITED {
                continue;
            }
            disc[root] = timer;
            low[root] = timer;
            timer += 1;
            stack.push((root, None, 0));

            while let Some(frame) = stack.last_mut() {
                let (v, parent) = (frame.0, frame.1);
                if let Some(edge) = self.adjacency[v].get(frame.2) {
                    frame.2 += 1;
                    let to = edge.to;
                    if Some(to) == parent {
                        continue;
                    }
                    if disc[to] == UNVISITED {
                        disc[to] = timer;
                        low[to] = timer;
                        timer += 1;
                        stack.push((to, Some(v), 0));
                    } else {
                        low[v] = low[v].min(disc[to]);
                        on_cycle[v] = true;
                        on_cycle[to] = true;
                    }
                } else {
                    stack.pop();
                    if let Some(p) = parent {
                        low[p] = low[p].min(low[v]);
                        if low[v] <= disc[p] {
                            on_cycle[p] = true;
                            on_cycle[v] = true;
                        }
                    }
                }
            }
        }

        on_cycle
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| c.then_some(i))
            .collect()
    }
}
