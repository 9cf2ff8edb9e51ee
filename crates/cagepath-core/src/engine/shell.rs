use super::error::EngineError;
use super::registry::PathRegistry;
use crate::core::models::ids::PathId;
use crate::core::models::topology::edge_key;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A set of registered paths bounding a region of the molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shell {
    paths: Vec<PathId>,
    atoms: BTreeSet<usize>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the given paths; fails if an id is not in `registry`.
    pub fn from_paths(
        registry: &PathRegistry,
        ids: impl IntoIterator<Item = PathId>,
    ) -> Result<Self, EngineError> {
        let mut shell = Self::new();
        for id in ids {
            shell.add_path(registry, id)?;
        }
        Ok(shell)
    }

    /// Adds a path; adding the same path twice has no effect.
    pub fn add_path(&mut self, registry: &PathRegistry, id: PathId) -> Result<(), EngineError> {
        let path = registry
            .get(id)
            .ok_or_else(|| EngineError::Internal(format!("unknown path {id:?} added to shell")))?;
        if !self.paths.contains(&id) {
            self.paths.push(id);
            self.atoms.extend(path.nodes.iter().copied());
        }
        Ok(())
    }

    pub fn paths(&self) -> &[PathId] {
        &self.paths
    }

    /// Atoms covered by the shell, ascending.
    pub fn atoms(&self) -> &BTreeSet<usize> {
        &self.atoms
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// True when every covered atom has at least two incident shell edges.
    ///
    /// Paths that have been removed from `registry` are ignored. An empty shell is open.
    pub fn is_closed(&self, registry: &PathRegistry) -> bool {
        let edges: HashSet<(usize, usize)> = self
            .paths
            .iter()
            .filter_map(|&id| registry.get(id))
            .flat_map(|p| p.segments().map(|(a, b)| edge_key(a, b)))
            .collect();
        if edges.is_empty() {
            return false;
        }
        let mut degree: HashMap<usize, usize> = HashMap::new();
        for (a, b) in &edges {
            *degree.entry(*a).or_default() += 1;
            *degree.entry(*b).or_default() += 1;
        }
        degree.values().all(|&d| d >= 2)
    }

    /// Ids of the shell's paths flagged as hindered.
    pub fn hindered_paths(&self, registry: &PathRegistry) -> Vec<PathId> {
        self.paths
            .iter()
            .copied()
            .filter(|&id| registry.get(id).is_some_and(|p| p.hindered))
            .collect()
    }
}
