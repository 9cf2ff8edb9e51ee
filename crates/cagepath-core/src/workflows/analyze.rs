use crate::core::graph::Graph;
use crate::core::models::ids::{PairId, PathId};
use crate::core::models::molecule::Molecule;
use crate::engine::config::{AnalysisConfig, PairPriority};
use crate::engine::error::EngineError;
use crate::engine::obstacle::distance_with_obstacles;
use crate::engine::pathfinder::{Pair, Path, PathFinder, PathSet, count_aro_rings, is_hindered};
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use crate::engine::registry::{PairRegistry, PathRegistry};
use crate::engine::search::validate_pair;
use crate::engine::shell::Shell;
use crate::engine::vmap::VMap;
use crate::engine::voxel::VoxelGrid;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The registry ids of every path found for one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairPaths {
    pub pair: PairId,
    pub best: PathId,
    pub alternates: Vec<PathId>,
    pub rings: Vec<PathId>,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub graph: Graph,
    pub grid: VoxelGrid,
    pub vmap: VMap,
    pub pairs: PairRegistry,
    pub paths: PathRegistry,
    /// Searched pairs in priority order.
    pub found: Vec<PairPaths>,
    /// Pairs whose atoms are not connected in the bond graph.
    pub unreachable: Vec<PairId>,
    /// Shell formed by every ring path.
    pub shell: Shell,
    pub cycle_atoms: Vec<usize>,
}

impl AnalysisResult {
    /// Ring paths that satisfy the aromatic pattern.
    pub fn aromatic_rings(&self) -> Vec<PathId> {
        self.found
            .iter()
            .flat_map(|f| f.rings.iter().copied())
            .filter(|&id| self.paths.get(id).is_some_and(|p| p.pattern_count > 0))
            .collect()
    }

    pub fn hindered_paths(&self) -> Vec<PathId> {
        self.paths
            .iter()
            .filter(|(_, p)| p.hindered)
            .map(|(id, _)| id)
            .collect()
    }
}

#[instrument(skip_all, name = "analysis_workflow")]
pub fn run(
    molecule: &Molecule,
    pairs: &[(usize, usize)],
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Result<AnalysisResult, EngineError> {
    // === Phase 1: Bond Graph ===
    let (graph, cycle_atoms) = reporter.phase(Phase::Graph, || {
        let graph = Graph::from_molecule(molecule)?;
        let cycle_atoms = graph.cycle_atoms();
        info!(
            atoms = graph.len(),
            bonds = graph.edge_count(),
            cycle_atoms = cycle_atoms.len(),
            "Bond graph built."
        );
        Ok::<_, EngineError>((graph, cycle_atoms))
    })?;

    // === Phase 2: Voxelization ===
    let grid = reporter.phase(Phase::Voxelization, || {
        let grid = VoxelGrid::build(molecule.atoms(), &config.grid)?;
        info!(
            dims = ?grid.dims(),
            occupied = grid.occupied_count(),
            "Structure voxelized."
        );
        Ok::<_, EngineError>(grid)
    })?;

    // === Phase 3: Pair Ordering ===
    let pair_registry = reporter.phase(Phase::Pairing, || {
        let mut registry = PairRegistry::new();
        for &(start, end) in pairs {
            validate_pair(&graph, start, end)?;
            let pair = Pair::new(start, end);
            let priority = pair_priority(&graph, &grid, &pair, config.pair_priority)?;
            registry.add_in_order(pair, priority);
        }
        Ok::<_, EngineError>(registry)
    })?;

    // === Phase 4: Path Search ===
    let (mut paths, found, unreachable) = reporter.phase(Phase::Pathfinding, || {
        let queue: Vec<(PairId, Pair)> = pair_registry
            .iter_by_priority()
            .map(|(id, pair)| (id, *pair))
            .collect();
        info!(pairs = queue.len(), "Searching paths for all pairs.");
        reporter.report(Progress::TaskStart {
            total_steps: queue.len() as u64,
        });
        let outcomes = search_pairs(&graph, &queue, config, reporter);
        reporter.report(Progress::TaskFinish);

        let mut paths = PathRegistry::new();
        let mut found = Vec::with_capacity(outcomes.len());
        let mut unreachable = Vec::new();
        for (pair_id, outcome) in outcomes {
            match outcome {
                Ok(set) => found.push(register(&graph, &mut paths, pair_id, set, config)),
                Err(EngineError::NoPathFound { start, end }) => {
                    warn!(start, end, "Atoms are not connected; pair recorded as unreachable.");
                    unreachable.push(pair_id);
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            paths = paths.len(),
            unreachable = unreachable.len(),
            "Path search complete."
        );
        Ok((paths, found, unreachable))
    })?;

    // === Phase 5: Spatial Index ===
    let vmap = reporter.phase(Phase::SpatialIndex, || {
        Ok::<_, EngineError>(VMap::build(
            &grid,
            &graph,
            &paths,
            config.hindrance.vmap_distance,
        ))
    })?;

    // === Phase 6: Hindrance ===
    let shell = reporter.phase(Phase::Hindrance, || {
        let ids: Vec<PathId> = paths.ids().collect();
        let mut hindered_count = 0usize;
        for id in ids {
            let Some(path) = paths.get(id) else {
                continue;
            };
            let hindered = is_hindered(&graph, &grid, &vmap, id, path, &config.hindrance)?;
            if let Some(path) = paths.get_mut(id) {
                path.hindered = hindered;
            }
            hindered_count += usize::from(hindered);
        }
        let shell =
            Shell::from_paths(&paths, found.iter().flat_map(|f| f.rings.iter().copied()))?;
        info!(
            hindered = hindered_count,
            shell_closed = shell.is_closed(&paths),
            "Hindrance flags computed."
        );
        Ok::<_, EngineError>(shell)
    })?;

    Ok(AnalysisResult {
        graph,
        grid,
        vmap,
        pairs: pair_registry,
        paths,
        found,
        unreachable,
        shell,
        cycle_atoms,
    })
}

fn pair_priority(
    graph: &Graph,
    grid: &VoxelGrid,
    pair: &Pair,
    metric: PairPriority,
) -> Result<f64, EngineError> {
    let Some(algorithm) = metric.route_algorithm() else {
        return pair.euclidean_distance(graph).ok_or(EngineError::InvalidPair {
            start: pair.start,
            end: pair.end,
            reason: "atom index out of range",
        });
    };
    let (Some(a), Some(b)) = (graph.node(pair.start), graph.node(pair.end)) else {
        return Err(EngineError::InvalidPair {
            start: pair.start,
            end: pair.end,
            reason: "atom index out of range",
        });
    };
    match distance_with_obstacles(grid, &a.position, &b.position, algorithm) {
        Ok(distance) => Ok(distance),
        Err(EngineError::NoVoxelRoute { .. }) => {
            warn!(
                start = pair.start,
                end = pair.end,
                "No free-voxel route between pair atoms; ordering it last."
            );
            Ok(f64::INFINITY)
        }
        Err(e) => Err(e),
    }
}

fn search_pairs(
    graph: &Graph,
    queue: &[(PairId, Pair)],
    config: &AnalysisConfig,
    reporter: &ProgressReporter,
) -> Vec<(PairId, Result<PathSet, EngineError>)> {
    #[cfg(not(feature = "parallel"))]
    let outcomes = {
        let mut finder = PathFinder::new(graph, &config.search);
        queue
            .iter()
            .map(|&(id, pair)| {
                let outcome = finder.find(pair.start, pair.end);
                reporter.report(Progress::TaskIncrement);
                (id, outcome)
            })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let outcomes = queue
        .par_iter()
        .map_init(
            || PathFinder::new(graph, &config.search),
            |finder, &(id, pair)| {
                let outcome = finder.find(pair.start, pair.end);
                reporter.report(Progress::TaskIncrement);
                (id, outcome)
            },
        )
        .collect();

    outcomes
}

/// Moves one pair's paths into the registry, recording their aromatic ring counts.
fn register(
    graph: &Graph,
    paths: &mut PathRegistry,
    pair: PairId,
    set: PathSet,
    config: &AnalysisConfig,
) -> PairPaths {
    let mut add = |mut path: Path| {
        path.pattern_count = count_aro_rings(graph, &path, &config.aromaticity);
        let cost = path.cost;
        paths.add_in_order(path, cost)
    };
    let best = add(set.best);
    let alternates: Vec<PathId> = set.alternates.into_iter().map(&mut add).collect();
    let rings: Vec<PathId> = set.rings.into_iter().map(&mut add).collect();
    debug!(
        ?pair,
        alternates = alternates.len(),
        rings = rings.len(),
        "Pair paths registered."
    );
    PairPaths {
        pair,
        best,
        alternates,
        rings,
    }
}
