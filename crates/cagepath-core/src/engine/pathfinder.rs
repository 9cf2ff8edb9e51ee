use super::config::{AromaticitySettings, HindranceSettings, SearchSettings};
use super::error::EngineError;
use super::search::{EdgeMask, Route, SearchState, dijkstra, validate_pair};
use super::vmap::VMap;
use super::voxel::VoxelGrid;
use crate::core::graph::Graph;
use crate::core::models::ids::PathId;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::{distance_to_plane, plane_normal};
use itertools::Itertools;
use std::collections::HashSet;
use tracing::debug;

/// An ordered pair of atoms whose connecting paths are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub start: usize,
    pub end: usize,
}

impl Pair {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Straight-line distance between the two atoms, if both exist.
    pub fn euclidean_distance(&self, graph: &Graph) -> Option<f64> {
        let a = graph.node(self.start)?;
        let b = graph.node(self.end)?;
        Some((a.position - b.position).norm())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Shortest,
    /// The `rank`-th route found after removing the edges of all earlier ones.
    Alternate { rank: usize },
    /// A closed cycle formed by the shortest path and a disjoint alternate.
    Ring,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<usize>,
    pub cost: f64,
    pub kind: PathKind,
    /// Closed node sequences recognized as cycles through this path.
    pub cycles: Vec<Vec<usize>>,
    /// Number of aromatic rings among this path and its cycles.
    pub pattern_count: usize,
    pub hindered: bool,
}

impl Path {
    pub fn new(nodes: Vec<usize>, cost: f64, kind: PathKind) -> Self {
        Self {
            nodes,
            cost,
            kind,
            cycles: Vec::new(),
            pattern_count: 0,
            hindered: false,
        }
    }

    fn from_route(route: Route, kind: PathKind) -> Self {
        Self::new(route.nodes, route.cost, kind)
    }

    pub fn start(&self) -> Option<usize> {
        self.nodes.first().copied()
    }

    pub fn end(&self) -> Option<usize> {
        self.nodes.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 3 && self.nodes.first() == self.nodes.last()
    }

    /// Number of node positions along the path.
    pub fn position_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Consecutive node pairs, indexed by segment number.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes.windows(2).map(|w| (w[0], w[1]))
    }

    /// Nodes strictly between the two endpoints.
    pub fn interior(&self) -> &[usize] {
        match self.nodes.len() {
            0..=2 => &[],
            n => &self.nodes[1..n - 1],
        }
    }

    /// Atoms that are passed through rather than ended at: every ring atom of a closed path,
    /// the interior of an open one.
    pub fn through_atoms(&self) -> &[usize] {
        if self.is_closed() {
            &self.nodes[..self.nodes.len() - 1]
        } else {
            self.interior()
        }
    }
}

/// Every path found for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSet {
    pub best: Path,
    pub alternates: Vec<Path>,
    pub rings: Vec<Path>,
}

impl PathSet {
    pub fn path_count(&self) -> usize {
        1 + self.alternates.len() + self.rings.len()
    }
}

/// Shortest and alternate path search over a shared graph.
///
/// Each finder owns its [`SearchState`], so one finder per worker thread is enough.
pub struct PathFinder<'g> {
    graph: &'g Graph,
    settings: SearchSettings,
    state: SearchState,
}

impl<'g> PathFinder<'g> {
    pub fn new(graph: &'g Graph, settings: &SearchSettings) -> Self {
        Self {
            graph,
            settings: settings.clone(),
            state: SearchState::new(graph.len()),
        }
    }

    pub fn shortest(&mut self, start: usize, end: usize) -> Result<Path, EngineError> {
        self.route(start, end, &EdgeMask::new())
            .map(|route| Path::from_route(route, PathKind::Shortest))
    }

    fn route(&mut self, start: usize, end: usize, mask: &EdgeMask) -> Result<Route, EngineError> {
        dijkstra(
            self.graph,
            &mut self.state,
            start,
            end,
            self.settings.edge_weight,
            mask,
            self.settings.max_heap_pops,
        )
    }

    /// Finds the shortest path and up to `max_alternates` further routes.
    ///
    /// Each alternate is searched with the edges of every earlier route removed. An alternate
    /// whose interior shares no atom with the shortest path's interior closes a ring; the ring
    /// is emitted as its own path and recorded in the shortest path's cycles.
    pub fn find(&mut self, start: usize, end: usize) -> Result<PathSet, EngineError> {
        validate_pair(self.graph, start, end)?;
        let mut best = self.shortest(start, end)?;
        let best_interior: HashSet<usize> = best.interior().iter().copied().collect();

        let mut mask = EdgeMask::new();
        mask.remove_walk(&best.nodes);
        let mut alternates = Vec::new();
        let mut rings = Vec::new();

        for rank in 1..=self.settings.max_alternates {
            let route = match self.route(start, end, &mask) {
                Ok(route) => route,
                Err(EngineError::NoPathFound { .. }) => break,
                Err(e) => return Err(e),
            };
            mask.remove_walk(&route.nodes);

            let alternate = Path::from_route(route, PathKind::Alternate { rank });
            if alternate
                .interior()
                .iter()
                .all(|n| !best_interior.contains(n))
            {
                let ring = close_ring(&best, &alternate);
                best.cycles.push(ring.nodes.clone());
                rings.push(ring);
            }
            alternates.push(alternate);
        }

        debug!(
            start,
            end,
            cost = best.cost,
            alternates = alternates.len(),
            rings = rings.len(),
            "Pair searched."
        );

        Ok(PathSet {
            best,
            alternates,
            rings,
        })
    }
}

/// Joins `best` (start to end) with `alternate` walked back from end to start.
fn close_ring(best: &Path, alternate: &Path) -> Path {
    let mut nodes = best.nodes.clone();
    nodes.extend(alternate.nodes.iter().rev().skip(1));
    Path::new(nodes, best.cost + alternate.cost, PathKind::Ring)
}

/// Number of aromatic rings among the path itself (when closed) and its recognized cycles.
pub fn count_aro_rings(graph: &Graph, path: &Path, settings: &AromaticitySettings) -> usize {
    let own = path.is_closed().then_some(path.nodes.as_slice());
    own.into_iter()
        .chain(path.cycles.iter().map(Vec::as_slice))
        .filter(|ring| is_aromatic_ring(graph, ring, settings.tolerance))
        .count()
}

/// Tests the aromatic pattern on a closed node sequence (first node repeated at the end).
///
/// Every ring bond must be aromatic, or the bonds must strictly alternate between single
/// and double around the ring. Every ring atom must lie within `tolerance` of the plane
/// through three non-collinear ring atoms.
pub fn is_aromatic_ring(graph: &Graph, ring: &[usize], tolerance: f64) -> bool {
    if ring.len() < 4 || ring.first() != ring.last() {
        return false;
    }
    let orders: Option<Vec<BondOrder>> = ring
        .windows(2)
        .map(|w| graph.bond_order(w[0], w[1]))
        .collect();
    let Some(orders) = orders else {
        return false;
    };

    let all_aromatic = orders.iter().all(|&o| o == BondOrder::Aromatic);
    let alternating = orders.len() % 2 == 0
        && orders
            .iter()
            .all(|&o| matches!(o, BondOrder::Single | BondOrder::Double))
        && orders
            .iter()
            .circular_tuple_windows()
            .all(|(a, b)| a != b);
    if !all_aromatic && !alternating {
        return false;
    }

    is_planar(graph, &ring[..ring.len() - 1], tolerance)
}

fn is_planar(graph: &Graph, atoms: &[usize], tolerance: f64) -> bool {
    let positions: Option<Vec<_>> = atoms
        .iter()
        .map(|&a| graph.node(a).map(|n| n.position))
        .collect();
    let Some(positions) = positions else {
        return false;
    };
    let (a, b) = (&positions[0], &positions[1]);
    let Some(normal) = positions[2..].iter().find_map(|c| plane_normal(a, b, c)) else {
        // Collinear atoms always lie on some plane.
        return true;
    };
    positions
        .iter()
        .all(|p| distance_to_plane(p, a, &normal) <= tolerance)
}

/// Whether any atom `path` passes through sits in a crowded voxel neighbourhood.
///
/// Crowding is measured by [`VMap::crowding`] over the cube of `probe_radius` voxels around
/// the atom's voxel, so voxels indexed under the path's own segments do not count against it.
/// `id` must be the key under which `path` was indexed into `vmap`. The path is hindered when
/// crowding is strictly above `density_threshold`.
pub fn is_hindered(
    graph: &Graph,
    grid: &VoxelGrid,
    vmap: &VMap,
    id: PathId,
    path: &Path,
    settings: &HindranceSettings,
) -> Result<bool, EngineError> {
    for &atom in path.through_atoms() {
        let node = graph.node(atom).ok_or_else(|| {
            EngineError::Internal(format!("path references atom {atom} missing from the graph"))
        })?;
        let voxel = grid.voxel_of(&node.position)?;
        if vmap.crowding(grid, voxel, settings.probe_radius, id)? > settings.density_threshold {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::EdgeWeight;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::Bond;
    use crate::engine::config::{AnalysisConfig, GridConfig};
    use crate::engine::registry::PathRegistry;
    use nalgebra::Point3;
    use std::f64::consts::PI;

    fn hexagon(orders: [BondOrder; 6], pucker: f64) -> Graph {
        let atoms: Vec<Atom> = (0..6)
            .map(|i| {
                let angle = i as f64 * PI / 3.0;
                let z = if i == 2 { pucker } else { 0.0 };
                Atom::new("C", Point3::new(1.4 * angle.cos(), 1.4 * angle.sin(), z))
            })
            .collect();
        let bonds: Vec<Bond> = (0..6)
            .map(|i| Bond::new(i, (i + 1) % 6, orders[i]))
            .collect();
        Graph::build(&atoms, &bonds).unwrap()
    }

    const KEKULE: [BondOrder; 6] = [
        BondOrder::Double,
        BondOrder::Single,
        BondOrder::Double,
        BondOrder::Single,
        BondOrder::Double,
        BondOrder::Single,
    ];

    fn unit_settings(max_alternates: usize) -> SearchSettings {
        SearchSettings {
            edge_weight: EdgeWeight::Unit,
            max_alternates,
            max_heap_pops: None,
        }
    }

    fn aromaticity() -> AromaticitySettings {
        AnalysisConfig::default().aromaticity
    }

    #[test]
    fn hexagon_pair_three_bonds_apart_costs_three_and_closes_ring() {
        let graph = hexagon(KEKULE, 0.0);
        let mut finder = PathFinder::new(&graph, &unit_settings(2));
        let set = finder.find(0, 3).unwrap();

        assert_eq!(set.best.cost, 3.0);
        assert_eq!(set.best.kind, PathKind::Shortest);
        assert_eq!(set.alternates.len(), 1);
        assert_eq!(set.alternates[0].cost, 3.0);
        assert_eq!(set.alternates[0].kind, PathKind::Alternate { rank: 1 });

        assert_eq!(set.rings.len(), 1);
        let ring = &set.rings[0];
        assert!(ring.is_closed());
        assert_eq!(ring.position_count(), 7);
        assert_eq!(ring.cost, 6.0);
        assert!(graph.is_walk(&ring.nodes));
        assert_eq!(set.best.cycles, vec![ring.nodes.clone()]);
    }

    #[test]
    fn alternating_hexagon_counts_one_aromatic_ring() {
        let graph = hexagon(KEKULE, 0.0);
        let set = PathFinder::new(&graph, &unit_settings(2)).find(0, 3).unwrap();
        assert_eq!(count_aro_rings(&graph, &set.best, &aromaticity()), 1);
        assert_eq!(count_aro_rings(&graph, &set.rings[0], &aromaticity()), 1);
        assert_eq!(count_aro_rings(&graph, &set.alternates[0], &aromaticity()), 0);
    }

    #[test]
    fn aromatic_order_hexagon_is_aromatic() {
        let graph = hexagon([BondOrder::Aromatic; 6], 0.0);
        let set = PathFinder::new(&graph, &unit_settings(1)).find(1, 4).unwrap();
        assert_eq!(count_aro_rings(&graph, &set.best, &aromaticity()), 1);
    }

    #[test]
    fn saturated_hexagon_has_no_aromatic_ring() {
        let graph = hexagon([BondOrder::Single; 6], 0.0);
        let set = PathFinder::new(&graph, &unit_settings(2)).find(0, 3).unwrap();
        assert_eq!(set.rings.len(), 1);
        assert_eq!(count_aro_rings(&graph, &set.best, &aromaticity()), 0);
    }

    #[test]
    fn puckered_hexagon_fails_planarity() {
        let graph = hexagon(KEKULE, 0.5);
        let set = PathFinder::new(&graph, &unit_settings(2)).find(0, 3).unwrap();
        assert_eq!(count_aro_rings(&graph, &set.best, &aromaticity()), 0);

        let loose = AromaticitySettings { tolerance: 1.5 };
        assert_eq!(count_aro_rings(&graph, &set.best, &loose), 1);
    }

    #[test]
    fn odd_ring_cannot_alternate() {
        let atoms: Vec<Atom> = (0..5)
            .map(|i| {
                let angle = i as f64 * 2.0 * PI / 5.0;
                Atom::new("C", Point3::new(angle.cos(), angle.sin(), 0.0))
            })
            .collect();
        let orders = [
            BondOrder::Single,
            BondOrder::Double,
            BondOrder::Single,
            BondOrder::Double,
            BondOrder::Single,
        ];
        let bonds: Vec<Bond> = (0..5).map(|i| Bond::new(i, (i + 1) % 5, orders[i])).collect();
        let graph = Graph::build(&atoms, &bonds).unwrap();
        assert!(!is_aromatic_ring(&graph, &[0, 1, 2, 3, 4, 0], 0.1));
    }

    #[test]
    fn acyclic_path_has_no_aromatic_rings() {
        let graph = hexagon(KEKULE, 0.0);
        let path = PathFinder::new(&graph, &unit_settings(0))
            .shortest(0, 2)
            .unwrap();
        assert!(path.cycles.is_empty());
        assert_eq!(count_aro_rings(&graph, &path, &aromaticity()), 0);
    }

    #[test]
    fn zero_alternates_returns_only_best_path() {
        let graph = hexagon(KEKULE, 0.0);
        let set = PathFinder::new(&graph, &unit_settings(0)).find(0, 3).unwrap();
        assert!(set.alternates.is_empty());
        assert!(set.rings.is_empty());
        assert_eq!(set.path_count(), 1);
    }

    #[test]
    fn alternate_sharing_interior_atoms_is_not_a_ring() {
        // Best 0-1-3; after removing its edges the only route is 0-2-1-4-3 through atom 1.
        let atoms: Vec<Atom> = (0..5)
            .map(|i| Atom::new("C", Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let bonds: Vec<Bond> = [(0, 1), (1, 3), (0, 2), (2, 1), (1, 4), (4, 3)]
            .iter()
            .map(|&(a, b)| Bond::new(a, b, BondOrder::Single))
            .collect();
        let graph = Graph::build(&atoms, &bonds).unwrap();
        let set = PathFinder::new(&graph, &unit_settings(3)).find(0, 3).unwrap();
        assert_eq!(set.best.nodes, vec![0, 1, 3]);
        assert_eq!(set.alternates.len(), 1);
        assert_eq!(set.alternates[0].nodes, vec![0, 2, 1, 4, 3]);
        assert!(set.rings.is_empty());
        assert!(set.best.cycles.is_empty());
    }

    #[test]
    fn find_rejects_invalid_pairs() {
        let graph = hexagon(KEKULE, 0.0);
        let mut finder = PathFinder::new(&graph, &unit_settings(1));
        assert!(matches!(
            finder.find(2, 2),
            Err(EngineError::InvalidPair { .. })
        ));
        assert!(matches!(
            finder.find(0, 6),
            Err(EngineError::InvalidPair { .. })
        ));
    }

    #[test]
    fn path_accessors_describe_endpoints_and_segments() {
        let path = Path::new(vec![4, 7, 1], 2.0, PathKind::Shortest);
        assert_eq!(path.start(), Some(4));
        assert_eq!(path.end(), Some(1));
        assert_eq!(path.interior(), &[7]);
        assert_eq!(path.segments().collect::<Vec<_>>(), vec![(4, 7), (7, 1)]);
        assert_eq!(path.segment_count(), 2);
        assert!(!path.is_closed());
    }

    fn dense_cluster() -> (Vec<Atom>, Graph) {
        // A short chain buried in a tight block of unbonded atoms.
        let mut atoms = vec![
            Atom::new("C", Point3::new(0.0, 0.0, 0.0)).with_radius(0.6),
            Atom::new("C", Point3::new(1.0, 0.0, 0.0)).with_radius(0.6),
            Atom::new("C", Point3::new(2.0, 0.0, 0.0)).with_radius(0.6),
        ];
        for x in 0..3 {
            for y in [-1.0, 1.0] {
                atoms.push(Atom::new("C", Point3::new(x as f64, y, 0.0)).with_radius(0.6));
            }
        }
        let bonds = [
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
        ];
        let graph = Graph::build(&atoms, &bonds).unwrap();
        (atoms, graph)
    }

    #[test]
    fn hindrance_is_monotone_in_threshold() {
        let (atoms, graph) = dense_cluster();
        let grid = VoxelGrid::build(
            &atoms,
            &GridConfig {
                cell_size: 0.5,
                margin: 1.0,
                origin: None,
            },
        )
        .unwrap();
        let path = PathFinder::new(&graph, &unit_settings(0))
            .shortest(0, 2)
            .unwrap();
        let mut paths = PathRegistry::new();
        let id = paths.add(path.clone());
        let vmap = VMap::build(&grid, &graph, &paths, 0.5);

        let mut previous = true;
        let mut seen_true = false;
        let mut seen_false = false;
        for step in 0..=20 {
            let settings = HindranceSettings {
                density_threshold: step as f64 / 20.0 - 0.05,
                probe_radius: 1,
                vmap_distance: 0.5,
            };
            let hindered = is_hindered(&graph, &grid, &vmap, id, &path, &settings).unwrap();
            assert!(previous || !hindered, "hindrance reappeared at step {step}");
            previous = hindered;
            seen_true |= hindered;
            seen_false |= !hindered;
        }
        assert!(seen_true && seen_false);
    }

    #[test]
    fn path_without_interior_is_never_hindered() {
        let (atoms, graph) = dense_cluster();
        let grid = VoxelGrid::build(
            &atoms,
            &GridConfig {
                cell_size: 0.5,
                margin: 1.0,
                origin: None,
            },
        )
        .unwrap();
        let path = PathFinder::new(&graph, &unit_settings(0))
            .shortest(0, 1)
            .unwrap();
        let mut paths = PathRegistry::new();
        let id = paths.add(path.clone());
        let vmap = VMap::build(&grid, &graph, &paths, 1.0);
        let settings = HindranceSettings {
            density_threshold: -1.0,
            probe_radius: 1,
            vmap_distance: 1.0,
        };
        assert!(!is_hindered(&graph, &grid, &vmap, id, &path, &settings).unwrap());
    }

    /// Square ring 0-1-2-3 on voxel centers, with three unbonded atoms packed next to atom 0.
    fn square_with_crowded_corner() -> (Graph, VoxelGrid) {
        let corners = [(0.5, 0.5), (4.5, 0.5), (4.5, 4.5), (0.5, 4.5)];
        let crowd = [(-0.5, -0.5), (-0.5, 0.5), (0.5, -0.5)];
        let atoms: Vec<Atom> = corners
            .into_iter()
            .chain(crowd)
            .map(|(x, y)| Atom::new("C", Point3::new(x, y, 0.5)).with_radius(0.0))
            .collect();
        let bonds: Vec<Bond> = (0..4)
            .map(|i| Bond::new(i, (i + 1) % 4, BondOrder::Single))
            .collect();
        let graph = Graph::build(&atoms, &bonds).unwrap();
        let grid = VoxelGrid::build(
            &atoms,
            &GridConfig {
                cell_size: 1.0,
                margin: 2.0,
                origin: Some(Point3::new(-2.0, -2.0, -2.0)),
            },
        )
        .unwrap();
        (graph, grid)
    }

    fn crowding_settings(density_threshold: f64) -> HindranceSettings {
        HindranceSettings {
            density_threshold,
            probe_radius: 1,
            vmap_distance: 0.5,
        }
    }

    #[test]
    fn closed_ring_is_probed_at_its_closing_atom() {
        let (graph, grid) = square_with_crowded_corner();
        let ring = Path::new(vec![0, 1, 2, 3, 0], 4.0, PathKind::Ring);
        assert_eq!(ring.through_atoms(), &[0, 1, 2, 3]);

        let mut paths = PathRegistry::new();
        let id = paths.add(ring.clone());
        let vmap = VMap::build(&grid, &graph, &paths, 0.5);
        let corner = grid.voxel_of(&Point3::new(0.5, 0.5, 0.5)).unwrap();
        let crowding = vmap.crowding(&grid, corner, 1, id).unwrap();
        assert!((crowding - 3.0 / 27.0).abs() < 1e-12);

        // Only the crowded corner exceeds the threshold.
        assert!(is_hindered(&graph, &grid, &vmap, id, &ring, &crowding_settings(0.1)).unwrap());
        let open = Path::new(vec![1, 2, 3], 2.0, PathKind::Shortest);
        let open_id = paths.add(open.clone());
        let vmap = VMap::build(&grid, &graph, &paths, 0.5);
        let settings = crowding_settings(0.1);
        assert!(!is_hindered(&graph, &grid, &vmap, open_id, &open, &settings).unwrap());
    }

    #[test]
    fn hindrance_depends_on_what_the_voxel_map_indexes() {
        let (graph, grid) = square_with_crowded_corner();
        let open = Path::new(vec![1, 2, 3], 2.0, PathKind::Shortest);
        let mut paths = PathRegistry::new();
        let id = paths.add(open.clone());
        let indexed = VMap::build(&grid, &graph, &paths, 0.5);
        let unindexed = VMap::build(&grid, &graph, &PathRegistry::new(), 0.5);

        // Atom 2's own voxel only counts as crowding when its segments are not indexed.
        let settings = crowding_settings(0.02);
        assert!(!is_hindered(&graph, &grid, &indexed, id, &open, &settings).unwrap());
        assert!(is_hindered(&graph, &grid, &unindexed, id, &open, &settings).unwrap());
    }
}
