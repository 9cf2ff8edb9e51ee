//! Routing through free space on a voxel grid.
//!
//! Occupied voxels are obstacles; the route moves between the 26 neighbours of a voxel with
//! a step cost of 1, √2 or √3 cell lengths depending on how many axes change. The start and
//! goal voxels are always traversable, even when an atom occupies them.

use super::error::EngineError;
use super::heap::NodeHeap;
use super::voxel::{VoxelGrid, VoxelIndex};
use nalgebra::Point3;
use serde::Deserialize;
use std::f64::consts::SQRT_2;
use tracing::trace;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteAlgorithm {
    /// Best-first search guided by the 3D octile distance.
    #[default]
    AStar,
    Dijkstra,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoxelRoute {
    pub voxels: Vec<VoxelIndex>,
    pub length: f64,
}

/// Length of the shortest free-voxel route between the voxels containing `from` and `to`.
pub fn distance_with_obstacles(
    grid: &VoxelGrid,
    from: &Point3<f64>,
    to: &Point3<f64>,
    algorithm: RouteAlgorithm,
) -> Result<f64, EngineError> {
    route_with_obstacles(grid, from, to, algorithm).map(|r| r.length)
}

pub fn route_with_obstacles(
    grid: &VoxelGrid,
    from: &Point3<f64>,
    to: &Point3<f64>,
    algorithm: RouteAlgorithm,
) -> Result<VoxelRoute, EngineError> {
    let start = grid.voxel_of(from)?;
    let goal = grid.voxel_of(to)?;
    route_between(grid, start, goal, algorithm)
}

/// Searches from `start` to `goal`, both given as voxel indices.
pub fn route_between(
    grid: &VoxelGrid,
    start: VoxelIndex,
    goal: VoxelIndex,
    algorithm: RouteAlgorithm,
) -> Result<VoxelRoute, EngineError> {
    let start_id = grid.index(start)?;
    let goal_id = grid.index(goal)?;
    let cell = grid.cell_size();
    let heuristic = |voxel: VoxelIndex| match algorithm {
        RouteAlgorithm::AStar => octile_distance(voxel, goal, cell),
        RouteAlgorithm::Dijkstra => 0.0,
    };

    let mut g_score = vec![f64::INFINITY; grid.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
    let mut heap = NodeHeap::with_capacity(grid.len());
    g_score[start_id] = 0.0;
    heap.push(start_id, heuristic(start));

    let mut expanded = 0usize;
    while let Some((current_id, _)) = heap.pop_min() {
        expanded += 1;
        if current_id == goal_id {
            break;
        }
        let Some(current) = grid.voxel_at(current_id) else {
            continue;
        };
        for (neighbor, axes) in grid.neighbors26(current) {
            let neighbor_id = grid.index(neighbor)?;
            if heap.is_settled(neighbor_id) {
                continue;
            }
            let traversable =
                neighbor_id == goal_id || neighbor_id == start_id || !grid.is_occupied(neighbor)?;
            if !traversable {
                continue;
            }
            let tentative = g_score[current_id] + step_cost(axes, cell);
            if tentative < g_score[neighbor_id] {
                g_score[neighbor_id] = tentative;
                came_from[neighbor_id] = Some(current_id);
                heap.decrease_key(neighbor_id, tentative + heuristic(neighbor));
            }
        }
    }

    if !g_score[goal_id].is_finite() {
        return Err(EngineError::NoVoxelRoute {
            from: start,
            to: goal,
        });
    }

    let mut ids = vec![goal_id];
    let mut current = goal_id;
    while current != start_id {
        current = came_from[current].ok_or_else(|| {
            EngineError::Internal(format!("voxel route broken at linear index {current}"))
        })?;
        ids.push(current);
    }
    ids.reverse();
    let voxels = ids
        .into_iter()
        .map(|id| {
            grid.voxel_at(id)
                .ok_or_else(|| EngineError::Internal(format!("voxel {id} outside grid")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    trace!(?algorithm, expanded, steps = voxels.len() - 1, "Voxel route found.");
    Ok(VoxelRoute {
        voxels,
        length: g_score[goal_id],
    })
}

fn step_cost(axes: u8, cell: f64) -> f64 {
    match axes {
        3 => SQRT_3 * cell,
        2 => SQRT_2 * cell,
        _ => cell,
    }
}

/// Exact free-space distance on a 26-connected grid:
/// (√3 − √2)·dmin + (√2 − 1)·dmid + dmax, in cell lengths scaled by `cell`.
pub fn octile_distance(a: VoxelIndex, b: VoxelIndex, cell: f64) -> f64 {
    let mut d = [a.x.abs_diff(b.x), a.y.abs_diff(b.y), a.z.abs_diff(b.z)].map(|v| v as f64 * cell);
    d.sort_by(f64::total_cmp);
    let [dmin, dmid, dmax] = d;
    (SQRT_3 - SQRT_2) * dmin + (SQRT_2 - 1.0) * dmid + dmax
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::engine::config::GridConfig;

    const EPS: f64 = 1e-9;

    /// Empty 10x10x1 grid with one tiny atom in each corner to fix the extent.
    fn open_grid() -> VoxelGrid {
        let atoms = vec![
            Atom::new("C", Point3::new(0.5, 0.5, 0.5)).with_radius(0.0),
            Atom::new("C", Point3::new(9.5, 9.5, 0.5)).with_radius(0.0),
        ];
        VoxelGrid::build(
            &atoms,
            &GridConfig {
                cell_size: 1.0,
                margin: 0.0,
                origin: Some(Point3::origin()),
            },
        )
        .unwrap()
    }

    /// A wall at x = 4 spanning the whole grid except the listed gaps.
    fn walled_grid(gap_rows: &[usize]) -> VoxelGrid {
        let mut atoms = vec![
            Atom::new("C", Point3::new(0.5, 0.5, 0.5)).with_radius(0.0),
            Atom::new("C", Point3::new(9.5, 9.5, 0.5)).with_radius(0.0),
        ];
        for y in 0..10 {
            if !gap_rows.contains(&y) {
                atoms.push(Atom::new("C", Point3::new(4.5, y as f64 + 0.5, 0.5)).with_radius(0.1));
            }
        }
        VoxelGrid::build(
            &atoms,
            &GridConfig {
                cell_size: 1.0,
                margin: 0.0,
                origin: Some(Point3::origin()),
            },
        )
        .unwrap()
    }

    #[test]
    fn octile_distance_matches_closed_form() {
        let a = VoxelIndex::new(0, 0, 0);
        assert!((octile_distance(a, VoxelIndex::new(3, 0, 0), 1.0) - 3.0).abs() < EPS);
        assert!((octile_distance(a, VoxelIndex::new(2, 2, 0), 1.0) - 2.0 * SQRT_2).abs() < EPS);
        assert!((octile_distance(a, VoxelIndex::new(1, 1, 1), 0.5) - 0.5 * SQRT_3).abs() < EPS);
        let mixed = octile_distance(a, VoxelIndex::new(1, 2, 4), 1.0);
        assert!((mixed - (SQRT_3 + SQRT_2 + 2.0)).abs() < EPS);
    }

    #[test]
    fn open_space_distance_equals_octile_distance() {
        let grid = open_grid();
        assert_eq!(grid.dims(), [10, 10, 1]);
        for algorithm in [RouteAlgorithm::AStar, RouteAlgorithm::Dijkstra] {
            let d = distance_with_obstacles(
                &grid,
                &Point3::new(0.5, 0.5, 0.5),
                &Point3::new(7.5, 3.5, 0.5),
                algorithm,
            )
            .unwrap();
            assert!((d - (3.0 * SQRT_2 + 4.0)).abs() < EPS, "{algorithm:?} gave {d}");
        }
    }

    #[test]
    fn wall_forces_detour_through_gap() {
        let grid = walled_grid(&[9]);
        let from = Point3::new(1.5, 0.5, 0.5);
        let to = Point3::new(7.5, 0.5, 0.5);
        let astar = distance_with_obstacles(&grid, &from, &to, RouteAlgorithm::AStar).unwrap();
        let dijkstra = distance_with_obstacles(&grid, &from, &to, RouteAlgorithm::Dijkstra).unwrap();
        assert!((astar - dijkstra).abs() < EPS);
        assert!(astar > 6.0 + EPS);

        let route = route_with_obstacles(&grid, &from, &to, RouteAlgorithm::AStar).unwrap();
        assert!(route.voxels.iter().any(|v| v.x == 4 && v.y == 9));
        for v in &route.voxels {
            assert!(!grid.is_occupied(*v).unwrap());
        }
    }

    #[test]
    fn sealed_wall_yields_no_voxel_route() {
        let grid = walled_grid(&[]);
        let err = distance_with_obstacles(
            &grid,
            &Point3::new(1.5, 0.5, 0.5),
            &Point3::new(7.5, 0.5, 0.5),
            RouteAlgorithm::AStar,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoVoxelRoute { .. }));
    }

    #[test]
    fn occupied_start_and_goal_are_traversable() {
        let grid = walled_grid(&[]);
        // Start inside the wall, goal on its right side.
        let d = distance_with_obstacles(
            &grid,
            &Point3::new(4.5, 0.5, 0.5),
            &Point3::new(6.5, 0.5, 0.5),
            RouteAlgorithm::Dijkstra,
        )
        .unwrap();
        assert!((d - 2.0).abs() < EPS);
    }

    #[test]
    fn same_voxel_has_zero_distance() {
        let grid = open_grid();
        let p = Point3::new(2.2, 2.7, 0.1);
        assert_eq!(
            distance_with_obstacles(&grid, &p, &p, RouteAlgorithm::AStar).unwrap(),
            0.0
        );
    }

    #[test]
    fn points_outside_grid_are_out_of_bounds() {
        let grid = open_grid();
        let err = distance_with_obstacles(
            &grid,
            &Point3::new(-5.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 0.5),
            RouteAlgorithm::AStar,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::OutOfBounds { .. }));
    }
}
