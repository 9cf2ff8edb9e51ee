use super::error::EngineError;
use super::registry::PathRegistry;
use super::voxel::{VoxelGrid, VoxelIndex};
use crate::core::graph::Graph;
use crate::core::models::ids::PathId;
use crate::core::utils::geometry::distance_to_segment;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// One segment of a registered path: the bond between `nodes[segment]` and `nodes[segment + 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathRef {
    pub path: PathId,
    pub segment: usize,
}

/// Cross-index from occupied voxels to the path segments passing near them.
///
/// A VMap is tied to the grid it was built against; queries with any other grid are
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct VMap {
    layout: Option<GridLayout>,
    distance: f64,
    entries: HashMap<usize, BTreeSet<PathRef>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridLayout {
    origin: Point3<f64>,
    cell_size: f64,
    dims: [usize; 3],
}

impl GridLayout {
    fn of(grid: &VoxelGrid) -> Self {
        Self {
            origin: grid.origin(),
            cell_size: grid.cell_size(),
            dims: grid.dims(),
        }
    }
}

impl VMap {
    /// Records, for every occupied voxel, the path segments whose distance from the voxel
    /// center is strictly less than `distance`.
    pub fn build(grid: &VoxelGrid, graph: &Graph, paths: &PathRegistry, distance: f64) -> Self {
        let mut entries: HashMap<usize, BTreeSet<PathRef>> = HashMap::new();

        for (id, path) in paths.iter() {
            for (segment, (a, b)) in path.segments().enumerate() {
                let (Some(a), Some(b)) = (graph.node(a), graph.node(b)) else {
                    continue;
                };
                let (a, b) = (a.position, b.position);
                let reach = Vector3::repeat(distance);
                let window = voxel_window(grid, &(a.inf(&b) - reach), &(a.sup(&b) + reach));
                let Some((low, high)) = window else {
                    continue;
                };
                for z in low.z..=high.z {
                    for y in low.y..=high.y {
                        for x in low.x..=high.x {
                            let voxel = VoxelIndex::new(x, y, z);
                            if !grid.is_occupied(voxel).unwrap_or(false) {
                                continue;
                            }
                            if distance_to_segment(&grid.center(voxel), &a, &b) < distance {
                                if let Ok(linear) = grid.index(voxel) {
                                    entries
                                        .entry(linear)
                                        .or_default()
                                        .insert(PathRef { path: id, segment });
                                }
                            }
                        }
                    }
                }
            }
        }

        debug!(
            indexed_voxels = entries.len(),
            paths = paths.len(),
            "Voxel map built."
        );
        Self {
            layout: Some(GridLayout::of(grid)),
            distance,
            entries,
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Number of voxels with at least one nearby segment.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_grid(&self, grid: &VoxelGrid) -> Result<(), EngineError> {
        if self.layout == Some(GridLayout::of(grid)) {
            Ok(())
        } else {
            Err(EngineError::Internal(
                "voxel map queried with a grid it was not built against".to_string(),
            ))
        }
    }

    /// Segments indexed under `voxel`, in ascending `(path, segment)` order.
    pub fn at(&self, grid: &VoxelGrid, voxel: VoxelIndex) -> Result<Vec<PathRef>, EngineError> {
        self.check_grid(grid)?;
        let linear = grid.index(voxel)?;
        Ok(self
            .entries
            .get(&linear)
            .map(|refs| refs.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Segments indexed under the voxel containing `point`.
    pub fn occupants_near(
        &self,
        grid: &VoxelGrid,
        point: &Point3<f64>,
    ) -> Result<Vec<PathRef>, EngineError> {
        let voxel = grid.voxel_of(point)?;
        self.at(grid, voxel)
    }

    /// Paths with at least one segment indexed under the voxel containing `point`.
    pub fn paths_near(
        &self,
        grid: &VoxelGrid,
        point: &Point3<f64>,
    ) -> Result<BTreeSet<PathId>, EngineError> {
        Ok(self
            .occupants_near(grid, point)?
            .into_iter()
            .map(|r| r.path)
            .collect())
    }

    /// Fraction of the voxels around `voxel` that are occupied by structure foreign to `path`.
    ///
    /// The window is the cube of `radius` voxels used by [`VoxelGrid::window`]. An occupied
    /// voxel counts unless one of `path`'s own segments is indexed under it.
    pub fn crowding(
        &self,
        grid: &VoxelGrid,
        voxel: VoxelIndex,
        radius: usize,
        path: PathId,
    ) -> Result<f64, EngineError> {
        self.check_grid(grid)?;
        let mut total = 0usize;
        let mut foreign = 0usize;
        for v in grid.window(voxel, radius)? {
            total += 1;
            if !grid.is_occupied(v)? {
                continue;
            }
            let own = self
                .entries
                .get(&grid.index(v)?)
                .is_some_and(|refs| refs.iter().any(|r| r.path == path));
            foreign += usize::from(!own);
        }
        Ok(foreign as f64 / total as f64)
    }
}

/// Clamped voxel range covering the box `[low, high]`, or `None` if it misses the grid.
fn voxel_window(
    grid: &VoxelGrid,
    low: &Point3<f64>,
    high: &Point3<f64>,
) -> Option<(VoxelIndex, VoxelIndex)> {
    let dims = grid.dims();
    let origin = grid.origin();
    let mut first = [0usize; 3];
    let mut last = [0usize; 3];
    for axis in 0..3 {
        let lo = ((low[axis] - origin[axis]) / grid.cell_size()).floor();
        let hi = ((high[axis] - origin[axis]) / grid.cell_size()).floor();
        if hi < 0.0 || lo >= dims[axis] as f64 || lo.is_nan() || hi.is_nan() {
            return None;
        }
        first[axis] = lo.max(0.0) as usize;
        last[axis] = (hi as usize).min(dims[axis] - 1);
    }
    Some((
        VoxelIndex::new(first[0], first[1], first[2]),
        VoxelIndex::new(last[0], last[1], last[2]),
    ))
}
