use super::config::GridConfig;
use super::error::EngineError;
use crate::core::models::atom::Atom;
use crate::core::utils::geometry::bounding_box;
use itertools::iproduct;
use nalgebra::{Point3, Vector3};
use tracing::debug;

/// Upper bound on the number of cells a single grid may hold.
pub const MAX_GRID_CELLS: usize = 1 << 26;

/// Integer coordinates of a cell in a [`VoxelGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelIndex {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl VoxelIndex {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// A regular grid over the occupied volume of a molecule.
///
/// Each atom is rasterized as a sphere: a voxel is occupied when its center lies within the
/// atom's radius of the atom center (inclusive). The grid also records which atoms occupy
/// each voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    origin: Point3<f64>,
    cell_size: f64,
    dims: [usize; 3],
    occupied: Vec<bool>,
    atoms: Vec<Vec<usize>>,
    occupied_count: usize,
}

impl VoxelGrid {
    /// Rasterizes `atoms` with the given resolution.
    ///
    /// Without an explicit origin the grid starts at the bounding-box minimum of the atom
    /// centers minus `margin`. Each axis spans up to the bounding-box maximum plus `margin`
    /// and holds at least one cell.
    pub fn build(atoms: &[Atom], config: &GridConfig) -> Result<Self, EngineError> {
        let (min, max) =
            bounding_box(atoms.iter().map(|a| &a.position)).ok_or(EngineError::EmptyStructure)?;
        if !(config.cell_size.is_finite() && config.cell_size > 0.0) {
            return Err(EngineError::Internal(format!(
                "voxel cell size must be positive, got {}",
                config.cell_size
            )));
        }
        let margin = Vector3::repeat(config.margin);
        let origin = config.origin.unwrap_or(min - margin);
        let extent = (max + margin) - origin;
        let dims = [0, 1, 2].map(|axis| cells_along(extent[axis], config.cell_size));

        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&total| total <= MAX_GRID_CELLS)
            .ok_or(EngineError::GridTooLarge {
                dims,
                limit: MAX_GRID_CELLS,
            })?;
        let mut grid = Self {
            origin,
            cell_size: config.cell_size,
            dims,
            occupied: vec![false; total],
            atoms: vec![Vec::new(); total],
            occupied_count: 0,
        };
        for (index, atom) in atoms.iter().enumerate() {
            grid.rasterize(index, atom);
        }
        grid.occupied_count = grid.occupied.iter().filter(|&&o| o).count();

        debug!(
            dims = ?grid.dims,
            cell_size = grid.cell_size,
            occupied = grid.occupied_count,
            "Voxel grid built."
        );
        Ok(grid)
    }

    fn rasterize(&mut self, index: usize, atom: &Atom) {
        let radius = atom.radius.max(0.0);
        let radius_sq = radius * radius;
        let low = atom.position.map(|c| c - radius);
        let high = atom.position.map(|c| c + radius);

        let mut range = [(0usize, 0usize); 3];
        for axis in 0..3 {
            let first = ((low[axis] - self.origin[axis]) / self.cell_size - 0.5).floor();
            let last = ((high[axis] - self.origin[axis]) / self.cell_size - 0.5).ceil();
            if last < 0.0 || first >= self.dims[axis] as f64 {
                return;
            }
            range[axis] = (
                first.max(0.0) as usize,
                (last as usize).min(self.dims[axis] - 1),
            );
        }

        for z in range[2].0..=range[2].1 {
            for y in range[1].0..=range[1].1 {
                for x in range[0].0..=range[0].1 {
                    let voxel = VoxelIndex::new(x, y, z);
                    if (self.center(voxel) - atom.position).norm_squared() <= radius_sq {
                        let linear = self.linear(voxel);
                        self.occupied[linear] = true;
                        self.atoms[linear].push(index);
                    }
                }
            }
        }
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Total number of voxels.
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied_count
    }

    pub fn contains(&self, voxel: VoxelIndex) -> bool {
        voxel.x < self.dims[0] && voxel.y < self.dims[1] && voxel.z < self.dims[2]
    }

    #[inline]
    fn linear(&self, voxel: VoxelIndex) -> usize {
        voxel.x + self.dims[0] * (voxel.y + self.dims[1] * voxel.z)
    }

    /// Row-major linear index of `voxel` (x fastest).
    pub fn index(&self, voxel: VoxelIndex) -> Result<usize, EngineError> {
        self.check(voxel)?;
        Ok(self.linear(voxel))
    }

    pub fn voxel_at(&self, linear: usize) -> Option<VoxelIndex> {
        if linear >= self.len() {
            return None;
        }
        let x = linear % self.dims[0];
        let rest = linear / self.dims[0];
        Some(VoxelIndex::new(x, rest % self.dims[1], rest / self.dims[1]))
    }

    /// The voxel containing `point`.
    pub fn voxel_of(&self, point: &Point3<f64>) -> Result<VoxelIndex, EngineError> {
        let out_of_bounds = || EngineError::OutOfBounds {
            x: point.x,
            y: point.y,
            z: point.z,
        };
        let mut coords = [0usize; 3];
        for axis in 0..3 {
            let cell = ((point[axis] - self.origin[axis]) / self.cell_size).floor();
            if !(cell >= 0.0 && cell < self.dims[axis] as f64) {
                return Err(out_of_bounds());
            }
            coords[axis] = cell as usize;
        }
        Ok(VoxelIndex::new(coords[0], coords[1], coords[2]))
    }

    /// Center of `voxel`; not bounds-checked.
    pub fn center(&self, voxel: VoxelIndex) -> Point3<f64> {
        let offset = Vector3::new(voxel.x as f64, voxel.y as f64, voxel.z as f64)
            .add_scalar(0.5)
            * self.cell_size;
        self.origin + offset
    }

    pub fn is_occupied(&self, voxel: VoxelIndex) -> Result<bool, EngineError> {
        self.index(voxel).map(|i| self.occupied[i])
    }

    /// Indices of the atoms whose spheres cover `voxel`.
    pub fn atoms_in(&self, voxel: VoxelIndex) -> Result<&[usize], EngineError> {
        self.index(voxel).map(|i| self.atoms[i].as_slice())
    }

    pub fn occupied_voxels(&self) -> impl Iterator<Item = VoxelIndex> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter(|(_, o)| **o)
            .filter_map(|(i, _)| self.voxel_at(i))
    }

    /// The up to 26 in-bounds voxels sharing a face, edge or corner with `voxel`, each with
    /// the number of axes along which it differs (1, 2 or 3).
    pub fn neighbors26(&self, voxel: VoxelIndex) -> impl Iterator<Item = (VoxelIndex, u8)> + '_ {
        (-1isize..=1)
            .flat_map(|dz| {
                (-1isize..=1).flat_map(move |dy| (-1isize..=1).map(move |dx| (dx, dy, dz)))
            })
            .filter(|&(dx, dy, dz)| (dx, dy, dz) != (0, 0, 0))
            .filter_map(move |(dx, dy, dz)| {
                let shifted = VoxelIndex::new(
                    voxel.x.checked_add_signed(dx)?,
                    voxel.y.checked_add_signed(dy)?,
                    voxel.z.checked_add_signed(dz)?,
                );
                let axes = [dx, dy, dz].iter().filter(|d| **d != 0).count() as u8;
                self.contains(shifted).then_some((shifted, axes))
            })
    }

    /// In-bounds voxels within `radius` cells of `voxel` along every axis, including `voxel`.
    pub fn window(
        &self,
        voxel: VoxelIndex,
        radius: usize,
    ) -> Result<impl Iterator<Item = VoxelIndex>, EngineError> {
        self.check(voxel)?;
        let span =
            |c: usize, dim: usize| c.saturating_sub(radius)..=c.saturating_add(radius).min(dim - 1);
        Ok(iproduct!(
            span(voxel.z, self.dims[2]),
            span(voxel.y, self.dims[1]),
            span(voxel.x, self.dims[0])
        )
        .map(|(z, y, x)| VoxelIndex::new(x, y, z)))
    }

    /// Occupied fraction of the voxels in [`window`](Self::window).
    pub fn local_density(&self, voxel: VoxelIndex, radius: usize) -> Result<f64, EngineError> {
        let (total, occupied) = self
            .window(voxel, radius)?
            .fold((0usize, 0usize), |(total, occupied), v| {
                (total + 1, occupied + usize::from(self.occupied[self.linear(v)]))
            });
        Ok(occupied as f64 / total as f64)
    }

    fn check(&self, voxel: VoxelIndex) -> Result<(), EngineError> {
        if self.contains(voxel) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds {
                x: voxel.x as f64,
                y: voxel.y as f64,
                z: voxel.z as f64,
            })
        }
    }
}

fn cells_along(extent: f64, cell_size: f64) -> usize {
    let cells = (extent / cell_size).ceil();
    if cells.is_finite() && cells >= 1.0 {
        cells as usize
    } else {
        1
    }
}
