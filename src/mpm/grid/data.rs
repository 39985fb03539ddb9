use crate::math::{IV, T};

/// Stores the metadata associated with the `MpmGrid`. The grid always spans the unit cube with
/// `n_grid` nodes along each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    /// The total number of nodes in the grid
    pub num_cells: usize,
    /// The number of nodes in each direction
    pub n_grid: usize,
    /// The grid spacing
    pub dx: T,
    /// Reciprocal of the grid spacing, for efficient computation
    pub one_over_dx: T,
}

impl GridData {
    pub fn new(n_grid: usize) -> GridData {
        GridData {
            num_cells: n_grid * n_grid * n_grid,
            n_grid,
            dx: 1. / n_grid as T,
            one_over_dx: n_grid as T,
        }
    }

    pub fn coord_to_index(&self, i: IV) -> usize {
        let n = self.n_grid as isize;
        (i.x + n * i.y + n * n * i.z) as usize
    }

    pub fn index_to_coord(&self, mut i: usize) -> IV {
        let n = self.n_grid;
        let z = i / (n * n);
        i -= z * n * n;
        let y = i / n;
        let x = i % n;
        IV::new(x as isize, y as isize, z as isize)
    }

    pub fn coord_in_grid(&self, coord: IV) -> bool {
        coord.iter().all(|&c| c >= 0 && (c as usize) < self.n_grid)
    }

    /// The flat index of `coord`, or `None` if it lies outside the grid.
    pub fn node_index(&self, coord: IV) -> Option<usize> {
        if self.coord_in_grid(coord) {
            Some(self.coord_to_index(coord))
        } else {
            None
        }
    }
}
