pub mod data;
pub mod particle_grid_weights;

pub use data::GridData;
pub use particle_grid_weights::{ParticleGridWeights, StencilNode};

use crate::execution::{Accumulator, Execution};
use crate::math::{T, TV};

/// Stores the grid data for the Mpm Simulation. Holds no state between substeps: it is zeroed,
/// filled by the particle-to-grid transfer, updated once, and read by the grid-to-particle
/// transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct MpmGrid {
    /// Momentum during the particle-to-grid transfer, velocity after `normalize_and_force`.
    pub velocity: Vec<TV>,
    pub mass: Vec<T>,
    pub data: GridData,
}

impl MpmGrid {
    pub fn new(n_grid: usize) -> Self {
        let data = GridData::new(n_grid);

        Self {
            velocity: vec![TV::zeros(); data.num_cells],
            mass: vec![0.; data.num_cells],
            data,
        }
    }

    /// Fills each of the arrays in the grid with zeros.
    pub fn clear_grid(&mut self, execution: Execution) {
        execution.for_each_mut(&mut self.velocity, |_, v| *v = TV::zeros());
        execution.for_each_mut(&mut self.mass, |_, m| *m = 0.);
    }

    pub fn total_mass(&self) -> T {
        self.mass.iter().sum()
    }

    /// Turns accumulated momentum into velocity on every node with mass, then applies
    /// `delta_time * gravity` to every node, massless or not.
    pub fn normalize_and_force(&mut self, gravity: &TV, delta_time: T, execution: Execution) {
        let mass = &self.mass;
        let dv = delta_time * gravity;
        execution.for_each_mut(&mut self.velocity, |i, v| {
            if mass[i] > 0. {
                *v /= mass[i];
            }
            *v += dv;
        });
    }

    /// Zeroes any velocity component that points out of the domain on nodes within
    /// `boundary_width` of a face.
    pub fn enforce_boundary(&mut self, boundary_width: usize, execution: Execution) {
        let data = &self.data;
        let lower = boundary_width as isize;
        let upper = data.n_grid as isize - boundary_width as isize;
        execution.for_each_mut(&mut self.velocity, |i, v| {
            let coord = data.index_to_coord(i);
            for axis in 0..3 {
                if (coord[axis] < lower && v[axis] < 0.) || (coord[axis] > upper && v[axis] > 0.) {
                    v[axis] = 0.;
                }
            }
        });
    }
}

impl Accumulator for MpmGrid {
    fn empty_like(&self) -> Self {
        MpmGrid::new(self.data.n_grid)
    }

    fn merge(&mut self, other: &Self) {
        self.velocity
            .iter_mut()
            .zip(&other.velocity)
            .for_each(|(a, b)| *a += b);
        self.mass
            .iter_mut()
            .zip(&other.mass)
            .for_each(|(a, b)| *a += b);
    }
}
