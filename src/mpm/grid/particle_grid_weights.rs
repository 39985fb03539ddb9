use super::data::GridData;
use crate::math::{IV, T, TV};
use itertools::iproduct;

/// Quadratic B-spline interpolation weights between one particle and the 3x3x3 block of grid
/// nodes around it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleGridWeights {
    /// Lowest node of the stencil.
    pub base: IV,
    /// Particle position relative to `base`, in grid units. Each component is in `[0.5, 1.5)`.
    pub fx: TV,
    /// `w[k][axis]` is the weight of the node at offset `k` along `axis`.
    pub w: [TV; 3],
    dx: T,
}

/// One node of a particle's stencil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilNode {
    pub coord: IV,
    pub weight: T,
    /// World-space offset from the particle to the node.
    pub dpos: TV,
}

impl ParticleGridWeights {
    pub fn new(position: &TV, grid: &GridData) -> Self {
        let grid_space_pos = position * grid.one_over_dx;
        let base = grid_space_pos.map(|x| (x - 0.5).floor() as isize);
        let fx = grid_space_pos - base.cast::<T>();

        ParticleGridWeights {
            base,
            fx,
            w: [
                fx.map(|x| 0.5 * (1.5 - x) * (1.5 - x)),
                fx.map(|x| 0.75 - (x - 1.) * (x - 1.)),
                fx.map(|x| 0.5 * (x - 0.5) * (x - 0.5)),
            ],
            dx: grid.dx,
        }
    }

    /// Iterates over all 27 nodes of the stencil, including ones that fall outside the grid.
    pub fn stencil(&self) -> impl Iterator<Item = StencilNode> + '_ {
        iproduct!(0..3usize, 0..3usize, 0..3usize).map(move |(i, j, k)| {
            let offset = IV::new(i as isize, j as isize, k as isize);
            StencilNode {
                coord: self.base + offset,
                weight: self.w[i].x * self.w[j].y * self.w[k].z,
                dpos: (offset.cast::<T>() - self.fx) * self.dx,
            }
        })
    }
}
