//! The three transfer phases of an MLS-MPM substep. Each phase finishes completely before the
//! next one starts; within a phase, particles (or nodes) are independent.
use super::grid::{MpmGrid, ParticleGridWeights};
use super::models::{update_deformation, ConstitutiveModel};
use super::parameters::MpmParameters;
use super::particles::MpmParticles;
use crate::math::{outer, Mat, T, TV};

/// APIC particle to grid transfer. Advances every active particle's deformation gradient and
/// plastic ratio, then scatters mass and momentum (including the stress contribution) onto the
/// 3x3x3 neighborhood of nodes around it.
///
/// Returns the number of particles that had to be reset because their deformation broke down.
pub fn particle_to_grid<CM: ConstitutiveModel>(
    particles: &mut MpmParticles,
    grid: &mut MpmGrid,
    model: &CM,
    params: &MpmParameters,
) -> usize {
    let execution = params.execution;
    let delta_time = params.delta_time;
    let particle_mass = params.particle_mass();
    let stress_scale = params.stress_scale();
    let isotropic = &params.isotropic;

    // affine[p] = stress term + m C, the momentum each particle spreads over its stencil
    let updates: Vec<Option<(Mat, bool)>> = execution.map_mut(&mut particles.list, |_, p| {
        if !p.active {
            return None;
        }
        let candidate =
            (Mat::identity() + delta_time * p.affine_velocity) * p.deformation_gradient;
        let update = update_deformation(
            model,
            isotropic,
            p.material,
            &candidate,
            p.plastic_ratio,
            stress_scale,
        );
        p.deformation_gradient = update.deformation_gradient;
        p.plastic_ratio = update.plastic_ratio;

        Some((
            update.stress + particle_mass * p.affine_velocity,
            update.degenerate,
        ))
    });

    let list = &particles.list;
    execution.scatter(list.len(), grid, |grid, i| {
        let (affine, _) = match updates[i] {
            Some(update) => update,
            None => return,
        };
        let p = &list[i];
        let weights = ParticleGridWeights::new(&p.position, &grid.data);
        let momentum = particle_mass * p.velocity;

        for node in weights.stencil() {
            let idx = match grid.data.node_index(node.coord) {
                Some(idx) => idx,
                None => continue,
            };
            grid.velocity[idx] += node.weight * (momentum + affine * node.dpos);
            grid.mass[idx] += node.weight * particle_mass;
        }
    });

    updates
        .iter()
        .filter(|u| matches!(u, Some((_, true))))
        .count()
}

/// Converts momentum to velocity, applies gravity and removes outward velocity at the walls.
pub fn grid_update(grid: &mut MpmGrid, params: &MpmParameters) {
    grid.normalize_and_force(&params.gravity, params.delta_time, params.execution);
    grid.enforce_boundary(params.boundary_width, params.execution);
}

/// APIC grid to particle transfer. Gathers velocity and the affine velocity matrix from the
/// stencil and advects every active particle.
pub fn grid_to_particle(particles: &mut MpmParticles, grid: &MpmGrid, params: &MpmParameters) {
    let delta_time = params.delta_time;
    let dx = grid.data.dx;
    let apic_scale: T = 4. / (dx * dx);

    params.execution.for_each_mut(&mut particles.list, |_, p| {
        if !p.active {
            return;
        }
        let weights = ParticleGridWeights::new(&p.position, &grid.data);

        let mut velocity = TV::zeros();
        let mut affine_velocity = Mat::zeros();
        for node in weights.stencil() {
            let grid_velocity = match grid.data.node_index(node.coord) {
                Some(idx) => grid.velocity[idx],
                None => continue,
            };
            velocity += node.weight * grid_velocity;
            affine_velocity += apic_scale * node.weight * outer(&grid_velocity, &node.dpos);
        }

        p.velocity = velocity;
        p.affine_velocity = affine_velocity;
        p.position += delta_time * velocity;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Execution;
    use crate::mpm::{Material, Particle};

    fn params() -> MpmParameters {
        MpmParameters {
            n_grid: 16,
            execution: Execution::Serial,
            ..MpmParameters::default()
        }
    }

    fn particles(positions: &[TV], material: Material) -> MpmParticles {
        let mut particles = MpmParticles::with_capacity(positions.len() + 1);
        for (slot, &x) in particles.list.iter_mut().zip(positions) {
            *slot = Particle::new(x, material);
        }
        particles
    }

    #[test]
    fn scatter_conserves_mass_and_momentum() {
        let params = params();
        let mut particles = particles(
            &[
                TV::new(0.3, 0.4, 0.5),
                TV::new(0.31, 0.42, 0.5),
                TV::new(0.7, 0.2, 0.6),
            ],
            Material::Jelly,
        );
        particles.list[0].velocity = TV::new(1., 0., -1.);
        particles.list[2].velocity = TV::new(0., 2., 0.);
        let mut grid = MpmGrid::new(params.n_grid);

        particle_to_grid(&mut particles, &mut grid, &crate::mpm::FixedCorotated, &params);

        let m = params.particle_mass();
        assert!((grid.total_mass() - 3. * m).abs() < 1e-15);
        // the stencil's first moment vanishes, so neither C nor stress changes total momentum
        let momentum: TV = grid.velocity.iter().sum();
        assert!((momentum - m * TV::new(1., 2., -1.)).norm() < 1e-15);
    }

    #[test]
    fn inactive_particles_are_not_transferred() {
        let params = params();
        let mut particles = MpmParticles::with_capacity(5);
        let mut grid = MpmGrid::new(params.n_grid);

        let reset = particle_to_grid(&mut particles, &mut grid, &crate::mpm::FixedCorotated, &params);
        grid_update(&mut grid, &params);
        grid_to_particle(&mut particles, &grid, &params);

        assert_eq!(reset, 0);
        assert_eq!(grid.total_mass(), 0.);
        assert_eq!(particles.list, MpmParticles::with_capacity(5).list);
    }

    #[test]
    fn uniform_grid_velocity_is_picked_up_without_shear() {
        let params = params();
        let mut particles = particles(&[TV::new(0.52, 0.47, 0.5)], Material::Liquid);
        let mut grid = MpmGrid::new(params.n_grid);
        grid.velocity.iter_mut().for_each(|v| *v = TV::new(0.5, -0.25, 1.));

        grid_to_particle(&mut particles, &grid, &params);

        let p = &particles.list[0];
        assert!((p.velocity - TV::new(0.5, -0.25, 1.)).norm() < 1e-12);
        assert!(p.affine_velocity.norm() < 1e-9);
        let expected = TV::new(0.52, 0.47, 0.5) + params.delta_time * TV::new(0.5, -0.25, 1.);
        assert!((p.position - expected).norm() < 1e-12);
    }

    #[test]
    fn linear_grid_velocity_is_reconstructed_into_c() {
        let params = params();
        let mut particles = particles(&[TV::new(0.5, 0.5, 0.5)], Material::Jelly);
        let mut grid = MpmGrid::new(params.n_grid);

        // v(x) = G x, which APIC with quadratic splines recovers exactly
        let gradient = Mat::new(0.1, 0.2, 0., 0., -0.3, 0.4, 0.5, 0., 0.);
        for i in 0..grid.data.num_cells {
            let x = grid.data.index_to_coord(i).cast::<T>() * grid.data.dx;
            grid.velocity[i] = gradient * x;
        }

        grid_to_particle(&mut particles, &grid, &params);

        let p = &particles.list[0];
        assert!((p.affine_velocity - gradient).norm() < 1e-9);
        assert!((p.velocity - gradient * TV::new(0.5, 0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn particles_near_the_edge_skip_missing_nodes() {
        let params = params();
        let mut particles = particles(&[TV::new(0.01, 0.5, 0.99)], Material::Snow);
        let mut grid = MpmGrid::new(params.n_grid);

        particle_to_grid(&mut particles, &mut grid, &crate::mpm::FixedCorotated, &params);

        assert!(grid.total_mass() > 0.);
        assert!(grid.total_mass() < params.particle_mass());
    }
}
