use crate::math::{T, TV};
use crate::mpm::MpmSimulation;

/// Conserved (or nearly conserved) quantities, useful for sanity checking a run.
pub trait SimulationStatistics {
    fn total_time(&self) -> T;
    fn total_mass(&self) -> T;
    fn total_linear_momentum(&self) -> TV;
    fn total_angular_momentum(&self) -> TV;
    /// Kinetic energy
    fn total_energy(&self) -> T;
    fn total_volume(&self) -> T;
}

impl<CM> SimulationStatistics for MpmSimulation<CM> {
    fn total_time(&self) -> T {
        self.time
    }

    fn total_mass(&self) -> T {
        self.particles.total_mass(self.params.particle_mass())
    }

    fn total_linear_momentum(&self) -> TV {
        self.particles.total_momentum(self.params.particle_mass())
    }

    fn total_angular_momentum(&self) -> TV {
        let m = self.params.particle_mass();
        self.particles
            .active()
            .map(|p| m * p.position.cross(&p.velocity))
            .sum()
    }

    fn total_energy(&self) -> T {
        let m = self.params.particle_mass();
        self.particles
            .active()
            .map(|p| 0.5 * m * p.velocity.dot(&p.velocity))
            .sum()
    }

    fn total_volume(&self) -> T {
        #![allow(non_snake_case)]
        let V0 = self.params.particle_volume();
        self.particles
            .active()
            .map(|p| p.deformation_gradient.determinant() * V0)
            .sum()
    }
}
