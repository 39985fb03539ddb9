use crate::math::{Mat, T, TV};
use serde::{Deserialize, Serialize};

/// Position given to unused particle slots, far outside both the domain and the grid.
pub const INACTIVE_POSITION: T = 533799.;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Liquid,
    Jelly,
    Snow,
}

impl Material {
    pub const ALL: [Material; 3] = [Material::Liquid, Material::Jelly, Material::Snow];
}

/// Everything the solver tracks for a single material point.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: TV,
    pub velocity: TV,
    /// APIC affine velocity matrix, `C`.
    pub affine_velocity: Mat,
    /// Elastic deformation gradient, `F`.
    pub deformation_gradient: Mat,
    /// Accumulated plastic volume change, `Jp`. Always positive.
    pub plastic_ratio: T,
    pub material: Material,
    pub active: bool,
    /// Per-particle color used when rendering with random colors.
    pub random_color: [f32; 4],
}

impl Particle {
    /// A particle at rest, with no deformation history.
    pub fn new(position: TV, material: Material) -> Self {
        Particle {
            position,
            velocity: TV::zeros(),
            affine_velocity: Mat::zeros(),
            deformation_gradient: Mat::identity(),
            plastic_ratio: 1.,
            material,
            active: true,
            random_color: [1.; 4],
        }
    }

    /// An unused slot. It is skipped by every transfer and parked at `INACTIVE_POSITION`.
    pub fn inactive() -> Self {
        Particle {
            active: false,
            ..Particle::new(TV::from_element(INACTIVE_POSITION), Material::Liquid)
        }
    }
}

/// Contains all of the particle data: position, velocity, deformation, etc.
#[derive(Debug, Clone, Default)]
pub struct MpmParticles {
    pub list: Vec<Particle>,
}

impl MpmParticles {
    /// Creates `num_particles` inactive slots.
    pub fn with_capacity(num_particles: usize) -> Self {
        MpmParticles {
            list: vec![Particle::inactive(); num_particles],
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Marks every slot unused.
    pub fn deactivate_all(&mut self) {
        self.list.fill(Particle::inactive());
    }

    pub fn active(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.list.iter().filter(|p| p.active)
    }

    pub fn num_active(&self) -> usize {
        self.active().count()
    }

    pub fn total_mass(&self, particle_mass: T) -> T {
        particle_mass * self.num_active() as T
    }

    pub fn total_momentum(&self, particle_mass: T) -> TV {
        self.active().map(|p| particle_mass * p.velocity).sum()
    }
}
