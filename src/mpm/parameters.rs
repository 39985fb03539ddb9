use super::models::IsotropicParameters;
use super::particles::Material;
use crate::execution::Execution;
use crate::math::{T, TV};
use eyre::{ensure, WrapErr};
use serde::{Deserialize, Serialize};

/// Base RGBA color of each material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialColors {
    pub liquid: [f32; 4],
    pub jelly: [f32; 4],
    pub snow: [f32; 4],
}

impl MaterialColors {
    pub fn get(&self, material: Material) -> [f32; 4] {
        match material {
            Material::Liquid => self.liquid,
            Material::Jelly => self.jelly,
            Material::Snow => self.snow,
        }
    }
}

impl Default for MaterialColors {
    fn default() -> Self {
        MaterialColors {
            liquid: [0.1, 0.6, 0.9, 0.2],
            jelly: [0.93, 0.33, 0.23, 1.0],
            snow: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Which color each particle is handed to the renderer with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Material,
    Random,
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Material
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpmParameters {
    /// The number of grid nodes along each axis of the unit cube. Also fixes the particle count.
    pub n_grid: usize,
    /// How many substeps are taken for every frame handed to the renderer
    pub substeps_per_frame: usize,
    /// The size of the time step. Larger time steps will simulate faster, but may be unstable or
    /// innaccurate.
    pub delta_time: T,
    pub gravity: TV,
    /// Number of nodes along each face where outward velocities are removed.
    pub boundary_width: usize,
    /// Rest density of every material.
    pub density: T,
    pub isotropic: IsotropicParameters,
    pub material_colors: MaterialColors,
    pub color_mode: ColorMode,
    /// Point radius handed to the renderer
    pub particle_radius: f32,
    /// The number of frames produced by `MpmSimulation::run`
    pub num_frames: usize,
    /// Seed for the particle placement
    pub seed: u64,
    pub execution: Execution,
}

impl Default for MpmParameters {
    fn default() -> Self {
        MpmParameters {
            n_grid: 64,
            substeps_per_frame: 25,
            delta_time: 2e-4,
            gravity: TV::new(0., -9.8, 0.),
            boundary_width: 3,
            density: 1.,
            isotropic: IsotropicParameters::default(),
            material_colors: MaterialColors::default(),
            color_mode: ColorMode::default(),
            particle_radius: 0.01,
            num_frames: 250,
            seed: 0,
            execution: Execution::default(),
        }
    }
}

impl MpmParameters {
    /// Reads parameters from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let mut params: MpmParameters =
            serde_json::from_str(json).wrap_err("Serde failed to deserialize MPM parameters.")?;
        params.isotropic.recalculate_lame_parameters();
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(
            self.n_grid >= 2 * self.boundary_width + 3,
            "Grid of {} nodes is too small for a boundary of width {}",
            self.n_grid,
            self.boundary_width
        );
        ensure!(
            self.delta_time.is_finite() && self.delta_time > 0.,
            "Time step must be positive, got {}",
            self.delta_time
        );
        ensure!(
            self.density.is_finite() && self.density > 0.,
            "Density must be positive, got {}",
            self.density
        );
        ensure!(
            self.gravity.iter().all(|g| g.is_finite()),
            "Gravity must be finite, got {:?}",
            self.gravity
        );
        let iso = &self.isotropic;
        ensure!(
            iso.youngs_modulus.is_finite() && iso.youngs_modulus > 0.,
            "Young's modulus must be positive, got {}",
            iso.youngs_modulus
        );
        ensure!(
            iso.poissons_ratio > -1. && iso.poissons_ratio < 0.5,
            "Poisson's ratio must be in (-1, 0.5), got {}",
            iso.poissons_ratio
        );
        Ok(())
    }

    /// The grid spacing
    pub fn dx(&self) -> T {
        1. / self.n_grid as T
    }

    /// Fixed particle budget, `n_grid^3 / 4`.
    pub fn num_particles(&self) -> usize {
        self.n_grid.pow(3) / 4
    }

    pub fn particle_volume(&self) -> T {
        let half_dx = 0.5 * self.dx();
        half_dx * half_dx
    }

    pub fn particle_mass(&self) -> T {
        self.particle_volume() * self.density
    }

    /// Converts Kirchhoff stress into the momentum it adds to the grid over one substep.
    pub fn stress_scale(&self) -> T {
        let dx = self.dx();
        -self.delta_time * self.particle_volume() * 4. / (dx * dx)
    }
}
