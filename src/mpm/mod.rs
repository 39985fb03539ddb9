pub mod algo;
pub mod grid;
pub mod models;
pub mod parameters;
pub mod particles;

pub use grid::MpmGrid;
pub use models::{ConstitutiveModel, FixedCorotated, IsotropicParameters};
pub use parameters::{ColorMode, MaterialColors, MpmParameters};
pub use particles::{Material, MpmParticles, Particle, INACTIVE_POSITION};

use crate::frame::{Frame, FrameSink};
use crate::initial_condition::{init_volumes, InitialCondition, Preset};
use crate::math::T;
use crate::statistics::SimulationStatistics;
use rand::{rngs::StdRng, SeedableRng};

/// Contains all of the state for the Material Point Method Simulation
pub struct MpmSimulation<CM = FixedCorotated> {
    pub particles: MpmParticles,
    pub grid: MpmGrid,
    pub params: MpmParameters,
    pub constitutive_model: CM,
    pub preset: Preset,
    /// Simulated time since the last reset
    pub time: T,
    /// Number of frames produced since the last reset
    pub frame: usize,
}

impl MpmSimulation<FixedCorotated> {
    /// Creates a new simulation with the given parameters and seeds it from `preset`.
    pub fn new(params: MpmParameters, preset: Preset) -> eyre::Result<Self> {
        Self::with_model(params, preset, FixedCorotated)
    }
}

impl<CM: ConstitutiveModel> MpmSimulation<CM> {
    pub fn with_model(
        params: MpmParameters,
        preset: Preset,
        constitutive_model: CM,
    ) -> eyre::Result<Self> {
        params.validate()?;
        preset.validate()?;

        tracing::info!(
            n_grid = params.n_grid,
            num_cells = params.n_grid.pow(3),
            num_particles = params.num_particles(),
            "Creating MPM simulation"
        );

        let mut simulation = MpmSimulation {
            particles: MpmParticles::with_capacity(params.num_particles()),
            grid: MpmGrid::new(params.n_grid),
            params,
            constitutive_model,
            preset,
            time: 0.,
            frame: 0,
        };
        simulation.reset()?;
        Ok(simulation)
    }

    /// Reseeds every particle from the current preset and rewinds the clock.
    pub fn reset(&mut self) -> eyre::Result<()> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let counts = init_volumes(&self.preset.volumes, &mut self.particles, &mut rng)?;

        for (volume, count) in self.preset.volumes.iter().zip(&counts) {
            tracing::info!(
                preset = %self.preset.name,
                material = ?volume.material(),
                count,
                "Seeded volume"
            );
        }

        self.time = 0.;
        self.frame = 0;
        Ok(())
    }

    /// Switches to a different preset and reseeds.
    pub fn set_preset(&mut self, preset: Preset) -> eyre::Result<()> {
        preset.validate()?;
        self.preset = preset;
        self.reset()
    }

    /// Advances the simulation by one time step: grid reset, particle to grid, grid update,
    /// grid to particle.
    pub fn substep(&mut self) {
        self.grid.clear_grid(self.params.execution);

        let reset = algo::particle_to_grid(
            &mut self.particles,
            &mut self.grid,
            &self.constitutive_model,
            &self.params,
        );
        if reset > 0 {
            tracing::warn!(
                count = reset,
                time = self.time,
                "Reset degenerate particles to their rest state"
            );
        }

        algo::grid_update(&mut self.grid, &self.params);
        algo::grid_to_particle(&mut self.particles, &self.grid, &self.params);

        self.time += self.params.delta_time;
        tracing::trace!(time = self.time, "Finished substep");
    }

    /// Runs `substeps_per_frame` substeps and returns the particles as a renderable `Frame`.
    pub fn simulate_frame(&mut self) -> Frame {
        let span = tracing::debug_span!("frame", frame = self.frame);
        let _enter = span.enter();

        for _ in 0..self.params.substeps_per_frame {
            self.substep();
        }
        self.frame += 1;

        tracing::debug!(
            total_mass = self.total_mass(),
            kinetic_energy = self.total_energy(),
            momentum = ?self.total_linear_momentum(),
            "Finished frame"
        );

        self.create_frame()
    }

    /// Simulates `num_frames` frames, handing each one to `sink`.
    pub fn run<S: FrameSink>(&mut self, sink: &mut S) -> eyre::Result<()> {
        for _ in 0..self.params.num_frames {
            let index = self.frame;
            let frame = self.simulate_frame();
            sink.consume(index, &frame)?;
        }
        Ok(())
    }

    /// Snapshot of the current particle positions and colors, without advancing the simulation.
    pub fn create_frame(&self) -> Frame {
        let colors = &self.params.material_colors;
        let color_mode = self.params.color_mode;

        Frame {
            positions: self
                .particles
                .list
                .iter()
                .map(|p| {
                    let x = p.position.cast::<f32>();
                    [x.x, x.y, x.z]
                })
                .collect(),
            colors: self
                .particles
                .list
                .iter()
                .map(|p| match color_mode {
                    ColorMode::Material => colors.get(p.material),
                    ColorMode::Random => p.random_color,
                })
                .collect(),
            radius: self.params.particle_radius,
        }
    }
}
