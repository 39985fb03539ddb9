//! Hybrid particle/grid (MLS-MPM) simulation of liquid, jelly and snow.
//!
//! [`MpmSimulation`] owns all particle and grid storage. Each frame it runs a fixed number of
//! substeps and hands particle positions and colors to a [`FrameSink`], usually a renderer.
extern crate nalgebra as na;

pub mod execution;
pub mod frame;
pub mod initial_condition;
pub mod math;
pub mod mpm;
pub mod statistics;
pub mod util;

pub use execution::Execution;
pub use frame::{Frame, FrameSink, Vertex};
pub use initial_condition::{CubeVolume, InitialCondition, Preset, Volume};
pub use mpm::{
    ColorMode, ConstitutiveModel, FixedCorotated, Material, MpmParameters, MpmSimulation,
};
pub use statistics::SimulationStatistics;
