use crate::math::{T, TV};
use crate::mpm::{MpmParticles, Material, Particle};
use crate::util::RangeExt;
use eyre::{ensure, WrapErr};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A region of space that can be filled with particles.
pub trait InitialCondition {
    /// The amount of space the region occupies, used to share out the particle budget.
    fn volume(&self) -> T;

    fn material(&self) -> Material;

    /// Checks the region can be seeded.
    fn validate(&self) -> eyre::Result<()>;

    /// Places every particle of `particles` uniformly at random inside the region.
    fn add_particles(&self, particles: &mut [Particle], rng: &mut StdRng);
}

/// An axis aligned box of a single material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeVolume {
    pub minimum: TV,
    pub size: TV,
    pub material: Material,
}

impl CubeVolume {
    pub fn new(minimum: TV, size: TV, material: Material) -> Self {
        CubeVolume {
            minimum,
            size,
            material,
        }
    }

    pub fn bounds(&self) -> Range<TV> {
        self.minimum..self.minimum + self.size
    }
}

impl InitialCondition for CubeVolume {
    fn volume(&self) -> T {
        self.size.iter().product()
    }

    fn material(&self) -> Material {
        self.material
    }

    fn validate(&self) -> eyre::Result<()> {
        ensure!(
            self.minimum.iter().all(|x| x.is_finite()),
            "Cube corner must be finite, got {:?}",
            self.minimum
        );
        ensure!(
            self.size.iter().all(|x| x.is_finite() && *x > 0.),
            "Cube size must be positive, got {:?}",
            self.size
        );
        Ok(())
    }

    fn add_particles(&self, particles: &mut [Particle], rng: &mut StdRng) {
        for particle in particles {
            let rand: TV = rng.gen::<[T; 3]>().into();
            let position = rand.component_mul(&self.size) + self.minimum;

            *particle = Particle {
                random_color: rng.gen(),
                ..Particle::new(position, self.material)
            };
        }
    }
}

/// Every supported volume shape. Presets name the shape with a `"shape"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Volume {
    Cube(CubeVolume),
}

impl Volume {
    pub fn cube(minimum: TV, size: TV, material: Material) -> Self {
        Volume::Cube(CubeVolume::new(minimum, size, material))
    }

    /// World space bounding box of the volume.
    pub fn bounds(&self) -> Range<TV> {
        match self {
            Volume::Cube(cube) => cube.bounds(),
        }
    }

    pub fn contains_point(&self, x: &TV) -> bool {
        self.bounds().contains_point(x)
    }

    fn inner(&self) -> &dyn InitialCondition {
        match self {
            Volume::Cube(cube) => cube,
        }
    }
}

impl InitialCondition for Volume {
    fn volume(&self) -> T {
        self.inner().volume()
    }

    fn material(&self) -> Material {
        self.inner().material()
    }

    fn validate(&self) -> eyre::Result<()> {
        self.inner().validate()
    }

    fn add_particles(&self, particles: &mut [Particle], rng: &mut StdRng) {
        self.inner().add_particles(particles, rng)
    }
}

/// A named list of volumes the simulation starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub volumes: Vec<Volume>,
}

impl Preset {
    pub fn single_dam_break() -> Self {
        Preset {
            name: "Single Dam Break".into(),
            volumes: vec![Volume::cube(
                TV::new(0.55, 0.05, 0.55),
                TV::from_element(0.4),
                Material::Liquid,
            )],
        }
    }

    pub fn double_dam_break() -> Self {
        let size = TV::new(0.3, 0.4, 0.3);
        Preset {
            name: "Double Dam Break".into(),
            volumes: vec![
                Volume::cube(TV::from_element(0.05), size, Material::Liquid),
                Volume::cube(TV::new(0.65, 0.05, 0.65), size, Material::Liquid),
            ],
        }
    }

    pub fn water_snow_jelly() -> Self {
        let size = TV::from_element(0.25);
        Preset {
            name: "Water Snow Jelly".into(),
            volumes: vec![
                Volume::cube(TV::new(0.6, 0.05, 0.6), size, Material::Liquid),
                Volume::cube(TV::from_element(0.35), size, Material::Snow),
                Volume::cube(TV::new(0.05, 0.6, 0.05), size, Material::Jelly),
            ],
        }
    }

    pub fn builtin() -> Vec<Preset> {
        vec![
            Preset::single_dam_break(),
            Preset::double_dam_break(),
            Preset::water_snow_jelly(),
        ]
    }

    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let preset: Preset =
            serde_json::from_str(json).wrap_err("Serde failed to deserialize preset.")?;
        preset.validate()?;
        Ok(preset)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        for (i, volume) in self.volumes.iter().enumerate() {
            volume
                .validate()
                .wrap_err_with(|| format!("Volume {} of preset {:?} is invalid", i, self.name))?;
        }
        Ok(())
    }

    /// The smallest box containing every volume of the preset.
    pub fn bounds(&self) -> Option<Range<TV>> {
        self.volumes
            .iter()
            .map(Volume::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

/// Shares out the particle budget between `volumes` in proportion to their size.
///
/// Every volume but the last gets `round(volume / total * n)` particles, the last one takes
/// whatever is left, so the counts always add up to `n` exactly.
pub fn allocate_particles(volumes: &[Volume], n: usize) -> Vec<usize> {
    let total_volume: T = volumes.iter().map(|v| v.volume()).sum();

    let mut next = 0;
    volumes
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let count = if i == volumes.len() - 1 {
                n - next
            } else {
                ((v.volume() / total_volume * n as T).round() as usize).min(n - next)
            };
            next += count;
            count
        })
        .collect()
}

/// Resets every particle slot and fills consecutive runs of slots from each volume. Returns how
/// many particles each volume received.
pub fn init_volumes(
    volumes: &[Volume],
    particles: &mut MpmParticles,
    rng: &mut StdRng,
) -> eyre::Result<Vec<usize>> {
    for volume in volumes {
        volume.validate()?;
    }

    particles.deactivate_all();

    let counts = allocate_particles(volumes, particles.len());
    let mut next = 0;
    for (volume, &count) in volumes.iter().zip(&counts) {
        volume.add_particles(&mut particles.list[next..next + count], rng);
        next += count;
    }

    Ok(counts)
}
