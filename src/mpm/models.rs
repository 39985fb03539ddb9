use super::particles::Material;
use crate::math::{self, Mat, Svd3, T, TV};
use serde::{Deserialize, Serialize};

/// How strongly compression (Jp < 1) stiffens a material.
const HARDENING_COEFFICIENT: T = 10.;
/// Jelly ignores its compression history and uses this fixed hardening factor instead.
const JELLY_HARDENING: T = 0.3;
/// Snow singular values are clamped to `[1 - SNOW_CRITICAL_COMPRESSION, 1 + SNOW_CRITICAL_STRETCH]`.
const SNOW_CRITICAL_COMPRESSION: T = 2.5e-2;
const SNOW_CRITICAL_STRETCH: T = 4.5e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotropicParameters {
    pub youngs_modulus: T,
    pub poissons_ratio: T,
    #[serde(skip)]
    pub mu: T,
    #[serde(skip)]
    pub lambda: T,
}

impl IsotropicParameters {
    pub fn new(youngs_modulus: T, poissons_ratio: T) -> Self {
        let mut base = Self {
            youngs_modulus,
            poissons_ratio,
            mu: 0.,
            lambda: 0.,
        };
        base.recalculate_lame_parameters();
        base
    }

    pub fn recalculate_lame_parameters(&mut self) {
        self.mu = self.youngs_modulus / (2. * (1. + self.poissons_ratio));
        self.lambda = self.youngs_modulus * self.poissons_ratio
            / ((1. + self.poissons_ratio) * (1. - 2. * self.poissons_ratio));
    }
}

impl Default for IsotropicParameters {
    fn default() -> Self {
        Self::new(1000., 0.2)
    }
}

/// Trait that describes the elastic response of a material, given the result of the plasticity
/// step. Implementations return the Kirchhoff stress `P * F^T`.
pub trait ConstitutiveModel: Send + Sync {
    #[allow(non_snake_case)]
    fn kirchhoff_stress(&self, F: &Mat, svd: &Svd3, J: T, mu: T, lambda: T) -> Mat;
}

/// Fixed corotated elasticity: `2 mu (F - R) F^T + lambda J (J - 1) I`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedCorotated;

impl ConstitutiveModel for FixedCorotated {
    #[allow(non_snake_case)]
    fn kirchhoff_stress(&self, F: &Mat, svd: &Svd3, J: T, mu: T, lambda: T) -> Mat {
        let R = svd.rotation();
        2. * mu * (F - R) * F.transpose() + Mat::from_diagonal_element(lambda * J * (J - 1.))
    }
}

/// Result of advancing one particle's deformation state by a time step.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformationUpdate {
    pub deformation_gradient: Mat,
    pub plastic_ratio: T,
    /// Stress already scaled into a momentum contribution for the grid transfer.
    pub stress: Mat,
    /// The decomposition broke down and the particle was reset to its rest state.
    pub degenerate: bool,
}

impl DeformationUpdate {
    fn rest() -> Self {
        DeformationUpdate {
            deformation_gradient: Mat::identity(),
            plastic_ratio: 1.,
            stress: Mat::zeros(),
            degenerate: true,
        }
    }
}

impl Material {
    /// Scale applied to the Lamé parameters. Compressed material (Jp < 1) gets stiffer.
    pub fn hardening(self, plastic_ratio: T) -> T {
        match self {
            Material::Jelly => JELLY_HARDENING,
            Material::Liquid | Material::Snow => {
                (HARDENING_COEFFICIENT * (1. - plastic_ratio)).exp()
            }
        }
    }

    /// Returns the singular value range outside of which the material yields plastically.
    pub fn yield_bounds(self) -> Option<(T, T)> {
        match self {
            Material::Snow => Some((
                1. - SNOW_CRITICAL_COMPRESSION,
                1. + SNOW_CRITICAL_STRETCH,
            )),
            Material::Liquid | Material::Jelly => None,
        }
    }
}

/// Advances the deformation state of one particle.
///
/// `candidate` is `(I + dt C) F` for the particle's previous `F`. `stress_scale` converts the
/// Kirchhoff stress into the momentum contribution used by the grid transfer
/// (`-dt * V0 * 4 / dx^2` for quadratic B-splines).
///
/// A particle whose decomposition or result is not finite, or whose plastic ratio stops being
/// positive, is reset to `F = I`, `Jp = 1` and given no stress.
#[allow(non_snake_case)]
pub fn update_deformation<CM: ConstitutiveModel>(
    model: &CM,
    isotropic: &IsotropicParameters,
    material: Material,
    candidate: &Mat,
    plastic_ratio: T,
    stress_scale: T,
) -> DeformationUpdate {
    let svd = match math::svd(candidate) {
        Some(svd) => svd,
        None => return DeformationUpdate::rest(),
    };

    let h = material.hardening(plastic_ratio);
    let mu = match material {
        Material::Liquid => 0.,
        Material::Jelly | Material::Snow => isotropic.mu * h,
    };
    let lambda = isotropic.lambda * h;

    let sigma = match material.yield_bounds() {
        Some((lower, upper)) => svd.sigma.map(|s| s.max(lower).min(upper)),
        None => svd.sigma,
    };
    let plastic_ratio =
        plastic_ratio * svd.sigma.component_div(&sigma).iter().product::<T>();
    let J = sigma.iter().product::<T>();

    let F = match material {
        // Fluids carry no shear memory, only volume change survives the step.
        Material::Liquid => Mat::from_diagonal(&TV::new(J, 1., 1.)),
        Material::Snow => svd.recompose(&sigma),
        Material::Jelly => *candidate,
    };

    let stress = stress_scale * model.kirchhoff_stress(&F, &svd, J, mu, lambda);

    if !(plastic_ratio.is_finite() && plastic_ratio > 0.)
        || !math::is_finite(&F)
        || !math::is_finite(&stress)
    {
        return DeformationUpdate::rest();
    }

    DeformationUpdate {
        deformation_gradient: F,
        plastic_ratio,
        stress,
        degenerate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(material: Material, candidate: Mat, plastic_ratio: T) -> DeformationUpdate {
        update_deformation(
            &FixedCorotated,
            &IsotropicParameters::default(),
            material,
            &candidate,
            plastic_ratio,
            1.,
        )
    }

    #[test]
    fn lame_parameters_from_youngs_modulus() {
        let params = IsotropicParameters::new(1000., 0.2);
        assert!((params.mu - 1000. / 2.4).abs() < 1e-9);
        assert!((params.lambda - 200. / (1.2 * 0.6)).abs() < 1e-9);
    }

    #[test]
    fn hardening_depends_on_material() {
        assert_eq!(Material::Jelly.hardening(0.5), 0.3);
        assert_eq!(Material::Liquid.hardening(1.), 1.);
        assert!(Material::Snow.hardening(0.9) > 1.);
        assert!(Material::Snow.hardening(1.1) < 1.);
    }

    #[test]
    fn undeformed_particles_are_stress_free() {
        for &material in &Material::ALL {
            let result = update(material, Mat::identity(), 1.);
            assert!(!result.degenerate);
            assert!(result.stress.norm() < 1e-9);
            assert!((result.deformation_gradient - Mat::identity()).norm() < 1e-9);
            assert!((result.plastic_ratio - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn compressed_snow_loses_plastic_volume() {
        let result = update(Material::Snow, 0.9 * Mat::identity(), 1.);
        let expected = (0.9f64 / 0.975).powi(3);

        assert!(result.plastic_ratio < 1.);
        assert!((result.plastic_ratio - expected).abs() < 1e-9);
        assert!((result.deformation_gradient - 0.975 * Mat::identity()).norm() < 1e-9);
    }

    #[test]
    fn stretched_snow_gains_plastic_volume() {
        let result = update(Material::Snow, 1.1 * Mat::identity(), 0.8);
        let expected = 0.8 * (1.1f64 / 1.0045).powi(3);

        assert!(result.plastic_ratio > 0.8);
        assert!((result.plastic_ratio - expected).abs() < 1e-9);
    }

    #[test]
    fn snow_within_yield_surface_is_elastic() {
        let candidate = Mat::from_diagonal(&TV::new(0.99, 1.001, 1.));
        let result = update(Material::Snow, candidate, 1.);

        assert!((result.plastic_ratio - 1.).abs() < 1e-12);
        assert!((result.deformation_gradient - candidate).norm() < 1e-9);
    }

    #[test]
    fn liquid_keeps_only_volume_change() {
        let mut candidate = Mat::from_diagonal(&TV::new(1.1, 0.9, 0.95));
        candidate[(0, 1)] = 0.05;
        let volume_ratio = candidate.determinant();
        let result = update(Material::Liquid, candidate, 1.);

        let expected = Mat::from_diagonal(&TV::new(volume_ratio, 1., 1.));
        assert!((result.deformation_gradient - expected).norm() < 1e-9);
        assert_eq!(result.plastic_ratio, 1.);
        // no shear, only pressure
        assert!(result.stress[(0, 1)].abs() < 1e-9);
        assert!((result.stress[(0, 0)] - result.stress[(1, 1)]).abs() < 1e-9);
    }

    #[test]
    fn jelly_keeps_the_candidate() {
        let mut candidate = Mat::identity();
        candidate[(2, 0)] = 0.1;
        let result = update(Material::Jelly, candidate, 0.5);

        assert_eq!(result.deformation_gradient, candidate);
        assert_eq!(result.plastic_ratio, 0.5);
        assert!(result.stress.norm() > 0.);
    }

    #[test]
    fn plastic_ratio_scales_with_every_clamped_axis() {
        let candidate = Mat::from_diagonal(&TV::new(0.9, 1., 1.1));
        let result = update(Material::Snow, candidate, 1.);
        let expected = (0.9 / 0.975) * (1.1 / 1.0045);

        assert!((result.plastic_ratio - expected).abs() < 1e-9);
        let clamped = result.deformation_gradient.determinant();
        assert!((clamped - 0.975 * 1.0045).abs() < 1e-9);
    }

    #[test]
    fn stress_is_scaled_into_a_momentum_contribution() {
        let candidate = Mat::from_diagonal(&TV::new(0.9, 1., 1.));
        let unscaled = update(Material::Jelly, candidate, 1.).stress;
        let scaled = update_deformation(
            &FixedCorotated,
            &IsotropicParameters::default(),
            Material::Jelly,
            &candidate,
            1.,
            -2.,
        )
        .stress;

        assert!((scaled + 2. * unscaled).norm() < 1e-9);
    }

    #[test]
    fn non_finite_deformation_resets_the_particle() {
        let mut candidate = Mat::identity();
        candidate[(1, 1)] = T::NAN;

        for &material in &Material::ALL {
            let result = update(material, candidate, 0.7);
            assert!(result.degenerate);
            assert_eq!(result.deformation_gradient, Mat::identity());
            assert_eq!(result.plastic_ratio, 1.);
            assert_eq!(result.stress, Mat::zeros());
        }
    }

    #[test]
    fn inverted_snow_is_reset_instead_of_flipping_plastic_ratio() {
        let candidate = Mat::from_diagonal(&TV::new(1., 1., -1.));
        let result = update(Material::Snow, candidate, 1.);
        assert!(result.degenerate);
        assert_eq!(result.plastic_ratio, 1.);
    }
}
