//! Numeric aliases and the small amount of linear algebra shared by the solver.

pub const DIM: usize = 3;

pub type T = f64;
pub type TV = na::SVector<T, DIM>;
pub type IV = na::SVector<isize, DIM>;

pub type Mat = na::SMatrix<T, DIM, DIM>;

/// Maximum number of sweeps given to the iterative SVD before we give up on a particle.
const SVD_MAX_ITERATIONS: usize = 100;

/// Singular value decomposition `m = u * diag(sigma) * v^T` where both `u` and `v` are proper
/// rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Svd3 {
    pub u: Mat,
    pub sigma: TV,
    pub v: Mat,
}

impl Svd3 {
    /// The rotational part of the polar decomposition, `u * v^T`.
    pub fn rotation(&self) -> Mat {
        self.u * self.v.transpose()
    }

    /// Rebuilds `u * diag(sigma) * v^T` with the given singular values.
    pub fn recompose(&self, sigma: &TV) -> Mat {
        self.u * Mat::from_diagonal(sigma) * self.v.transpose()
    }
}

/// Computes the SVD of a 3x3 matrix, returning `None` when the input is not finite or the
/// iteration fails to converge.
///
/// nalgebra returns sorted, non-negative singular values and orthogonal (possibly reflecting)
/// factors. The deformation update wants rotations, so a reflection in either factor is folded
/// into the sign of the smallest singular value instead.
pub fn svd(m: &Mat) -> Option<Svd3> {
    if !is_finite(m) {
        return None;
    }

    let decomposition = m.try_svd(true, true, T::EPSILON, SVD_MAX_ITERATIONS)?;
    let mut u = decomposition.u?;
    let mut v = decomposition.v_t?.transpose();
    let mut sigma = decomposition.singular_values;

    if u.determinant() < 0. {
        u.column_mut(DIM - 1).neg_mut();
        sigma[DIM - 1] = -sigma[DIM - 1];
    }
    if v.determinant() < 0. {
        v.column_mut(DIM - 1).neg_mut();
        sigma[DIM - 1] = -sigma[DIM - 1];
    }

    let svd = Svd3 { u, sigma, v };
    if is_finite(&svd.u) && is_finite(&svd.v) && svd.sigma.iter().all(|s| s.is_finite()) {
        Some(svd)
    } else {
        None
    }
}

pub fn is_finite(m: &Mat) -> bool {
    m.iter().all(|x| x.is_finite())
}

pub fn outer(a: &TV, b: &TV) -> Mat {
    a * b.transpose()
}
