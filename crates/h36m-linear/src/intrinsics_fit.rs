//! Closed-form per-axis pinhole fit from 2D/3D joint correspondences.
//!
//! For every joint-frame `i` the model `u_i = alpha_x * x_i / z_i + x0` is
//! rewritten as a linear equation in the unknowns:
//!
//! ```text
//! [x_i  z_i] * [alpha_x, x0]^T = u_i * z_i
//! ```
//!
//! and solved in the least-squares sense over all rows. The vertical axis
//! uses `(y_i, z_i, v_i)` in the same way. Each axis has two unknowns, so
//! the solve pseudo-inverts the 2x2 normal matrix through its symmetric
//! eigen-decomposition. Eigenvalues below a relative cutoff are dropped,
//! and rank-deficient systems (e.g. every joint-frame identical) return the
//! minimum-norm least-squares solution instead of failing.

use h36m_core::{Intrinsics, PoseSeq2, PoseSeq3, Pt2, Pt3, Real};
use log::debug;
use nalgebra::{Matrix2, SymmetricEigen, Vector2};
use thiserror::Error;

/// Normal-matrix condition number above which the fit is logged as
/// ill-conditioned.
const ILL_CONDITIONED: Real = 1e12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("mismatched number of 2D points ({points_2d}) and 3D points ({points_3d})")]
    MismatchedCounts { points_2d: usize, points_3d: usize },
    #[error("need at least 2 correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("least-squares solution is not finite")]
    NonFinite,
}

/// Estimate `(alpha_x, x0, alpha_y, y0)` from parallel 2D and 3D points.
pub fn estimate_intrinsics(points_2d: &[Pt2], points_3d: &[Pt3]) -> Result<Intrinsics, SolveError> {
    let n = points_3d.len();
    if points_2d.len() != n {
        return Err(SolveError::MismatchedCounts {
            points_2d: points_2d.len(),
            points_3d: n,
        });
    }
    if n < 2 {
        return Err(SolveError::NotEnoughPoints(n));
    }

    let (alpha_x, x0) = solve_axis(
        n,
        points_3d
            .iter()
            .zip(points_2d)
            .map(|(p, uv)| (p.x, p.z, uv.x)),
    )?;
    let (alpha_y, y0) = solve_axis(
        n,
        points_3d
            .iter()
            .zip(points_2d)
            .map(|(p, uv)| (p.y, p.z, uv.y)),
    )?;

    Ok(Intrinsics::new(alpha_x, x0, alpha_y, y0))
}

/// [`estimate_intrinsics`] over every joint-frame of two pose sequences.
pub fn estimate_view_intrinsics(
    pose_2d: &PoseSeq2,
    pose_3d: &PoseSeq3,
) -> Result<Intrinsics, SolveError> {
    estimate_intrinsics(pose_2d.points(), pose_3d.points())
}

/// Solve `[c z] * [alpha, offset]^T = u * z` for one axis.
fn solve_axis(
    n: usize,
    rows: impl Iterator<Item = (Real, Real, Real)>,
) -> Result<(Real, Real), SolveError> {
    let mut ata = Matrix2::<Real>::zeros();
    let mut atb = Vector2::<Real>::zeros();
    for (c, z, u) in rows {
        let row = Vector2::new(c, z);
        ata += row * row.transpose();
        atb += row * (u * z);
    }

    if !ata.iter().chain(atb.iter()).all(|v| v.is_finite()) {
        return Err(SolveError::NonFinite);
    }
    let eigen = SymmetricEigen::new(ata);
    let l_max = eigen.eigenvalues.max();
    let l_min = eigen.eigenvalues.min();
    if l_min <= l_max / ILL_CONDITIONED {
        debug!(
            "intrinsics fit is ill-conditioned (normal eigenvalues {:.3e} / {:.3e}), solving anyway",
            l_max, l_min
        );
    }

    // A null eigenvalue is only zero up to rounding of order n * eps * l_max.
    let cutoff = l_max * Real::EPSILON * n as Real;
    let mut x = Vector2::<Real>::zeros();
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda > cutoff {
            let v = eigen.eigenvectors.column(i);
            x += v * (v.dot(&atb) / lambda);
        }
    }
    if !x.iter().all(|v| v.is_finite()) {
        return Err(SolveError::NonFinite);
    }
    Ok((x[0], x[1]))
}
