//! Eigendecomposition refresh with spectral clamping

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::debug;

use super::state::EigenCache;
use crate::error::{EsResult, StrategyError};

/// Convergence threshold for the symmetric eigen solver
const EIGEN_SOLVER_EPS: f64 = 1e-15;

/// Iteration cap for the symmetric eigen solver
const EIGEN_SOLVER_MAX_ITER: usize = 10_000;

/// Average a matrix with its transpose
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Interval enclosing every eigenvalue of a symmetric matrix
///
/// Union of the Gershgorin discs: `[min_i(c_ii - r_i), max_i(c_ii + r_i)]`
/// with `r_i` the off-diagonal absolute row sum.
pub fn gershgorin_bounds(matrix: &DMatrix<f64>) -> (f64, f64) {
    let mut lower = f64::INFINITY;
    let mut upper = f64::NEG_INFINITY;
    for (i, row) in matrix.row_iter().enumerate() {
        let diagonal = row[i];
        let radius = row.iter().map(|v| v.abs()).sum::<f64>() - diagonal.abs();
        lower = lower.min(diagonal - radius);
        upper = upper.max(diagonal + radius);
    }
    (lower, upper)
}

/// Whether the Gershgorin enclosure proves the spectrum lies in `[eps, max_eigenvalue]`
///
/// A `false` answer is inconclusive; the caller must decompose to know.
pub fn spectrum_within(matrix: &DMatrix<f64>, eps: f64, max_eigenvalue: f64) -> bool {
    let (lower, upper) = gershgorin_bounds(matrix);
    lower >= eps && upper <= max_eigenvalue
}

/// Decompose the covariance matrix and clamp its spectrum
///
/// Returns the covariance to keep in the state alongside a fresh cache.
/// When clamping changed any eigenvalue, the returned covariance is
/// rebuilt from the clamped spectrum so the matrix and its factorization
/// agree; otherwise the symmetrized input is returned as is.
pub fn refresh(
    covariance: &DMatrix<f64>,
    eps: f64,
    max_eigenvalue: f64,
) -> EsResult<(DMatrix<f64>, EigenCache)> {
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(StrategyError::NumericalInstability(
            "covariance matrix contains non-finite entries".to_string(),
        ));
    }

    let symmetric = symmetrize(covariance);
    let eigen = SymmetricEigen::try_new(symmetric.clone(), EIGEN_SOLVER_EPS, EIGEN_SOLVER_MAX_ITER)
        .ok_or_else(|| {
            StrategyError::NumericalInstability(
                "eigendecomposition of the covariance matrix did not converge".to_string(),
            )
        })?;

    let mut clamped = 0usize;
    let eigenvalues = eigen.eigenvalues.map(|d| {
        let bounded = d.clamp(eps, max_eigenvalue);
        if bounded != d {
            clamped += 1;
        }
        bounded
    });
    let eigenvectors = eigen.eigenvectors;

    if eigenvalues.iter().any(|d| !d.is_finite())
        || eigenvectors.iter().any(|v| !v.is_finite())
    {
        return Err(StrategyError::NumericalInstability(
            "eigendecomposition produced non-finite values".to_string(),
        ));
    }

    let covariance = if clamped > 0 {
        debug!(
            clamped,
            eps, max_eigenvalue, "clamped covariance eigenvalues"
        );
        let rebuilt = &eigenvectors * DMatrix::from_diagonal(&eigenvalues) * eigenvectors.transpose();
        symmetrize(&rebuilt)
    } else {
        symmetric
    };

    Ok((
        covariance,
        EigenCache {
            eigenvectors,
            eigenvalues,
            stale: false,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_refresh_identity() {
        let (cov, cache) = refresh(&DMatrix::identity(3, 3), 1e-20, 1e20).unwrap();
        assert_eq!(cov, DMatrix::identity(3, 3));
        assert!(!cache.stale);
        assert_relative_eq!(cache.eigenvalues, DVector::from_element(3, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_refresh_reconstructs_matrix() {
        let c = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let (cov, cache) = refresh(&c, 1e-20, 1e20).unwrap();

        // Eigenvalues of [[4,1],[1,3]] sum to the trace
        assert_relative_eq!(cache.eigenvalues.sum(), 7.0, epsilon = 1e-10);

        let rebuilt = &cache.eigenvectors
            * DMatrix::from_diagonal(&cache.eigenvalues)
            * cache.eigenvectors.transpose();
        assert_relative_eq!(rebuilt, cov, epsilon = 1e-10);
    }

    #[test]
    fn test_refresh_symmetrizes() {
        let c = DMatrix::from_row_slice(2, 2, &[2.0, 0.4, 0.6, 2.0]);
        let (cov, _) = refresh(&c, 1e-20, 1e20).unwrap();
        assert_relative_eq!(cov, cov.transpose(), epsilon = 1e-15);
        assert_relative_eq!(cov[(0, 1)], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_refresh_clamps_negative_eigenvalues() {
        // Eigenvalues 3 and -1
        let c = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let (cov, cache) = refresh(&c, 1e-6, 1e20).unwrap();

        assert!(cache.eigenvalues.iter().all(|&d| d >= 1e-6));
        let check = SymmetricEigen::new(cov.clone());
        assert!(check.eigenvalues.iter().all(|&d| d >= 1e-6 - 1e-12));
        assert_relative_eq!(cov, cov.transpose(), epsilon = 1e-15);
    }

    #[test]
    fn test_refresh_clamps_large_eigenvalues() {
        let c = DMatrix::from_diagonal(&DVector::from_vec(vec![1e6, 1.0]));
        let (cov, cache) = refresh(&c, 1e-20, 1e3).unwrap();
        assert_relative_eq!(cache.eigenvalues.max(), 1e3, epsilon = 1e-9);
        assert_relative_eq!(cov[(0, 0)], 1e3, epsilon = 1e-9);
    }

    #[test]
    fn test_gershgorin_bounds_enclose_spectrum() {
        let c = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, -0.5, 1.0, 3.0, 0.2, -0.5, 0.2, 1.0]);
        let (lower, upper) = gershgorin_bounds(&c);
        assert_relative_eq!(lower, 0.3, epsilon = 1e-12);
        assert_relative_eq!(upper, 5.5, epsilon = 1e-12);

        let eigen = SymmetricEigen::new(c);
        assert!(eigen.eigenvalues.iter().all(|&d| d >= lower && d <= upper));
    }

    #[test]
    fn test_spectrum_within() {
        let diagonal = DMatrix::from_diagonal(&DVector::from_vec(vec![0.95, 1.05]));
        assert!(spectrum_within(&diagonal, 0.9, 1.1));
        assert!(!spectrum_within(&diagonal, 1.0, 1.1));
        assert!(!spectrum_within(&diagonal, 0.9, 1.0));

        // Positive definite, but the discs reach below zero
        let correlated = DMatrix::from_row_slice(2, 2, &[1.0, 0.99, 0.99, 1.0]);
        assert!(!spectrum_within(&correlated, 0.05, 10.0));
    }

    #[test]
    fn test_refresh_rejects_non_finite() {
        let mut c = DMatrix::identity(2, 2);
        c[(0, 1)] = f64::NAN;
        assert!(matches!(
            refresh(&c, 1e-20, 1e20),
            Err(StrategyError::NumericalInstability(_))
        ));
    }
}
