//! CMA-ES distribution state
//!
//! The state is a plain value. Every `tell` builds a new one, and the
//! cached eigendecomposition travels inside it with an explicit staleness
//! flag instead of being recomputed behind the caller's back.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::params::CmaEsParams;

/// Cached eigendecomposition of the covariance matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenCache {
    /// Orthonormal eigenvectors (B), one per column
    pub eigenvectors: DMatrix<f64>,
    /// Eigenvalues of C (D), clamped into the configured range
    pub eigenvalues: DVector<f64>,
    /// Whether a refresh is due before the next sample
    ///
    /// Between scheduled refreshes (`eigen_decomp_period > 1`) the
    /// factorization may lag the covariance while this flag is `false`;
    /// it remains the basis candidates are sampled from.
    pub stale: bool,
}

impl EigenCache {
    /// Factorization of the identity matrix
    pub fn identity(n: usize) -> Self {
        Self {
            eigenvectors: DMatrix::identity(n, n),
            eigenvalues: DVector::from_element(n, 1.0),
            stale: false,
        }
    }

    /// Per-axis standard deviations, sqrt(D)
    pub fn axis_lengths(&self) -> DVector<f64> {
        self.eigenvalues.map(f64::sqrt)
    }

    /// Ratio of the largest to the smallest eigenvalue
    pub fn condition_number(&self) -> f64 {
        let max = self.eigenvalues.max();
        let min = self.eigenvalues.min();
        if min > 0.0 {
            max / min
        } else {
            f64::INFINITY
        }
    }

    /// Map a step from the distribution frame into the isotropic frame:
    /// z = diag(1/sqrt(D)) Bᵗ y
    pub fn whiten(&self, y: &DVector<f64>) -> DVector<f64> {
        let mut z = self.eigenvectors.tr_mul(y);
        for (zi, d) in z.iter_mut().zip(self.eigenvalues.iter()) {
            *zi /= d.sqrt();
        }
        z
    }

    /// Map an isotropic sample into the distribution frame:
    /// y = B diag(sqrt(D)) z
    pub fn color(&self, z: &DVector<f64>) -> DVector<f64> {
        let scaled = z.component_mul(&self.axis_lengths());
        &self.eigenvectors * scaled
    }
}

/// Complete CMA-ES state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CmaEsState {
    /// Current mean of the search distribution
    pub mean: DVector<f64>,

    /// Global step size (σ)
    pub sigma: f64,

    /// Covariance matrix C
    pub covariance: DMatrix<f64>,

    /// Cached factorization of C
    pub eigen: EigenCache,

    /// Evolution path for σ adaptation (p_σ)
    pub path_sigma: DVector<f64>,

    /// Evolution path for C adaptation (p_c)
    pub path_c: DVector<f64>,

    /// Completed generations
    pub generation: usize,

    /// Fitness values consumed so far
    pub evaluations: usize,

    /// Best solution found
    pub best_member: DVector<f64>,

    /// Best fitness found (+∞ until the first `tell`)
    #[serde(with = "running_best")]
    pub best_fitness: f64,
}

impl CmaEsState {
    /// Fresh state for the given parameters
    pub fn new(params: &CmaEsParams) -> Self {
        let n = params.num_dims;
        let mean = DVector::from_column_slice(&params.init_mean);

        Self {
            best_member: mean.clone(),
            mean,
            sigma: params.init_sigma,
            covariance: DMatrix::identity(n, n),
            eigen: EigenCache::identity(n),
            path_sigma: DVector::zeros(n),
            path_c: DVector::zeros(n),
            generation: 0,
            evaluations: 0,
            best_fitness: f64::INFINITY,
        }
    }

    /// Problem dimension
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Whether every numeric field is finite
    pub fn is_finite(&self) -> bool {
        self.sigma.is_finite()
            && self.mean.iter().all(|v| v.is_finite())
            && self.path_sigma.iter().all(|v| v.is_finite())
            && self.path_c.iter().all(|v| v.is_finite())
            && self.covariance.iter().all(|v| v.is_finite())
    }
}

/// Serde adapter that writes an infinite running best as `null`
///
/// JSON has no representation for infinity, and the running best is +∞
/// until the first generation has been told.
mod running_best {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let finite = if value.is_finite() { Some(*value) } else { None };
        finite.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
