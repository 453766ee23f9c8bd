//! CMA-ES strategy parameters
//!
//! Default settings follow Hansen's tutorial: log-linear recombination
//! weights over the selected parents, and learning rates derived from the
//! dimension and the variance effective selection mass.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{EsResult, StrategyError};

/// Tolerance used when checking that recombination weights sum to one
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Tolerances for the distribution-level termination check
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerminationTolerances {
    /// Generations before the function-value range test applies
    pub min_generations: usize,
    /// Minimum range of fitness values within one generation
    pub tol_fun: f64,
    /// Minimum coordinate-wise standard deviation
    pub tol_x: f64,
    /// Maximum `sigma * sqrt(max eigenvalue)`
    pub tol_x_up: f64,
    /// Maximum condition number of the covariance matrix
    pub tol_condition_c: f64,
}

impl Default for TerminationTolerances {
    fn default() -> Self {
        Self {
            min_generations: 10,
            tol_fun: 1e-12,
            tol_x: 1e-12,
            tol_x_up: 1e4,
            tol_condition_c: 1e14,
        }
    }
}

/// Immutable CMA-ES configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CmaEsParams {
    /// Problem dimension (n)
    pub num_dims: usize,
    /// Population size (λ)
    pub popsize: usize,
    /// Fraction of the population used for recombination
    pub elite_ratio: f64,
    /// Number of selected parents (μ)
    pub mu: usize,
    /// Recombination weights, best rank first
    pub weights: Vec<f64>,
    /// Variance effective selection mass (μ_eff)
    pub mu_eff: f64,
    /// Initial mean of the search distribution
    pub init_mean: Vec<f64>,
    /// Initial step size
    pub init_sigma: f64,
    /// Cumulation rate for the step-size path
    pub c_sigma: f64,
    /// Cumulation rate for the rank-one path
    pub c_c: f64,
    /// Learning rate for the rank-one update
    pub c_1: f64,
    /// Learning rate for the rank-μ update
    pub c_mu: f64,
    /// Learning rate for the mean
    pub c_m: f64,
    /// Damping for step-size adaptation
    pub d_sigma: f64,
    /// Expected norm of an n-dimensional standard normal vector
    pub chi_n: f64,
    /// Lower bound for sigma
    pub sigma_min: f64,
    /// Upper bound for sigma
    pub sigma_max: f64,
    /// Generations between eigendecompositions
    pub eigen_decomp_period: usize,
    /// Floor applied to covariance eigenvalues
    pub eigen_eps: f64,
    /// Ceiling applied to covariance eigenvalues
    pub max_eigenvalue: f64,
    /// Optional lower bound applied to sampled candidates
    pub clip_min: Option<f64>,
    /// Optional upper bound applied to sampled candidates
    pub clip_max: Option<f64>,
    /// Termination tolerances
    pub termination: TerminationTolerances,
}

impl CmaEsParams {
    /// Create default parameters for the given dimension and population size
    pub fn new(num_dims: usize, popsize: usize) -> Self {
        let mut params = Self {
            num_dims,
            popsize,
            elite_ratio: 0.5,
            mu: 0,
            weights: Vec::new(),
            mu_eff: 0.0,
            init_mean: vec![0.0; num_dims],
            init_sigma: 1.0,
            c_sigma: 0.0,
            c_c: 0.0,
            c_1: 0.0,
            c_mu: 0.0,
            c_m: 1.0,
            d_sigma: 0.0,
            chi_n: 0.0,
            sigma_min: 1e-20,
            sigma_max: 1e20,
            eigen_decomp_period: 1,
            eigen_eps: 1e-20,
            max_eigenvalue: 1e20,
            clip_min: None,
            clip_max: None,
            termination: TerminationTolerances::default(),
        };
        params.derive_defaults();
        params
    }

    /// Default population size for a dimension: 4 + floor(3 ln n)
    pub fn default_popsize(num_dims: usize) -> usize {
        let n = num_dims.max(1) as f64;
        (4.0 + (3.0 * n.ln()).floor()) as usize
    }

    /// Set the elite ratio and re-derive weights and learning rates
    pub fn with_elite_ratio(mut self, elite_ratio: f64) -> Self {
        self.elite_ratio = elite_ratio;
        self.derive_defaults();
        self
    }

    /// Set the initial mean
    pub fn with_init_mean(mut self, mean: Vec<f64>) -> Self {
        self.init_mean = mean;
        self
    }

    /// Set the initial step size
    pub fn with_init_sigma(mut self, sigma: f64) -> Self {
        self.init_sigma = sigma;
        self
    }

    /// Set the step-size bounds
    pub fn with_sigma_bounds(mut self, sigma_min: f64, sigma_max: f64) -> Self {
        self.sigma_min = sigma_min;
        self.sigma_max = sigma_max;
        self
    }

    /// Set the eigendecomposition refresh period
    pub fn with_eigen_decomp_period(mut self, period: usize) -> Self {
        self.eigen_decomp_period = period;
        self
    }

    /// Set the eigenvalue clamp range
    pub fn with_eigen_bounds(mut self, eps: f64, max_eigenvalue: f64) -> Self {
        self.eigen_eps = eps;
        self.max_eigenvalue = max_eigenvalue;
        self
    }

    /// Clip sampled candidates into `[min, max]`
    pub fn with_clip_bounds(mut self, min: f64, max: f64) -> Self {
        self.clip_min = Some(min);
        self.clip_max = Some(max);
        self
    }

    /// Set the termination tolerances
    pub fn with_termination(mut self, termination: TerminationTolerances) -> Self {
        self.termination = termination;
        self
    }

    /// Replace the recombination weights
    ///
    /// `mu` follows the number of weights and `mu_eff` is recomputed.
    /// Learning rates are left as they are.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.mu = weights.len();
        self.mu_eff = mu_eff(&weights);
        self.weights = weights;
        self
    }

    /// Recompute μ, weights and every derived learning rate
    fn derive_defaults(&mut self) {
        let n = self.num_dims.max(1) as f64;
        let lambda = self.popsize as f64;

        self.mu = (lambda * self.elite_ratio).floor().max(0.0) as usize;
        self.weights = recombination_weights(self.popsize, self.mu);
        self.mu_eff = mu_eff(&self.weights);
        let mu_eff = if self.mu_eff.is_finite() { self.mu_eff } else { 1.0 };

        self.c_sigma = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        self.d_sigma =
            1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + self.c_sigma;
        self.c_c = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);

        let alpha_cov = 2.0;
        self.c_1 = alpha_cov / ((n + 1.3).powi(2) + mu_eff);
        let c_mu = alpha_cov * (mu_eff - 2.0 + 1.0 / mu_eff)
            / ((n + 2.0).powi(2) + alpha_cov * mu_eff / 2.0);
        self.c_mu = c_mu.min(1.0 - self.c_1 - 1e-8).max(f64::EPSILON);

        self.chi_n = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n * n));
    }

    /// Recombination weights as a vector
    pub fn weights_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.weights)
    }

    /// Check every static constraint
    pub fn validate(&self) -> EsResult<()> {
        let fail = |msg: String| Err(StrategyError::Configuration(msg));

        if self.num_dims < 1 {
            return fail("num_dims must be at least 1".to_string());
        }
        if self.popsize < 2 {
            return fail(format!("popsize must be at least 2, got {}", self.popsize));
        }
        if self.mu < 1 {
            return fail("mu must be at least 1 (elite_ratio too small)".to_string());
        }
        if self.mu > self.popsize {
            return fail(format!(
                "mu ({}) must not exceed popsize ({})",
                self.mu, self.popsize
            ));
        }
        if self.weights.len() != self.mu {
            return fail(format!(
                "expected {} recombination weights, got {}",
                self.mu,
                self.weights.len()
            ));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return fail("recombination weights must be finite and non-negative".to_string());
        }
        let weight_sum: f64 = self.weights.iter().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return fail(format!(
                "recombination weights must sum to 1, got {weight_sum}"
            ));
        }

        for (name, rate) in [
            ("c_sigma", self.c_sigma),
            ("c_c", self.c_c),
            ("c_1", self.c_1),
            ("c_mu", self.c_mu),
            ("c_m", self.c_m),
        ] {
            if !(rate > 0.0 && rate <= 1.0) {
                return fail(format!("{name} must lie in (0, 1], got {rate}"));
            }
        }
        if self.c_1 + self.c_mu > 1.0 {
            return fail(format!(
                "c_1 + c_mu must not exceed 1, got {}",
                self.c_1 + self.c_mu
            ));
        }
        if !(self.d_sigma > 0.0 && self.d_sigma.is_finite()) {
            return fail(format!("d_sigma must be positive, got {}", self.d_sigma));
        }
        if !(self.chi_n > 0.0 && self.chi_n.is_finite()) {
            return fail(format!("chi_n must be positive, got {}", self.chi_n));
        }

        if self.init_mean.len() != self.num_dims {
            return fail(format!(
                "init_mean has length {}, expected {}",
                self.init_mean.len(),
                self.num_dims
            ));
        }
        if self.init_mean.iter().any(|m| !m.is_finite()) {
            return fail("init_mean must be finite".to_string());
        }
        if !(self.sigma_min > 0.0 && self.sigma_min <= self.sigma_max) {
            return fail(format!(
                "sigma bounds must satisfy 0 < sigma_min <= sigma_max, got [{}, {}]",
                self.sigma_min, self.sigma_max
            ));
        }
        if !(self.init_sigma.is_finite()
            && self.init_sigma >= self.sigma_min
            && self.init_sigma <= self.sigma_max)
        {
            return fail(format!(
                "init_sigma {} must be finite and within [{}, {}]",
                self.init_sigma, self.sigma_min, self.sigma_max
            ));
        }

        if self.eigen_decomp_period == 0 {
            return fail("eigen_decomp_period must be at least 1".to_string());
        }
        if !(self.eigen_eps > 0.0 && self.eigen_eps < self.max_eigenvalue) {
            return fail(format!(
                "eigenvalue bounds must satisfy 0 < eigen_eps < max_eigenvalue, got [{}, {}]",
                self.eigen_eps, self.max_eigenvalue
            ));
        }
        if let (Some(lo), Some(hi)) = (self.clip_min, self.clip_max) {
            if lo >= hi {
                return fail(format!("clip_min ({lo}) must be below clip_max ({hi})"));
            }
        }

        Ok(())
    }
}

/// Log-linear weights for the `mu` best of `popsize` ranks, normalized to sum to one
///
/// Ranks beyond the positive part of the log-linear profile get zero weight.
pub fn recombination_weights(popsize: usize, mu: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..mu)
        .map(|i| {
            (((popsize as f64 + 1.0) / 2.0).ln() - ((i + 1) as f64).ln()).max(0.0)
        })
        .collect();

    let sum: f64 = raw.iter().sum();
    if sum > 0.0 {
        raw.iter().map(|w| w / sum).collect()
    } else {
        // Degenerate profiles (popsize < 2) fall back to equal weights
        vec![1.0 / mu.max(1) as f64; mu]
    }
}

/// Variance effective selection mass: 1 / Σ w²
pub fn mu_eff(weights: &[f64]) -> f64 {
    1.0 / weights.iter().map(|w| w * w).sum::<f64>()
}
