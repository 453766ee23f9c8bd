//! The `tell` recursion: mean, evolution paths, covariance and step size
//!
//! Each step is a small pure function over vectors so the order of the
//! update is explicit at the call site in [`advance`].

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use super::eigen::symmetrize;
use super::params::CmaEsParams;
use super::state::{CmaEsState, EigenCache};
use crate::algorithms::traits::{FitnessVector, Population};

/// Selected steps of one generation, best rank first
#[derive(Clone, Debug)]
pub struct SelectedSteps {
    /// Population row index of each selected candidate
    pub indices: Vec<usize>,
    /// Steps in the distribution frame, y = (x - m) / σ
    pub steps: Vec<DVector<f64>>,
}

/// Indices sorting fitness in ascending order
///
/// The sort is stable, so tied candidates keep their population order.
pub fn rank_ascending(fitness: &FitnessVector) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| {
        fitness[a]
            .partial_cmp(&fitness[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Recover the steps of the `mu` best candidates
pub fn select_steps(
    population: &Population,
    fitness: &FitnessVector,
    mean: &DVector<f64>,
    sigma: f64,
    mu: usize,
) -> SelectedSteps {
    let indices: Vec<usize> = rank_ascending(fitness).into_iter().take(mu).collect();
    let steps = indices
        .iter()
        .map(|&i| (population.row(i).transpose() - mean) / sigma)
        .collect();
    SelectedSteps { indices, steps }
}

/// Weighted recombination Σ w_k v_k
pub fn recombine(weights: &[f64], vectors: &[DVector<f64>], n: usize) -> DVector<f64> {
    weights
        .iter()
        .zip(vectors)
        .fold(DVector::<f64>::zeros(n), |acc, (w, v)| acc + v * *w)
}

/// m' = m + c_m σ y_w
pub fn update_mean(mean: &DVector<f64>, sigma: f64, y_w: &DVector<f64>, c_m: f64) -> DVector<f64> {
    mean + y_w * (c_m * sigma)
}

/// p_σ' = (1 - c_σ) p_σ + sqrt(c_σ (2 - c_σ) μ_eff) B z_w
pub fn update_path_sigma(
    path_sigma: &DVector<f64>,
    eigen: &EigenCache,
    z_w: &DVector<f64>,
    c_sigma: f64,
    mu_eff: f64,
) -> DVector<f64> {
    let scale = (c_sigma * (2.0 - c_sigma) * mu_eff).sqrt();
    path_sigma * (1.0 - c_sigma) + (&eigen.eigenvectors * z_w) * scale
}

/// Heaviside stall indicator
///
/// Returns 0 when the step-size path has grown faster than expected,
/// which suspends the rank-one update for this generation.
pub fn heaviside(
    path_sigma_norm: f64,
    c_sigma: f64,
    generation: usize,
    num_dims: usize,
    chi_n: f64,
) -> f64 {
    let exponent = 2.0 * (generation as f64 + 1.0);
    let correction = (1.0 - (1.0 - c_sigma).powf(exponent)).sqrt();
    let threshold = (1.4 + 2.0 / (num_dims as f64 + 1.0)) * chi_n;
    if path_sigma_norm / correction < threshold {
        1.0
    } else {
        0.0
    }
}

/// p_c' = (1 - c_c) p_c + h_σ sqrt(c_c (2 - c_c) μ_eff) y_w
pub fn update_path_c(
    path_c: &DVector<f64>,
    y_w: &DVector<f64>,
    h_sigma: f64,
    c_c: f64,
    mu_eff: f64,
) -> DVector<f64> {
    let scale = h_sigma * (c_c * (2.0 - c_c) * mu_eff).sqrt();
    path_c * (1.0 - c_c) + y_w * scale
}

/// Rank-one plus rank-μ covariance update
pub fn update_covariance(
    covariance: &DMatrix<f64>,
    path_c: &DVector<f64>,
    steps: &[DVector<f64>],
    h_sigma: f64,
    params: &CmaEsParams,
) -> DMatrix<f64> {
    let n = covariance.nrows();
    let weight_sum: f64 = params.weights.iter().sum();
    let delta_h = (1.0 - h_sigma) * params.c_c * (2.0 - params.c_c);

    let rank_one = path_c * path_c.transpose() + covariance * delta_h;
    let rank_mu = params
        .weights
        .iter()
        .zip(steps)
        .fold(DMatrix::<f64>::zeros(n, n), |acc, (w, y)| acc + (y * y.transpose()) * *w);

    covariance * (1.0 - params.c_1 - params.c_mu * weight_sum)
        + rank_one * params.c_1
        + rank_mu * params.c_mu
}

/// σ' = σ exp((c_σ / d_σ)(‖p_σ‖ / χ_n - 1)), clamped into the configured bounds
pub fn update_sigma(sigma: f64, path_sigma_norm: f64, params: &CmaEsParams) -> f64 {
    let adapted =
        sigma * ((params.c_sigma / params.d_sigma) * (path_sigma_norm / params.chi_n - 1.0)).exp();
    let clamped = adapted.clamp(params.sigma_min, params.sigma_max);
    if clamped != adapted {
        trace!(adapted, clamped, "sigma clamped to bounds");
    }
    clamped
}

/// Fold one evaluated generation into the state
///
/// Expects validated inputs and an eigen cache matching the factorization
/// the population was sampled from. The returned covariance is symmetric
/// but its spectrum is not yet bounded; `tell` enforces the bounds.
pub fn advance(
    population: &Population,
    fitness: &FitnessVector,
    state: &CmaEsState,
    params: &CmaEsParams,
) -> CmaEsState {
    let n = params.num_dims;

    let selected = select_steps(population, fitness, &state.mean, state.sigma, params.mu);
    let whitened: Vec<DVector<f64>> = selected
        .steps
        .iter()
        .map(|y| state.eigen.whiten(y))
        .collect();

    let y_w = recombine(&params.weights, &selected.steps, n);
    let z_w = recombine(&params.weights, &whitened, n);

    let mean = update_mean(&state.mean, state.sigma, &y_w, params.c_m);

    let path_sigma = update_path_sigma(
        &state.path_sigma,
        &state.eigen,
        &z_w,
        params.c_sigma,
        params.mu_eff,
    );
    let path_sigma_norm = path_sigma.norm();

    let h_sigma = heaviside(
        path_sigma_norm,
        params.c_sigma,
        state.generation,
        n,
        params.chi_n,
    );
    let path_c = update_path_c(&state.path_c, &y_w, h_sigma, params.c_c, params.mu_eff);

    let covariance = symmetrize(&update_covariance(
        &state.covariance,
        &path_c,
        &selected.steps,
        h_sigma,
        params,
    ));
    let sigma = update_sigma(state.sigma, path_sigma_norm, params);

    let generation = state.generation + 1;
    let mut eigen = state.eigen.clone();
    eigen.stale = generation % params.eigen_decomp_period == 0;

    let (best_member, best_fitness) = match selected.indices.first() {
        Some(&i) if fitness[i] < state.best_fitness => {
            (population.row(i).transpose(), fitness[i])
        }
        _ => (state.best_member.clone(), state.best_fitness),
    };

    trace!(
        generation,
        sigma,
        h_sigma,
        path_sigma_norm,
        best_fitness,
        "cma-es update"
    );

    CmaEsState {
        mean,
        sigma,
        covariance,
        eigen,
        path_sigma,
        path_c,
        generation,
        evaluations: state.evaluations + fitness.len(),
        best_member,
        best_fitness,
    }
}
