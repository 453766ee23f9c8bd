//! CMA-ES (Covariance Matrix Adaptation Evolution Strategy)
//!
//! Implements the CMA-ES algorithm with full covariance matrix adaptation,
//! evolution path management, and step-size control, as three pure
//! transitions: [`initialize`], [`ask`] and [`tell`].
//!
//! Reference: Hansen, N., & Ostermeier, A. (2001). Completely Derandomized
//! Self-Adaptation in Evolution Strategies. Evolutionary Computation, 9(2).
//!
//! ```rust,ignore
//! use fugue_es::prelude::*;
//!
//! let params = CmaEsParams::new(2, 20).with_init_sigma(0.5);
//! let mut state = initialize(PrngKey::new(0), &params)?;
//! let mut key = PrngKey::new(42);
//! for _ in 0..50 {
//!     let (next, sample) = key.split();
//!     key = next;
//!     let (population, asked) = ask(sample, &state, &params)?;
//!     let fitness = Sphere::new(2).evaluate(sample, &population);
//!     state = tell(&population, &fitness, &asked, &params)?;
//! }
//! ```

pub mod eigen;
pub mod params;
pub mod state;
pub mod termination;
pub mod update;

use nalgebra::DMatrix;
use rand_distr::{Distribution, StandardNormal};
use tracing::trace;

pub use params::{CmaEsParams, TerminationTolerances};
pub use state::{CmaEsState, EigenCache};
pub use termination::{check_termination, CmaEsTermination};

use crate::algorithms::traits::{EvolutionStrategy, FitnessVector, Population};
use crate::error::{EsResult, StrategyError};
use crate::random::PrngKey;

/// Validate the parameters and build the first state
///
/// CMA-ES starts from `init_mean` with an identity covariance, so the key
/// does not influence the result.
pub fn initialize(_key: PrngKey, params: &CmaEsParams) -> EsResult<CmaEsState> {
    params.validate()?;
    trace!(
        num_dims = params.num_dims,
        popsize = params.popsize,
        mu = params.mu,
        mu_eff = params.mu_eff,
        "cma-es initialized"
    );
    Ok(CmaEsState::new(params))
}

/// Return a state whose eigen cache matches its covariance
fn ensure_fresh(state: &CmaEsState, params: &CmaEsParams) -> EsResult<CmaEsState> {
    let mut fresh = state.clone();
    if state.eigen.stale {
        let (covariance, cache) =
            eigen::refresh(&state.covariance, params.eigen_eps, params.max_eigenvalue)?;
        fresh.covariance = covariance;
        fresh.eigen = cache;
        trace!(
            generation = state.generation,
            condition = fresh.eigen.condition_number(),
            "eigen cache refreshed"
        );
    }
    Ok(fresh)
}

/// Keep the spectrum of C within `[eigen_eps, max_eigenvalue]`
///
/// A scheduled refresh always runs here. Between schedules the Gershgorin
/// enclosure is checked, and the refresh is forced when it cannot prove
/// the bounds.
fn enforce_spectrum(state: CmaEsState, params: &CmaEsParams) -> EsResult<CmaEsState> {
    let due = state.eigen.stale;
    if !due && eigen::spectrum_within(&state.covariance, params.eigen_eps, params.max_eigenvalue) {
        return Ok(state);
    }

    let (covariance, cache) =
        eigen::refresh(&state.covariance, params.eigen_eps, params.max_eigenvalue)?;
    trace!(
        generation = state.generation,
        due,
        condition = cache.condition_number(),
        "eigen cache refreshed after update"
    );
    Ok(CmaEsState {
        covariance,
        eigen: cache,
        ..state
    })
}

/// Sample `popsize` candidates from N(m, σ² C)
///
/// Returns the population (one candidate per row) and the state to pass to
/// the matching [`tell`]. Identical inputs always produce identical output.
pub fn ask(
    key: PrngKey,
    state: &CmaEsState,
    params: &CmaEsParams,
) -> EsResult<(Population, CmaEsState)> {
    let n = params.num_dims;
    if state.dimension() != n {
        return Err(StrategyError::length("state mean", n, state.dimension()));
    }

    let state = ensure_fresh(state, params)?;
    let mut rng = key.rng();

    // z ~ N(0, I), drawn row by row
    let z = DMatrix::<f64>::from_row_iterator(
        params.popsize,
        n,
        (0..params.popsize * n).map(|_| StandardNormal.sample(&mut rng)),
    );

    // y = B diag(sqrt(D)) z  =>  rows: Y = Z diag(sqrt(D)) Bᵗ
    let scaled = DMatrix::from_diagonal(&state.eigen.axis_lengths());
    let y = z * scaled * state.eigen.eigenvectors.transpose();

    let mut population = y * state.sigma;
    let mean_row = state.mean.transpose();
    for mut row in population.row_iter_mut() {
        row += &mean_row;
    }

    if params.clip_min.is_some() || params.clip_max.is_some() {
        let lo = params.clip_min.unwrap_or(f64::NEG_INFINITY);
        let hi = params.clip_max.unwrap_or(f64::INFINITY);
        population.apply(|x| *x = x.clamp(lo, hi));
    }

    Ok((population, state))
}

/// Check population and fitness against the parameters
fn validate_tell_inputs(
    population: &Population,
    fitness: &FitnessVector,
    state: &CmaEsState,
    params: &CmaEsParams,
) -> EsResult<()> {
    let expected = (params.popsize, params.num_dims);
    let actual = population.shape();
    if actual != expected {
        return Err(StrategyError::shape("population", expected, actual));
    }
    if fitness.len() != params.popsize {
        return Err(StrategyError::length("fitness", params.popsize, fitness.len()));
    }
    if state.dimension() != params.num_dims {
        return Err(StrategyError::length(
            "state mean",
            params.num_dims,
            state.dimension(),
        ));
    }
    if let Some((index, &value)) = fitness.iter().enumerate().find(|(_, f)| !f.is_finite()) {
        return Err(StrategyError::NonFiniteFitness { index, value });
    }
    Ok(())
}

/// Update the distribution from an evaluated population
///
/// `population` must be the matrix returned by [`ask`] for this state and
/// `fitness` must be index-aligned with its rows (lower is better). Shape
/// and fitness errors reject the update and leave the caller's state as it
/// was. Every eigenvalue of the returned covariance lies within
/// `[eigen_eps, max_eigenvalue]`.
pub fn tell(
    population: &Population,
    fitness: &FitnessVector,
    state: &CmaEsState,
    params: &CmaEsParams,
) -> EsResult<CmaEsState> {
    validate_tell_inputs(population, fitness, state, params)?;

    // The factorization is deterministic, so refreshing here reproduces the
    // basis `ask` sampled from even if the caller dropped the asked state.
    let state = ensure_fresh(state, params)?;
    let next = update::advance(population, fitness, &state, params);

    if !next.is_finite() {
        return Err(StrategyError::NumericalInstability(format!(
            "update at generation {} produced non-finite values",
            state.generation
        )));
    }

    enforce_spectrum(next, params)
}

/// CMA-ES as an [`EvolutionStrategy`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CmaEs;

impl CmaEs {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

impl EvolutionStrategy for CmaEs {
    type Params = CmaEsParams;
    type State = CmaEsState;

    fn name(&self) -> &'static str {
        "CMA-ES"
    }

    fn initialize(&self, key: PrngKey, params: &CmaEsParams) -> EsResult<CmaEsState> {
        initialize(key, params)
    }

    fn ask(
        &self,
        key: PrngKey,
        state: &CmaEsState,
        params: &CmaEsParams,
    ) -> EsResult<(Population, CmaEsState)> {
        ask(key, state, params)
    }

    fn tell(
        &self,
        population: &Population,
        fitness: &FitnessVector,
        state: &CmaEsState,
        params: &CmaEsParams,
    ) -> EsResult<CmaEsState> {
        tell(population, fitness, state, params)
    }

    fn best<'a>(&self, state: &'a CmaEsState) -> (&'a [f64], f64) {
        (state.best_member.as_slice(), state.best_fitness)
    }

    fn generation(&self, state: &CmaEsState) -> usize {
        state.generation
    }

    fn evaluations(&self, state: &CmaEsState) -> usize {
        state.evaluations
    }

    fn step_size(&self, state: &CmaEsState) -> Option<f64> {
        Some(state.sigma)
    }

    fn axis_ratio(&self, state: &CmaEsState) -> Option<f64> {
        Some(state.eigen.condition_number().sqrt())
    }

    fn should_stop(
        &self,
        fitness: &FitnessVector,
        state: &CmaEsState,
        params: &CmaEsParams,
    ) -> Option<&'static str> {
        check_termination(fitness, state, params).map(|t| t.reason())
    }
}
