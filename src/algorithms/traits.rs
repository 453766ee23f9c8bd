//! Strategy traits
//!
//! This module defines the ask/tell contract shared by every evolution
//! strategy in the crate.

use std::fmt::Debug;

use nalgebra::{DMatrix, DVector};

use crate::error::EsResult;
use crate::random::PrngKey;

/// Candidate population, one candidate per row (`popsize x num_dims`)
pub type Population = DMatrix<f64>;

/// Fitness values aligned with the rows of a [`Population`]
pub type FitnessVector = DVector<f64>;

/// Evolution strategy trait
///
/// A strategy is a set of pure transitions over an explicit state value.
/// `ask` samples a population from the current distribution, the caller
/// evaluates it, and `tell` folds the fitness back into a new state. The
/// strategy itself holds no mutable data, so a single strategy value can
/// drive any number of independent `(key, state, params)` instances.
///
/// Fitness follows the minimization convention: lower is better.
pub trait EvolutionStrategy: Send + Sync {
    /// Immutable configuration
    type Params: Clone + Debug + Send + Sync;

    /// Evolving distribution state
    type State: Clone + Debug + Send + Sync;

    /// Short name used in logs and checkpoints
    fn name(&self) -> &'static str;

    /// Validate the parameters and build the first state
    fn initialize(&self, key: PrngKey, params: &Self::Params) -> EsResult<Self::State>;

    /// Sample a population from the current distribution
    ///
    /// Returns the population together with the state to thread into the
    /// matching `tell` (it may carry refreshed cached values).
    fn ask(
        &self,
        key: PrngKey,
        state: &Self::State,
        params: &Self::Params,
    ) -> EsResult<(Population, Self::State)>;

    /// Update the distribution from an evaluated population
    ///
    /// On error the caller's state is untouched and remains valid.
    fn tell(
        &self,
        population: &Population,
        fitness: &FitnessVector,
        state: &Self::State,
        params: &Self::Params,
    ) -> EsResult<Self::State>;

    /// Best member and fitness seen so far
    fn best<'a>(&self, state: &'a Self::State) -> (&'a [f64], f64);

    /// Number of completed `tell` calls
    fn generation(&self, state: &Self::State) -> usize;

    /// Number of fitness values consumed by `tell`
    fn evaluations(&self, state: &Self::State) -> usize;

    /// Global step size, for strategies that adapt one
    fn step_size(&self, _state: &Self::State) -> Option<f64> {
        None
    }

    /// Ratio of the longest to the shortest axis of the search distribution
    fn axis_ratio(&self, _state: &Self::State) -> Option<f64> {
        None
    }

    /// Strategy-specific reason to stop, if any
    ///
    /// `fitness` is the raw fitness of the generation just told.
    fn should_stop(
        &self,
        _fitness: &FitnessVector,
        _state: &Self::State,
        _params: &Self::Params,
    ) -> Option<&'static str> {
        None
    }
}
