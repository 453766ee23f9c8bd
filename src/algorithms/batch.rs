//! Batched execution over independent strategy instances
//!
//! Each instance owns its own `(key, state, params)`. Because `ask` and
//! `tell` are pure, a batch is a plain data-parallel map: with the
//! `parallel` feature the map runs on the rayon pool, otherwise it runs
//! sequentially, and both paths return identical results in input order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::traits::{EvolutionStrategy, FitnessVector, Population};
use crate::error::{EsResult, StrategyError};
use crate::random::PrngKey;

/// Map `f` over `0..len` (parallel)
#[cfg(feature = "parallel")]
fn map_instances<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..len).into_par_iter().map(f).collect()
}

/// Map `f` over `0..len` (sequential fallback)
#[cfg(not(feature = "parallel"))]
fn map_instances<T, F>(len: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..len).map(f).collect()
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> EsResult<()> {
    if expected != actual {
        return Err(StrategyError::length(what, expected, actual));
    }
    Ok(())
}

/// Initialize one state per `(key, params)` pair
pub fn initialize_batch<S: EvolutionStrategy>(
    strategy: &S,
    keys: &[PrngKey],
    params: &[S::Params],
) -> EsResult<Vec<EsResult<S::State>>> {
    check_len("batch params", keys.len(), params.len())?;
    Ok(map_instances(keys.len(), |i| {
        strategy.initialize(keys[i], &params[i])
    }))
}

/// Ask every instance for a population
///
/// The outer error reports mismatched batch lengths; per-instance failures
/// are returned in place and do not affect other instances.
pub fn ask_batch<S: EvolutionStrategy>(
    strategy: &S,
    keys: &[PrngKey],
    states: &[S::State],
    params: &[S::Params],
) -> EsResult<Vec<EsResult<(Population, S::State)>>> {
    check_len("batch states", keys.len(), states.len())?;
    check_len("batch params", keys.len(), params.len())?;
    Ok(map_instances(keys.len(), |i| {
        strategy.ask(keys[i], &states[i], &params[i])
    }))
}

/// Tell every instance its evaluated population
pub fn tell_batch<S: EvolutionStrategy>(
    strategy: &S,
    populations: &[Population],
    fitnesses: &[FitnessVector],
    states: &[S::State],
    params: &[S::Params],
) -> EsResult<Vec<EsResult<S::State>>> {
    let n = populations.len();
    check_len("batch fitnesses", n, fitnesses.len())?;
    check_len("batch states", n, states.len())?;
    check_len("batch params", n, params.len())?;
    Ok(map_instances(n, |i| {
        strategy.tell(&populations[i], &fitnesses[i], &states[i], &params[i])
    }))
}
