//! Fitness traits
//!
//! This module defines the evaluation contract between a strategy run and
//! the objective. An evaluator maps a whole population to a fitness vector
//! whose entries are aligned with the population rows. Lower is better.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use nalgebra::DVector;

use crate::algorithms::traits::{FitnessVector, Population};
use crate::random::PrngKey;

/// Population evaluation trait
///
/// The key lets stochastic objectives (noisy simulations, rollouts) draw
/// their randomness reproducibly. Deterministic objectives ignore it.
#[cfg(feature = "parallel")]
pub trait Evaluator: Send + Sync {
    /// Evaluate every row of the population (lower = better)
    fn evaluate(&self, key: PrngKey, population: &Population) -> FitnessVector;
}

/// Population evaluation trait (non-parallel version)
#[cfg(not(feature = "parallel"))]
pub trait Evaluator {
    /// Evaluate every row of the population (lower = better)
    fn evaluate(&self, key: PrngKey, population: &Population) -> FitnessVector;
}

/// Copy the rows of a population into owned vectors
fn rows(population: &Population) -> Vec<Vec<f64>> {
    population
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Apply a per-candidate objective to every row (parallel)
#[cfg(feature = "parallel")]
pub fn evaluate_rows<F>(population: &Population, f: F) -> FitnessVector
where
    F: Fn(&[f64]) -> f64 + Sync + Send,
{
    let values: Vec<f64> = rows(population).par_iter().map(|x| f(x.as_slice())).collect();
    DVector::from_vec(values)
}

/// Apply a per-candidate objective to every row (sequential fallback)
#[cfg(not(feature = "parallel"))]
pub fn evaluate_rows<F>(population: &Population, f: F) -> FitnessVector
where
    F: Fn(&[f64]) -> f64,
{
    let values: Vec<f64> = rows(population).iter().map(|x| f(x.as_slice())).collect();
    DVector::from_vec(values)
}

/// Evaluator built from a function of a single candidate
pub struct RowEvaluator<F>
where
    F: Fn(&[f64]) -> f64,
{
    f: F,
}

impl<F> RowEvaluator<F>
where
    F: Fn(&[f64]) -> f64,
{
    /// Wrap a per-candidate objective
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[cfg(feature = "parallel")]
impl<F> Evaluator for RowEvaluator<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn evaluate(&self, _key: PrngKey, population: &Population) -> FitnessVector {
        evaluate_rows(population, &self.f)
    }
}

#[cfg(not(feature = "parallel"))]
impl<F> Evaluator for RowEvaluator<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn evaluate(&self, _key: PrngKey, population: &Population) -> FitnessVector {
        evaluate_rows(population, &self.f)
    }
}

/// Evaluator built from a function of the whole population
///
/// Use this when the objective is naturally batched or needs the key.
pub struct FnEvaluator<F>
where
    F: Fn(PrngKey, &Population) -> FitnessVector,
{
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(PrngKey, &Population) -> FitnessVector,
{
    /// Wrap a population-level objective
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[cfg(feature = "parallel")]
impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(PrngKey, &Population) -> FitnessVector + Send + Sync,
{
    fn evaluate(&self, key: PrngKey, population: &Population) -> FitnessVector {
        (self.f)(key, population)
    }
}

#[cfg(not(feature = "parallel"))]
impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(PrngKey, &Population) -> FitnessVector,
{
    fn evaluate(&self, key: PrngKey, population: &Population) -> FitnessVector {
        (self.f)(key, population)
    }
}
