//! Benchmark fitness functions
//!
//! This module provides standard benchmark functions for testing evolution
//! strategies. Every function is minimized and evaluates a population row
//! by row through [`Evaluator`].

use std::f64::consts::PI;

use crate::algorithms::traits::{FitnessVector, Population};
use crate::fitness::traits::{evaluate_rows, Evaluator};
use crate::random::PrngKey;

/// Trait for benchmark functions
pub trait BenchmarkFunction: Send + Sync {
    /// Name of the benchmark function
    fn name(&self) -> &'static str;

    /// Dimensionality of the problem
    fn dimension(&self) -> usize;

    /// Search space bounds (min, max)
    fn bounds(&self) -> (f64, f64);

    /// Optimal (minimum) fitness value
    fn optimal_fitness(&self) -> f64;

    /// Optimal solution (if known)
    fn optimal_solution(&self) -> Option<Vec<f64>>;

    /// Evaluate the function at a single point (value to be MINIMIZED)
    fn evaluate_raw(&self, x: &[f64]) -> f64;
}

impl<B: BenchmarkFunction> Evaluator for B {
    fn evaluate(&self, _key: PrngKey, population: &Population) -> FitnessVector {
        evaluate_rows(population, |x| self.evaluate_raw(x))
    }
}

/// Sphere function: f(x) = Σxᵢ²
///
/// Unimodal, convex, separable. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Sphere {
    dimension: usize,
}

impl Sphere {
    /// Create a new Sphere function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Sphere {
    fn name(&self) -> &'static str {
        "Sphere"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.12, 5.12)
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(vec![0.0; self.dimension])
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter().map(|xi| xi * xi).sum()
    }
}

/// Shifted quadratic: f(x) = Σ(xᵢ - tᵢ)²
///
/// Sphere moved to an arbitrary target, so a run starting at the origin
/// has to travel.
#[derive(Clone, Debug)]
pub struct ShiftedQuadratic {
    target: Vec<f64>,
}

impl ShiftedQuadratic {
    /// Create a quadratic bowl centred on `target`
    pub fn new(target: Vec<f64>) -> Self {
        Self { target }
    }

    /// The minimizer
    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

impl BenchmarkFunction for ShiftedQuadratic {
    fn name(&self) -> &'static str {
        "ShiftedQuadratic"
    }

    fn dimension(&self) -> usize {
        self.target.len()
    }

    fn bounds(&self) -> (f64, f64) {
        let reach = self
            .target
            .iter()
            .fold(0.0_f64, |acc, t| acc.max(t.abs()));
        (-(reach + 5.0), reach + 5.0)
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(self.target.clone())
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(&self.target)
            .map(|(xi, ti)| (xi - ti).powi(2))
            .sum()
    }
}

/// Rastrigin function: f(x) = 10n + Σ(xᵢ² - 10cos(2πxᵢ))
///
/// Highly multimodal with many local minima. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Rastrigin {
    dimension: usize,
}

impl Rastrigin {
    /// Create a new Rastrigin function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rastrigin {
    fn name(&self) -> &'static str {
        "Rastrigin"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.12, 5.12)
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(vec![0.0; self.dimension])
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        let a = 10.0;
        let n = x.len() as f64;
        a * n
            + x.iter()
                .map(|xi| xi * xi - a * (2.0 * PI * xi).cos())
                .sum::<f64>()
    }
}

/// Rosenbrock function: f(x) = Σ[100(xᵢ₊₁-xᵢ²)² + (1-xᵢ)²]
///
/// Valley structure, non-separable. Optimum at (1,1,...,1).
/// Dimensions below 2 have no valley term and evaluate to (1 - x₀)².
#[derive(Clone, Debug)]
pub struct Rosenbrock {
    dimension: usize,
}

impl Rosenbrock {
    /// Create a new Rosenbrock function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rosenbrock {
    fn name(&self) -> &'static str {
        "Rosenbrock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.0, 10.0)
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(vec![1.0; self.dimension])
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        if x.len() < 2 {
            return x.first().map_or(0.0, |x0| (1.0 - x0).powi(2));
        }
        x.windows(2)
            .map(|w| {
                let xi = w[0];
                let xi1 = w[1];
                100.0 * (xi1 - xi * xi).powi(2) + (1.0 - xi).powi(2)
            })
            .sum()
    }
}
