//! Fitness shaping
//!
//! Monotone transforms applied to raw fitness before `tell`. Rank-based
//! shaping makes a strategy invariant to the scale of the objective, and
//! an L2 penalty on the candidates acts as weight decay when the rows are
//! network parameters.

use std::cmp::Ordering;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::algorithms::traits::{FitnessVector, Population};

/// Added to the standard deviation before z-scoring
const Z_SCORE_EPS: f64 = 1e-10;

/// Fitness shaping configuration
///
/// Transforms are applied in a fixed order: maximize, weight decay,
/// centered rank, z-score. The penalty is added after negation so it
/// always pushes towards small parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessShaper {
    /// Replace fitness by its rank, rescaled into [-0.5, 0.5]
    pub centered_rank: bool,
    /// Standardize fitness to zero mean and unit variance
    pub z_score: bool,
    /// Coefficient of the `mean(x²)` penalty added per candidate
    pub weight_decay: f64,
    /// Treat the raw fitness as a score to maximize
    pub maximize: bool,
}

impl FitnessShaper {
    /// Identity shaper
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable centered ranks
    pub fn with_centered_rank(mut self, enabled: bool) -> Self {
        self.centered_rank = enabled;
        self
    }

    /// Enable z-scoring
    pub fn with_z_score(mut self, enabled: bool) -> Self {
        self.z_score = enabled;
        self
    }

    /// Set the weight decay coefficient
    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Negate fitness so that higher raw scores win
    pub fn with_maximize(mut self, maximize: bool) -> Self {
        self.maximize = maximize;
        self
    }

    /// Whether shaping leaves fitness untouched
    pub fn is_identity(&self) -> bool {
        !self.centered_rank && !self.z_score && self.weight_decay == 0.0 && !self.maximize
    }

    /// Shape a fitness vector aligned with the population rows
    pub fn shape(&self, population: &Population, fitness: &FitnessVector) -> FitnessVector {
        let mut shaped = fitness.clone();

        if self.maximize {
            shaped = -shaped;
        }
        if self.weight_decay != 0.0 {
            shaped += l2_penalty(population) * self.weight_decay;
        }
        if self.centered_rank {
            shaped = centered_ranks(&shaped);
        }
        if self.z_score {
            shaped = z_score(&shaped);
        }

        shaped
    }
}

/// Mean of squared coordinates per row
pub fn l2_penalty(population: &Population) -> DVector<f64> {
    let n = population.ncols().max(1) as f64;
    DVector::from_iterator(
        population.nrows(),
        population.row_iter().map(|row| row.norm_squared() / n),
    )
}

/// Ranks rescaled into [-0.5, 0.5]; the lowest value maps to -0.5
///
/// Ties are ranked in population order.
pub fn centered_ranks(fitness: &FitnessVector) -> FitnessVector {
    let n = fitness.len();
    if n < 2 {
        return DVector::zeros(n);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        fitness[a]
            .partial_cmp(&fitness[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = DVector::zeros(n);
    let scale = (n - 1) as f64;
    for (rank, &i) in order.iter().enumerate() {
        ranks[i] = rank as f64 / scale - 0.5;
    }
    ranks
}

/// Standardize to zero mean and unit variance
pub fn z_score(fitness: &FitnessVector) -> FitnessVector {
    if fitness.is_empty() {
        return fitness.clone();
    }
    let mean = fitness.mean();
    let std = fitness.map(|f| (f - mean).powi(2)).mean().sqrt();
    fitness.map(|f| (f - mean) / (std + Z_SCORE_EPS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn population(n: usize) -> Population {
        DMatrix::zeros(n, 2)
    }

    #[test]
    fn test_identity() {
        let shaper = FitnessShaper::new();
        let fitness = DVector::from_vec(vec![3.0, -1.0, 2.0]);
        assert!(shaper.is_identity());
        assert_eq!(shaper.shape(&population(3), &fitness), fitness);
    }

    #[test]
    fn test_centered_ranks() {
        let fitness = DVector::from_vec(vec![10.0, -3.0, 4.0, 7.0, 0.0]);
        let ranks = centered_ranks(&fitness);
        assert_relative_eq!(
            ranks,
            DVector::from_vec(vec![0.5, -0.5, 0.0, 0.25, -0.25])
        );
    }

    #[test]
    fn test_centered_ranks_ties_and_small() {
        let ranks = centered_ranks(&DVector::from_vec(vec![1.0, 1.0, 0.0]));
        assert_relative_eq!(ranks, DVector::from_vec(vec![0.0, 0.5, -0.5]));

        assert_eq!(centered_ranks(&DVector::from_vec(vec![4.0])), DVector::zeros(1));
    }

    #[test]
    fn test_z_score() {
        let shaped = z_score(&DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]));
        assert_relative_eq!(shaped.mean(), 0.0, epsilon = 1e-12);
        let var = shaped.map(|f| f * f).mean();
        assert_relative_eq!(var, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_maximize_reverses_order() {
        let shaper = FitnessShaper::new().with_maximize(true).with_centered_rank(true);
        let fitness = DVector::from_vec(vec![1.0, 5.0, 3.0]);
        let shaped = shaper.shape(&population(3), &fitness);
        // Highest score becomes the lowest (best) shaped value
        assert_relative_eq!(shaped, DVector::from_vec(vec![0.5, -0.5, 0.0]));
    }

    #[test]
    fn test_weight_decay() {
        let population = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 3.0, 1.0]);
        let fitness = DVector::from_vec(vec![0.0, 0.0]);
        let shaped = FitnessShaper::new()
            .with_weight_decay(0.1)
            .shape(&population, &fitness);
        assert_relative_eq!(shaped, DVector::from_vec(vec![0.1, 0.5]));
    }

    #[test]
    fn test_weight_decay_when_maximizing() {
        // Equal scores: the small-norm candidate must still win
        let population = DMatrix::from_row_slice(2, 2, &[0.1, 0.1, 10.0, 10.0]);
        let fitness = DVector::from_vec(vec![1.0, 1.0]);
        let shaped = FitnessShaper::new()
            .with_maximize(true)
            .with_weight_decay(0.1)
            .shape(&population, &fitness);

        assert_relative_eq!(shaped, DVector::from_vec(vec![-0.999, 9.0]), epsilon = 1e-12);
        assert!(shaped[0] < shaped[1]);
    }

    #[test]
    fn test_shaping_preserves_ordering() {
        let shaper = FitnessShaper::new().with_centered_rank(true).with_z_score(true);
        let fitness = DVector::from_vec(vec![0.3, 12.0, -7.0, 1.5]);
        let shaped = shaper.shape(&population(4), &fitness);
        for i in 0..4 {
            for j in 0..4 {
                if fitness[i] < fitness[j] {
                    assert!(shaped[i] < shaped[j]);
                }
            }
        }
    }
}
