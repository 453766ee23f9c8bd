//! Distribution-level termination checks for CMA-ES
//!
//! These look at the search distribution rather than at the run, and tell
//! the caller that further generations cannot make progress.

use serde::{Deserialize, Serialize};

use super::params::CmaEsParams;
use super::state::CmaEsState;
use crate::algorithms::traits::FitnessVector;

/// Why the distribution stopped being useful
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmaEsTermination {
    /// Fitness values of one generation are all (nearly) equal
    FunctionValueRange,
    /// Search variance and rank-one path vanished in every coordinate
    TolX,
    /// Step size exploded along the longest axis
    SigmaExplosion,
    /// A 0.2 standard deviation step leaves some mean coordinate unchanged
    NoEffectCoordinate,
    /// A 0.1 standard deviation step along the principal axis leaves the mean unchanged
    NoEffectAxis,
    /// The covariance matrix became ill-conditioned
    ConditionNumber,
}

impl CmaEsTermination {
    /// Human readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::FunctionValueRange => "Fitness range below tolerance",
            Self::TolX => "Search variance too small",
            Self::SigmaExplosion => "Step size exploded",
            Self::NoEffectCoordinate => "No effect when adding std to a mean coordinate",
            Self::NoEffectAxis => "No effect when adding std along the principal axis",
            Self::ConditionNumber => "Covariance condition number exploded",
        }
    }
}

/// Check whether CMA-ES should stop, given the latest generation's fitness
pub fn check_termination(
    fitness: &FitnessVector,
    state: &CmaEsState,
    params: &CmaEsParams,
) -> Option<CmaEsTermination> {
    let tol = &params.termination;
    let sigma = state.sigma;
    let diag = state.covariance.diagonal();
    let eigenvalues = &state.eigen.eigenvalues;

    if state.generation > tol.min_generations && !fitness.is_empty() {
        let range = fitness.max() - fitness.min();
        if range < tol.tol_fun {
            return Some(CmaEsTermination::FunctionValueRange);
        }
    }

    let tiny_variance = diag.iter().all(|c| sigma * c.sqrt() < tol.tol_x);
    let tiny_path = state.path_c.iter().all(|p| (sigma * p).abs() < tol.tol_x);
    if tiny_variance && tiny_path {
        return Some(CmaEsTermination::TolX);
    }

    if sigma * eigenvalues.max().sqrt() > tol.tol_x_up {
        return Some(CmaEsTermination::SigmaExplosion);
    }

    let no_effect_coordinate = state
        .mean
        .iter()
        .zip(diag.iter())
        .any(|(&m, &c)| m == m + 0.2 * sigma * c.sqrt());
    if no_effect_coordinate {
        return Some(CmaEsTermination::NoEffectCoordinate);
    }

    // Principal axis of the most recent factorization
    let principal = state.eigen.eigenvalues.imax();
    let axis = state.eigen.eigenvectors.column(principal);
    let axis_scale = 0.1 * sigma * eigenvalues[principal].sqrt();
    let no_effect_axis = state
        .mean
        .iter()
        .zip(axis.iter())
        .all(|(&m, &b)| m == m + axis_scale * b);
    if no_effect_axis {
        return Some(CmaEsTermination::NoEffectAxis);
    }

    if state.eigen.condition_number() > tol.tol_condition_c {
        return Some(CmaEsTermination::ConditionNumber);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn setup() -> (CmaEsParams, CmaEsState) {
        let params = CmaEsParams::new(2, 10).with_init_mean(vec![1.0, -1.0]);
        let state = CmaEsState::new(&params);
        (params, state)
    }

    #[test]
    fn test_fresh_state_does_not_terminate() {
        let (params, state) = setup();
        let fitness = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(check_termination(&fitness, &state, &params), None);
    }

    #[test]
    fn test_function_value_range() {
        let (params, mut state) = setup();
        let flat = DVector::from_element(10, 0.5);

        // Not before min_generations
        assert_eq!(check_termination(&flat, &state, &params), None);

        state.generation = params.termination.min_generations + 1;
        assert_eq!(
            check_termination(&flat, &state, &params),
            Some(CmaEsTermination::FunctionValueRange)
        );
    }

    #[test]
    fn test_tol_x() {
        let (params, mut state) = setup();
        state.sigma = 1e-14;
        let fitness = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(
            check_termination(&fitness, &state, &params),
            Some(CmaEsTermination::TolX)
        );
    }

    #[test]
    fn test_sigma_explosion() {
        let (params, mut state) = setup();
        state.sigma = 1e5;
        let fitness = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(
            check_termination(&fitness, &state, &params),
            Some(CmaEsTermination::SigmaExplosion)
        );
    }

    #[test]
    fn test_no_effect_coordinate() {
        let (params, mut state) = setup();
        state.mean = DVector::from_vec(vec![1e20, 0.0]);
        state.path_c = DVector::from_vec(vec![1.0, 1.0]);
        let fitness = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(
            check_termination(&fitness, &state, &params),
            Some(CmaEsTermination::NoEffectCoordinate)
        );
    }

    #[test]
    fn test_condition_number() {
        let (params, mut state) = setup();
        state.eigen.eigenvalues = DVector::from_vec(vec![1.0, 1e-15]);
        let fitness = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(
            check_termination(&fitness, &state, &params),
            Some(CmaEsTermination::ConditionNumber)
        );
    }
}
