//! Termination criteria
//!
//! Run-level stop conditions checked by the driver after every generation.
//! Distribution-level checks that need strategy internals live with the
//! strategy (see [`crate::algorithms::cma_es::check_termination`]).

/// Run progress for termination checking
#[derive(Clone, Copy, Debug)]
pub struct RunProgress<'a> {
    /// Completed generations
    pub generation: usize,
    /// Total fitness evaluations so far
    pub evaluations: usize,
    /// Best (lowest) raw fitness found so far
    pub best_fitness: f64,
    /// Best raw fitness per generation, oldest first
    pub fitness_history: &'a [f64],
}

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync {
    /// Check if the run should terminate
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Terminate after a maximum number of generations
#[derive(Clone, Debug)]
pub struct MaxGenerations(pub usize);

impl MaxGenerations {
    /// Create a new max generations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxGenerations {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        progress.generation >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// Terminate after a maximum number of fitness evaluations
#[derive(Clone, Debug)]
pub struct MaxEvaluations(pub usize);

impl MaxEvaluations {
    /// Create a new max evaluations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxEvaluations {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        progress.evaluations >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum evaluations reached"
    }
}

/// Terminate when the best fitness stops improving
#[derive(Clone, Debug)]
pub struct FitnessStagnation {
    /// Number of generations to look back
    pub window: usize,
    /// Minimum improvement threshold
    pub epsilon: f64,
}

impl FitnessStagnation {
    /// Create a new fitness stagnation criterion
    pub fn new(window: usize, epsilon: f64) -> Self {
        Self { window, epsilon }
    }
}

impl TerminationCriterion for FitnessStagnation {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        let history = progress.fitness_history;
        if self.window == 0 || history.len() < self.window {
            return false;
        }

        let window = &history[history.len() - self.window..];
        let first = window[0];
        let last = window[window.len() - 1];

        (first - last).abs() < self.epsilon
    }

    fn reason(&self) -> &'static str {
        "Fitness stagnation detected"
    }
}

/// Terminate when the target fitness is reached (minimization)
#[derive(Clone, Debug)]
pub struct TargetFitness {
    /// Target fitness value
    pub target: f64,
    /// Tolerance for reaching target
    pub tolerance: f64,
}

impl TargetFitness {
    /// Create a new target fitness criterion
    pub fn new(target: f64) -> Self {
        Self {
            target,
            tolerance: 0.0,
        }
    }

    /// Create with a tolerance
    pub fn with_tolerance(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }
}

impl TerminationCriterion for TargetFitness {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        progress.best_fitness <= self.target + self.tolerance
    }

    fn reason(&self) -> &'static str {
        "Target fitness reached"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }

    /// The first criterion that fires, if any
    pub fn triggered(&self, progress: &RunProgress<'_>) -> Option<&dyn TerminationCriterion> {
        self.criteria
            .iter()
            .find(|c| c.should_terminate(progress))
            .map(|c| c.as_ref())
    }
}

impl TerminationCriterion for AnyOf {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        self.criteria.iter().any(|c| c.should_terminate(progress))
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// Combine criteria with AND logic (all must trigger for termination)
pub struct AllOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AllOf {
    /// Create a new AllOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }
}

impl TerminationCriterion for AllOf {
    fn should_terminate(&self, progress: &RunProgress<'_>) -> bool {
        !self.criteria.is_empty() && self.criteria.iter().all(|c| c.should_terminate(progress))
    }

    fn reason(&self) -> &'static str {
        "All criteria met"
    }
}

pub mod prelude {
    pub use super::{
        AllOf, AnyOf, FitnessStagnation, MaxEvaluations, MaxGenerations, RunProgress,
        TargetFitness, TerminationCriterion,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress<'a>(
        generation: usize,
        evaluations: usize,
        best_fitness: f64,
        fitness_history: &'a [f64],
    ) -> RunProgress<'a> {
        RunProgress {
            generation,
            evaluations,
            best_fitness,
            fitness_history,
        }
    }

    #[test]
    fn test_max_generations() {
        let criterion = MaxGenerations::new(100);
        assert!(!criterion.should_terminate(&progress(50, 0, 1.0, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, 1.0, &[])));
        assert!(criterion.should_terminate(&progress(150, 0, 1.0, &[])));
    }

    #[test]
    fn test_max_evaluations() {
        let criterion = MaxEvaluations::new(1000);
        assert!(!criterion.should_terminate(&progress(0, 500, 1.0, &[])));
        assert!(criterion.should_terminate(&progress(0, 1000, 1.0, &[])));
    }

    #[test]
    fn test_target_fitness_minimizes() {
        let criterion = TargetFitness::new(0.0);
        assert!(!criterion.should_terminate(&progress(0, 0, 0.5, &[])));
        assert!(criterion.should_terminate(&progress(0, 0, 0.0, &[])));
        assert!(criterion.should_terminate(&progress(0, 0, -1.0, &[])));

        let loose = TargetFitness::with_tolerance(0.0, 1e-3);
        assert!(loose.should_terminate(&progress(0, 0, 5e-4, &[])));
        assert!(!loose.should_terminate(&progress(0, 0, 2e-3, &[])));
    }

    #[test]
    fn test_fitness_stagnation() {
        let criterion = FitnessStagnation::new(5, 0.01);

        // Not enough history
        let history = [10.0, 8.0, 6.0];
        assert!(!criterion.should_terminate(&progress(3, 0, 6.0, &history)));

        // Still improving
        let history = [10.0, 8.0, 6.0, 4.0, 2.0];
        assert!(!criterion.should_terminate(&progress(5, 0, 2.0, &history)));

        // Stalled
        let history = [10.0, 8.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert!(criterion.should_terminate(&progress(7, 0, 1.0, &history)));
    }

    #[test]
    fn test_any_of() {
        let criterion = AnyOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetFitness::new(0.0)),
        ]);

        assert!(!criterion.should_terminate(&progress(50, 0, 1.0, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, 1.0, &[])));

        let target_hit = progress(50, 0, 0.0, &[]);
        assert!(criterion.should_terminate(&target_hit));
        assert_eq!(
            criterion.triggered(&target_hit).map(|c| c.reason()),
            Some("Target fitness reached")
        );
    }

    #[test]
    fn test_all_of() {
        let criterion = AllOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetFitness::new(0.0)),
        ]);

        assert!(!criterion.should_terminate(&progress(100, 0, 1.0, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, 0.0, &[])));
        assert!(!AllOf::new(Vec::new()).should_terminate(&progress(0, 0, 0.0, &[])));
    }
}
