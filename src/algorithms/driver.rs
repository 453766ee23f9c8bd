//! Run driver
//!
//! [`EsRun`] owns the generation loop around a strategy: split the key,
//! ask, evaluate, shape, tell, record statistics and check termination.
//! The strategy transitions stay pure; the driver is the only place that
//! threads state from one generation to the next.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::traits::{EvolutionStrategy, FitnessVector};
use crate::diagnostics::{EvolutionStats, GenerationStats, TimingStats};
use crate::error::{EsResult, StrategyError};
use crate::fitness::shaping::FitnessShaper;
use crate::fitness::traits::Evaluator;
use crate::random::PrngKey;
use crate::termination::{RunProgress, TerminationCriterion};

/// Generation cap used when none is configured
pub const DEFAULT_MAX_GENERATIONS: usize = 1000;

/// Result of a driven run
#[derive(Clone, Debug)]
pub struct RunOutcome<St> {
    /// Final strategy state
    pub state: St,
    /// Best candidate seen, by raw fitness
    pub best_member: Vec<f64>,
    /// Best raw fitness seen
    pub best_fitness: f64,
    /// Completed generations, including any before a resume
    pub generations: usize,
    /// Fitness evaluations, including any before a resume
    pub evaluations: usize,
    /// Per-generation statistics of this call
    pub stats: EvolutionStats,
    /// Best raw fitness per generation, including any history carried into a resume
    pub fitness_history: Vec<f64>,
    /// Key to pass to [`EsRun::resume`] to continue this run
    pub next_key: PrngKey,
}

/// Generation loop around an evolution strategy
pub struct EsRun<S: EvolutionStrategy> {
    strategy: S,
    params: S::Params,
    shaper: FitnessShaper,
    termination: Option<Box<dyn TerminationCriterion>>,
    max_generations: usize,
}

impl<S: EvolutionStrategy> EsRun<S> {
    /// Create a driver with default settings
    pub fn new(strategy: S, params: S::Params) -> Self {
        Self {
            strategy,
            params,
            shaper: FitnessShaper::default(),
            termination: None,
            max_generations: DEFAULT_MAX_GENERATIONS,
        }
    }

    /// Shape raw fitness before every `tell`
    pub fn with_shaper(mut self, shaper: FitnessShaper) -> Self {
        self.shaper = shaper;
        self
    }

    /// Add a run-level termination criterion
    pub fn with_termination<T>(mut self, termination: T) -> Self
    where
        T: TerminationCriterion + 'static,
    {
        self.termination = Some(Box::new(termination));
        self
    }

    /// Cap the total number of generations
    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }

    /// The driven strategy
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The strategy parameters
    pub fn params(&self) -> &S::Params {
        &self.params
    }

    /// Initialize a fresh state and run until termination
    pub fn run<E>(&self, key: PrngKey, evaluator: &E) -> EsResult<RunOutcome<S::State>>
    where
        E: Evaluator + ?Sized,
    {
        let (key, init_key) = key.split();
        let state = self.strategy.initialize(init_key, &self.params)?;
        debug!(strategy = self.strategy.name(), "run initialized");
        self.resume(key, state, evaluator)
    }

    /// Continue from an existing state until termination
    ///
    /// Resuming with the key a previous call would have used next
    /// reproduces the uninterrupted state trajectory. Run-level criteria
    /// that look back over past generations start from an empty history;
    /// use [`EsRun::resume_with_history`] to carry it over.
    pub fn resume<E>(
        &self,
        key: PrngKey,
        state: S::State,
        evaluator: &E,
    ) -> EsResult<RunOutcome<S::State>>
    where
        E: Evaluator + ?Sized,
    {
        self.resume_with_history(key, state, Vec::new(), evaluator)
    }

    /// Continue from an existing state with the per-generation best fitness
    /// of the generations already run
    ///
    /// With the `fitness_history` of a previous [`RunOutcome`], termination
    /// happens at the same generation as in the uninterrupted run.
    pub fn resume_with_history<E>(
        &self,
        key: PrngKey,
        state: S::State,
        fitness_history: Vec<f64>,
        evaluator: &E,
    ) -> EsResult<RunOutcome<S::State>>
    where
        E: Evaluator + ?Sized,
    {
        let start_time = Instant::now();
        let mut stats = EvolutionStats::new();
        let mut fitness_history = fitness_history;
        let mut key = key;
        let mut state = state;

        let (member, fitness) = self.strategy.best(&state);
        let mut best_member = member.to_vec();
        let mut best_fitness = if self.shaper.is_identity() {
            fitness
        } else {
            f64::INFINITY
        };

        loop {
            if self.strategy.generation(&state) >= self.max_generations {
                stats.set_termination_reason("Maximum generations reached");
                break;
            }

            let gen_start = Instant::now();
            let (next, generation_key) = key.split();
            key = next;
            let (ask_key, eval_key) = generation_key.split();

            let ask_start = Instant::now();
            let (population, asked) = match self.strategy.ask(ask_key, &state, &self.params) {
                Ok(sampled) => sampled,
                Err(StrategyError::NumericalInstability(msg)) => {
                    warn!(
                        generation = self.strategy.generation(&state),
                        error = %msg,
                        "run stopped on numerical instability while sampling"
                    );
                    stats.set_termination_reason("Numerical instability");
                    break;
                }
                Err(e) => return Err(e),
            };
            let ask_time = ask_start.elapsed();

            let eval_start = Instant::now();
            let raw: FitnessVector = evaluator.evaluate(eval_key, &population);
            let eval_time = eval_start.elapsed();

            let shaped = if self.shaper.is_identity() {
                raw.clone()
            } else {
                self.shaper.shape(&population, &raw)
            };

            let tell_start = Instant::now();
            state = match self.strategy.tell(&population, &shaped, &asked, &self.params) {
                Ok(next_state) => next_state,
                Err(StrategyError::NumericalInstability(msg)) => {
                    warn!(
                        generation = self.strategy.generation(&state),
                        error = %msg,
                        "run stopped on numerical instability"
                    );
                    stats.set_termination_reason("Numerical instability");
                    break;
                }
                Err(e) => return Err(e),
            };
            let tell_time = tell_start.elapsed();

            let generation = self.strategy.generation(&state);
            let evaluations = self.strategy.evaluations(&state);

            if let Some((i, &value)) = raw
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            {
                if value < best_fitness {
                    best_fitness = value;
                    best_member = population.row(i).iter().copied().collect();
                }
            }

            let timing = TimingStats::new()
                .with_ask(ask_time)
                .with_evaluation(eval_time)
                .with_tell(tell_time)
                .with_total(gen_start.elapsed());
            let gen_stats = GenerationStats::from_fitness(&raw, generation, evaluations)
                .with_step_size(self.strategy.step_size(&state))
                .with_axis_ratio(self.strategy.axis_ratio(&state))
                .with_timing(timing);

            debug!(
                generation,
                evaluations,
                best = gen_stats.best_fitness,
                mean = gen_stats.mean_fitness,
                step_size = ?gen_stats.step_size,
                "generation complete"
            );

            fitness_history.push(gen_stats.best_fitness);
            stats.record(gen_stats);

            let progress = RunProgress {
                generation,
                evaluations,
                best_fitness,
                fitness_history: &fitness_history,
            };
            if let Some(criterion) = &self.termination {
                if criterion.should_terminate(&progress) {
                    stats.set_termination_reason(criterion.reason());
                    break;
                }
            }
            if let Some(reason) = self.strategy.should_stop(&raw, &state, &self.params) {
                stats.set_termination_reason(reason);
                break;
            }
        }

        stats.set_runtime(start_time.elapsed());
        info!(
            strategy = self.strategy.name(),
            generations = self.strategy.generation(&state),
            best_fitness,
            reason = stats.termination_reason.as_deref().unwrap_or("unknown"),
            "run finished"
        );

        Ok(RunOutcome {
            generations: self.strategy.generation(&state),
            evaluations: self.strategy.evaluations(&state),
            state,
            best_member,
            best_fitness,
            stats,
            fitness_history,
            next_key: key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::cma_es::{CmaEs, CmaEsParams};
    use crate::algorithms::traits::Population;
    use crate::fitness::benchmarks::{ShiftedQuadratic, Sphere};
    use crate::fitness::traits::FnEvaluator;
    use crate::termination::{FitnessStagnation, MaxEvaluations, TargetFitness};
    use nalgebra::DVector;

    #[test]
    fn test_run_reaches_target() {
        let params = CmaEsParams::new(2, 20).with_init_sigma(0.5);
        let outcome = EsRun::new(CmaEs::new(), params)
            .with_termination(TargetFitness::with_tolerance(0.0, 1e-8))
            .with_max_generations(500)
            .run(PrngKey::new(42), &ShiftedQuadratic::new(vec![1.0, 1.0]))
            .unwrap();

        assert!(outcome.best_fitness <= 1e-8);
        assert_eq!(
            outcome.stats.termination_reason.as_deref(),
            Some("Target fitness reached")
        );
        assert_eq!(outcome.generations, outcome.stats.num_generations());
        assert_eq!(outcome.evaluations, outcome.generations * 20);
    }

    #[test]
    fn test_max_generations() {
        let params = CmaEsParams::new(3, 8);
        let outcome = EsRun::new(CmaEs::new(), params)
            .with_max_generations(7)
            .run(PrngKey::new(1), &Sphere::new(3))
            .unwrap();

        assert_eq!(outcome.generations, 7);
        assert_eq!(outcome.stats.num_generations(), 7);
        assert_eq!(
            outcome.stats.termination_reason.as_deref(),
            Some("Maximum generations reached")
        );
        assert!(outcome.stats.step_size_history().iter().all(|s| *s > 0.0));
    }

    #[test]
    fn test_max_evaluations() {
        let params = CmaEsParams::new(2, 10);
        let outcome = EsRun::new(CmaEs::new(), params)
            .with_termination(MaxEvaluations::new(55))
            .run(PrngKey::new(1), &Sphere::new(2))
            .unwrap();
        assert_eq!(outcome.evaluations, 60);
    }

    #[test]
    fn test_run_is_reproducible() {
        let params = CmaEsParams::new(3, 10);
        let run = EsRun::new(CmaEs::new(), params).with_max_generations(15);
        let a = run.run(PrngKey::new(9), &Sphere::new(3)).unwrap();
        let b = run.run(PrngKey::new(9), &Sphere::new(3)).unwrap();
        assert_eq!(a.state, b.state);
        assert_eq!(a.best_member, b.best_member);
    }

    #[test]
    fn test_resume_continues_trajectory() {
        let run = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 8));
        let full = run
            .with_max_generations(20)
            .run(PrngKey::new(3), &Sphere::new(2))
            .unwrap();

        let run = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 8));
        let first = run
            .with_max_generations(8)
            .run(PrngKey::new(3), &Sphere::new(2))
            .unwrap();
        let rest = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 8))
            .with_max_generations(20)
            .resume(first.next_key, first.state, &Sphere::new(2))
            .unwrap();

        assert_eq!(rest.state, full.state);
        assert_eq!(rest.generations, 20);
        assert_eq!(rest.stats.num_generations(), 12);
    }

    #[test]
    fn test_resume_with_history_keeps_stagnation_window() {
        // Any 10-generation window counts as stagnant
        let run = |max_generations| {
            EsRun::new(CmaEs::new(), CmaEsParams::new(2, 8))
                .with_termination(FitnessStagnation::new(10, 1e9))
                .with_max_generations(max_generations)
        };
        let full = run(100).run(PrngKey::new(4), &Sphere::new(2)).unwrap();
        assert_eq!(full.generations, 10);

        let first = run(6).run(PrngKey::new(4), &Sphere::new(2)).unwrap();
        assert_eq!(first.fitness_history.len(), 6);

        let rest = run(100)
            .resume_with_history(
                first.next_key,
                first.state.clone(),
                first.fitness_history.clone(),
                &Sphere::new(2),
            )
            .unwrap();
        assert_eq!(rest.generations, 10);
        assert_eq!(rest.state, full.state);
        assert_eq!(rest.fitness_history, full.fitness_history);

        // Without the history the window has to refill first
        let fresh = run(100)
            .resume(first.next_key, first.state, &Sphere::new(2))
            .unwrap();
        assert_eq!(fresh.generations, 16);
    }

    #[test]
    fn test_maximize_with_shaping() {
        // Score peaks at (2, -1); raw fitness is a score, shaping flips it
        let score = FnEvaluator::new(|_key: PrngKey, population: &Population| {
            DVector::from_iterator(
                population.nrows(),
                population
                    .row_iter()
                    .map(|r| -((r[0] - 2.0).powi(2) + (r[1] + 1.0).powi(2))),
            )
        });
        let shaper = FitnessShaper::new()
            .with_maximize(true)
            .with_centered_rank(true);
        let outcome = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 16))
            .with_shaper(shaper)
            .with_max_generations(120)
            .run(PrngKey::new(5), &score)
            .unwrap();

        assert!((outcome.state.mean[0] - 2.0).abs() < 0.05);
        assert!((outcome.state.mean[1] + 1.0).abs() < 0.05);
    }

    #[test]
    fn test_evaluator_length_mismatch_is_reported() {
        let broken = FnEvaluator::new(|_key: PrngKey, _population: &Population| {
            DVector::from_element(3, 1.0)
        });
        let result = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 6)).run(PrngKey::new(0), &broken);
        assert!(matches!(result, Err(StrategyError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_invalid_params_fail_run() {
        let result = EsRun::new(CmaEs::new(), CmaEsParams::new(2, 1)).run(PrngKey::new(0), &Sphere::new(2));
        assert!(matches!(result, Err(StrategyError::Configuration(_))));
    }
}
