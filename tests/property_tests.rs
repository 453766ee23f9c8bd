//! Property-based tests for fugue-es
//!
//! Uses proptest to verify invariants of the CMA-ES engine and its helpers.

use fugue_es::fitness::shaping::centered_ranks;
use fugue_es::prelude::*;
use nalgebra::{DVector, SymmetricEigen};
use proptest::prelude::*;

fn run_generations(
    seed: u64,
    params: &CmaEsParams,
    generations: usize,
    objective: &impl Evaluator,
) -> Vec<CmaEsState> {
    let mut key = PrngKey::new(seed);
    let mut state = initialize(key, params).unwrap();
    let mut history = Vec::with_capacity(generations);
    for _ in 0..generations {
        let (next, generation_key) = key.split();
        key = next;
        let (population, asked) = ask(generation_key, &state, params).unwrap();
        let fitness = objective.evaluate(generation_key.fold_in(1), &population);
        state = tell(&population, &fitness, &asked, params).unwrap();
        history.push(state.clone());
    }
    history
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // ==================== Sampling Properties ====================

    #[test]
    fn ask_shape_is_popsize_by_dims(dim in 1usize..12, popsize in 2usize..30, seed in any::<u64>()) {
        let params = CmaEsParams::new(dim, popsize);
        let state = initialize(PrngKey::new(0), &params).unwrap();
        let (population, _) = ask(PrngKey::new(seed), &state, &params).unwrap();

        prop_assert_eq!(population.nrows(), popsize);
        prop_assert_eq!(population.ncols(), dim);
        prop_assert!(population.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ask_is_deterministic_for_a_key(dim in 1usize..8, seed in any::<u64>()) {
        let params = CmaEsParams::new(dim, 10);
        let state = initialize(PrngKey::new(0), &params).unwrap();

        let (first, _) = ask(PrngKey::new(seed), &state, &params).unwrap();
        let (second, _) = ask(PrngKey::new(seed), &state, &params).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn ask_respects_clip_bounds(dim in 1usize..8, half_width in 0.01f64..2.0, seed in any::<u64>()) {
        let params = CmaEsParams::new(dim, 12)
            .with_init_sigma(5.0)
            .with_clip_bounds(-half_width, half_width);
        let state = initialize(PrngKey::new(0), &params).unwrap();
        let (population, _) = ask(PrngKey::new(seed), &state, &params).unwrap();

        prop_assert!(population.iter().all(|v| *v >= -half_width && *v <= half_width));
    }

    // ==================== Update Properties ====================

    #[test]
    fn tell_keeps_distribution_valid(dim in 2usize..6, period in 1usize..4, seed in any::<u64>()) {
        let (floor, ceiling) = (0.05, 4.0);
        let params = CmaEsParams::new(dim, CmaEsParams::default_popsize(dim))
            .with_init_sigma(0.8)
            .with_sigma_bounds(1e-6, 10.0)
            .with_eigen_bounds(floor, ceiling)
            .with_eigen_decomp_period(period);
        let history = run_generations(seed, &params, 15, &Rastrigin::new(dim));

        for state in &history {
            prop_assert!(state.is_finite());
            prop_assert!(state.sigma >= params.sigma_min && state.sigma <= params.sigma_max);

            let c = &state.covariance;
            for i in 0..dim {
                for j in 0..dim {
                    prop_assert!((c[(i, j)] - c[(j, i)]).abs() < 1e-12);
                }
            }
            let eigenvalues = SymmetricEigen::new(state.covariance.clone()).eigenvalues;
            for &d in eigenvalues.iter() {
                prop_assert!(d >= floor - 1e-9 && d <= ceiling + 1e-9);
            }
        }
    }

    #[test]
    fn best_fitness_never_increases(dim in 1usize..6, seed in any::<u64>()) {
        let params = CmaEsParams::new(dim, 8).with_init_sigma(1.0);
        let history = run_generations(seed, &params, 12, &Sphere::new(dim));

        for pair in history.windows(2) {
            prop_assert!(pair[1].best_fitness <= pair[0].best_fitness);
        }
    }

    #[test]
    fn counters_advance_per_generation(dim in 1usize..6, popsize in 2usize..16, seed in any::<u64>()) {
        let params = CmaEsParams::new(dim, popsize);
        let history = run_generations(seed, &params, 5, &Sphere::new(dim));

        for (i, state) in history.iter().enumerate() {
            prop_assert_eq!(state.generation, i + 1);
            prop_assert_eq!(state.evaluations, (i + 1) * popsize);
        }
    }

    // ==================== Parameter Properties ====================

    #[test]
    fn weights_sum_to_one_and_decrease(
        dim in 1usize..50,
        popsize in 2usize..200,
        elite_ratio in 0.05f64..1.0
    ) {
        let params = CmaEsParams::new(dim, popsize).with_elite_ratio(elite_ratio);
        prop_assume!(params.mu >= 1);

        prop_assert_eq!(params.weights.len(), params.mu);
        prop_assert!(params.mu >= 1 && params.mu <= popsize);
        prop_assert!((params.weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for pair in params.weights.windows(2) {
            prop_assert!(pair[0] >= pair[1]);
        }
        prop_assert!(params.mu_eff >= 1.0 && params.mu_eff <= params.mu as f64 + 1e-9);
    }

    #[test]
    fn default_params_validate(dim in 1usize..100) {
        let params = CmaEsParams::new(dim, CmaEsParams::default_popsize(dim));
        prop_assert!(params.validate().is_ok());
    }

    // ==================== Shaping Properties ====================

    #[test]
    fn centered_ranks_preserve_order(values in prop::collection::vec(-1e6..1e6f64, 2..40)) {
        let fitness = DVector::from_vec(values);
        let ranks = centered_ranks(&fitness);

        prop_assert!(ranks.iter().all(|r| (-0.5..=0.5).contains(r)));
        for i in 0..fitness.len() {
            for j in 0..fitness.len() {
                if fitness[i] < fitness[j] {
                    prop_assert!(ranks[i] < ranks[j]);
                }
            }
        }
    }

    // ==================== Key Properties ====================

    #[test]
    fn key_split_is_deterministic(seed in any::<u64>()) {
        let key = PrngKey::new(seed);
        prop_assert_eq!(key.split(), key.split());
        prop_assert_eq!(key.split_n(4), key.split_n(4));

        let (a, b) = key.split();
        prop_assert_ne!(a, b);
    }

    // ==================== Benchmark Properties ====================

    #[test]
    fn benchmarks_are_minimal_at_their_optimum(dim in 2usize..10) {
        let sphere = Sphere::new(dim);
        let rastrigin = Rastrigin::new(dim);
        let rosenbrock = Rosenbrock::new(dim);

        prop_assert!(sphere.evaluate_raw(&vec![0.0; dim]).abs() < 1e-12);
        prop_assert!(rastrigin.evaluate_raw(&vec![0.0; dim]).abs() < 1e-12);
        prop_assert!(rosenbrock.evaluate_raw(&vec![1.0; dim]).abs() < 1e-12);
        prop_assert!(sphere.evaluate_raw(&vec![0.1; dim]) > 0.0);
    }
}
