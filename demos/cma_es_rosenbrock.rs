//! CMA-ES Optimization Example
//!
//! This example demonstrates the Covariance Matrix Adaptation Evolution
//! Strategy (CMA-ES) driven by an explicit ask/evaluate/tell loop, and then
//! the same optimization through the run driver.
//!
//! CMA-ES adapts both the mean and covariance of a multivariate normal
//! distribution to efficiently search the fitness landscape.

use fugue_es::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== CMA-ES Optimization Example ===\n");

    // Rosenbrock function - a classic test for optimization algorithms
    // The global minimum is at (1, 1, ..., 1) with value 0
    const DIM: usize = 10;

    println!("Problem: {}-D Rosenbrock function", DIM);
    println!("Global optimum: 0.0 at (1, 1, ..., 1)\n");

    let objective = Rosenbrock::new(DIM);
    let params = CmaEsParams::new(DIM, CmaEsParams::default_popsize(DIM))
        .with_init_mean(vec![0.0; DIM])
        .with_init_sigma(0.5);

    // Manual loop: the caller owns the state and the key
    let mut state = initialize(PrngKey::new(0), &params)?;
    let mut key = PrngKey::new(42);
    for _ in 0..1000 {
        let (next, generation_key) = key.split();
        key = next;
        let (ask_key, eval_key) = generation_key.split();

        let (population, asked) = ask(ask_key, &state, &params)?;
        let fitness = objective.evaluate(eval_key, &population);
        state = tell(&population, &fitness, &asked, &params)?;

        if let Some(reason) = check_termination(&fitness, &state, &params) {
            println!("Stopped early: {}", reason.reason());
            break;
        }
    }

    println!("Manual loop:");
    println!("  Best fitness (minimized): {:.10}", state.best_fitness);
    println!("  Generations: {}", state.generation);
    println!("  Evaluations: {}", state.evaluations);
    println!("  Final sigma: {:.6}", state.sigma);

    // Same problem through the driver
    let outcome = EsRun::new(CmaEs::new(), params)
        .with_termination(TargetFitness::with_tolerance(0.0, 1e-10))
        .with_max_generations(1000)
        .run(PrngKey::new(42), &objective)?;

    println!("\nDriver:");
    println!("{}", outcome.stats.summary());

    println!("\nBest solution:");
    for (i, val) in outcome.best_member.iter().enumerate().take(5) {
        println!("  x[{}] = {:.6}", i, val);
    }
    if DIM > 5 {
        println!("  ... ({} more dimensions)", DIM - 5);
    }

    // Calculate distance from optimal solution
    let distance_from_opt: f64 = outcome
        .best_member
        .iter()
        .map(|x| (x - 1.0).powi(2))
        .sum::<f64>()
        .sqrt();

    println!("\nDistance from optimum: {:.10}", distance_from_opt);

    Ok(())
}
