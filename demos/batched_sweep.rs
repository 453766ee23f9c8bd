//! Batched Step-Size Sweep
//!
//! This example runs several independent CMA-ES instances side by side,
//! one per initial step size, using the batched ask/tell functions. With
//! the `parallel` feature each generation is mapped over the rayon pool.

use fugue_es::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Batched Step-Size Sweep ===\n");

    const DIM: usize = 8;
    const GENERATIONS: usize = 150;
    let sigmas = [0.01, 0.1, 0.5, 1.0, 3.0];

    let strategy = CmaEs::new();
    let objective = Rastrigin::new(DIM);
    let params: Vec<CmaEsParams> = sigmas
        .iter()
        .map(|&sigma| {
            CmaEsParams::new(DIM, 24)
                .with_init_mean(vec![2.0; DIM])
                .with_init_sigma(sigma)
        })
        .collect();

    let mut key = PrngKey::new(7);
    let (next, init_key) = key.split();
    key = next;

    let mut states = Vec::with_capacity(params.len());
    for result in initialize_batch(&strategy, &init_key.split_n(params.len()), &params)? {
        states.push(result?);
    }

    for _ in 0..GENERATIONS {
        let (next, generation_key) = key.split();
        key = next;
        let keys = generation_key.split_n(params.len());

        let mut populations = Vec::with_capacity(params.len());
        let mut asked = Vec::with_capacity(params.len());
        for result in ask_batch(&strategy, &keys, &states, &params)? {
            let (population, state) = result?;
            populations.push(population);
            asked.push(state);
        }

        let fitnesses: Vec<FitnessVector> = populations
            .iter()
            .zip(&keys)
            .map(|(population, key)| objective.evaluate(key.fold_in(1), population))
            .collect();

        let mut told = Vec::with_capacity(params.len());
        for result in tell_batch(&strategy, &populations, &fitnesses, &asked, &params)? {
            told.push(result?);
        }
        states = told;
    }

    println!("{:>10} {:>16} {:>12}", "sigma0", "best fitness", "final sigma");
    for (sigma, state) in sigmas.iter().zip(&states) {
        println!(
            "{:>10.3} {:>16.6} {:>12.3e}",
            sigma, state.best_fitness, state.sigma
        );
    }

    Ok(())
}
