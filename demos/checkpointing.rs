//! Checkpointing and Recovery
//!
//! This example demonstrates how to save and restore a CMA-ES run using
//! checkpoints. The checkpoint carries the key the next generation splits
//! from, so the resumed run lands exactly where an uninterrupted run would.

use fugue_es::prelude::*;
use std::path::{Path, PathBuf};

const DIM: usize = 10;
const TOTAL_GENERATIONS: usize = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpointing and Recovery ===\n");

    let checkpoint_dir = std::env::temp_dir().join("fugue_es_checkpoints");

    // Clean up any existing checkpoints first
    if checkpoint_dir.exists() {
        std::fs::remove_dir_all(&checkpoint_dir)?;
    }

    let interrupted = run_with_checkpoints(&checkpoint_dir)?;

    // Demonstrate resuming (in real usage, this would be after a restart)
    println!("\n--- Simulating resume from checkpoint ---\n");
    let resumed = resume_from_checkpoint(&checkpoint_dir)?;

    // Reference run without interruption
    let reference = EsRun::new(CmaEs::new(), params())
        .with_max_generations(TOTAL_GENERATIONS)
        .run(PrngKey::new(42), &Sphere::new(DIM))?;

    println!(
        "Stopped at generation {}, resumed to {}",
        interrupted, resumed.generation
    );
    println!(
        "Resumed state matches uninterrupted run: {}",
        resumed == reference.state
    );

    // Clean up
    if checkpoint_dir.exists() {
        std::fs::remove_dir_all(&checkpoint_dir)?;
        println!("\nCheckpoint directory cleaned up.");
    }

    Ok(())
}

fn params() -> CmaEsParams {
    CmaEsParams::new(DIM, 16).with_init_sigma(1.0)
}

/// Run for a while, saving every 25 generations, then "crash"
fn run_with_checkpoints(checkpoint_dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let strategy = CmaEs::new();
    let params = params();
    let mut manager = CheckpointManager::new(checkpoint_dir, "evolution")
        .with_format(CheckpointFormat::Json)
        .every(25)
        .keep(3);

    // Same key handling as the driver: split off the initialization key,
    // then split once per generation
    let (mut key, init_key) = PrngKey::new(42).split();
    let mut state = strategy.initialize(init_key, &params)?;
    let objective = Sphere::new(DIM);

    while state.generation < 120 {
        let (next, generation_key) = key.split();
        key = next;
        let (ask_key, eval_key) = generation_key.split();

        let (population, asked) = strategy.ask(ask_key, &state, &params)?;
        let fitness = objective.evaluate(eval_key, &population);
        state = strategy.tell(&population, &fitness, &asked, &params)?;

        if manager.should_save(state.generation) {
            let checkpoint = Checkpoint::new(
                strategy.name(),
                state.generation,
                key,
                params.clone(),
                state.clone(),
            );
            let path: PathBuf = manager.save(&checkpoint)?;
            println!(
                "Generation {:3}: best = {:.6e}, saved {}",
                state.generation,
                state.best_fitness,
                path.display()
            );
        }
    }

    Ok(state.generation)
}

fn resume_from_checkpoint(checkpoint_dir: &Path) -> Result<CmaEsState, Box<dyn std::error::Error>> {
    let mut manager = CheckpointManager::new(checkpoint_dir, "evolution")
        .with_format(CheckpointFormat::Json);
    let checkpoint: Checkpoint<CmaEsParams, CmaEsState> = manager
        .load_latest()?
        .ok_or("no checkpoint found")?;

    println!(
        "Loaded checkpoint from generation {} (strategy {})",
        checkpoint.generation, checkpoint.strategy
    );

    let outcome = EsRun::new(CmaEs::new(), checkpoint.params)
        .with_max_generations(TOTAL_GENERATIONS)
        .resume_with_history(
            checkpoint.next_key,
            checkpoint.state,
            checkpoint.fitness_history,
            &Sphere::new(DIM),
        )?;

    println!(
        "Resumed run finished at generation {} with best fitness {:.6e}",
        outcome.generations, outcome.best_fitness
    );

    Ok(outcome.state)
}
