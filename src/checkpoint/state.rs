//! Checkpoint state structures
//!
//! Everything needed to resume a run: the strategy parameters and state,
//! plus the key the next generation will split from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::algorithms::driver::RunOutcome;
use crate::algorithms::traits::EvolutionStrategy;
use crate::diagnostics::GenerationStats;
use crate::random::PrngKey;

/// Current checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Complete run state for checkpointing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint<P, S> {
    /// Schema version for forward compatibility
    pub version: u32,
    /// Name of the strategy that produced the state
    pub strategy: String,
    /// Completed generations
    pub generation: usize,
    /// Key to resume with
    pub next_key: PrngKey,
    /// Strategy parameters
    pub params: P,
    /// Strategy state
    pub state: S,
    /// Statistics history
    pub statistics: Vec<GenerationStats>,
    /// Best raw fitness per generation, for resuming look-back criteria
    pub fitness_history: Vec<f64>,
    /// Custom metadata
    pub metadata: HashMap<String, String>,
}

impl<P, S> Checkpoint<P, S> {
    /// Create a new checkpoint
    pub fn new(
        strategy: impl Into<String>,
        generation: usize,
        next_key: PrngKey,
        params: P,
        state: S,
    ) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            strategy: strategy.into(),
            generation,
            next_key,
            params,
            state,
            statistics: Vec::new(),
            fitness_history: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Capture the end of a driven run
    pub fn from_outcome<E>(strategy: &E, params: &P, outcome: &RunOutcome<S>) -> Self
    where
        E: EvolutionStrategy<Params = P, State = S>,
        P: Clone,
        S: Clone,
    {
        Self::new(
            strategy.name(),
            outcome.generations,
            outcome.next_key,
            params.clone(),
            outcome.state.clone(),
        )
        .with_statistics(outcome.stats.generations.clone())
        .with_fitness_history(outcome.fitness_history.clone())
    }

    /// Attach statistics history
    pub fn with_statistics(mut self, stats: Vec<GenerationStats>) -> Self {
        self.statistics = stats;
        self
    }

    /// Attach the per-generation best fitness history
    pub fn with_fitness_history(mut self, history: Vec<f64>) -> Self {
        self.fitness_history = history;
        self
    }

    /// Add custom metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if checkpoint is compatible with current version
    pub fn is_compatible(&self) -> bool {
        self.version <= CHECKPOINT_VERSION
    }

    /// Get the checkpoint version
    pub fn version(&self) -> u32 {
        self.version
    }
}
