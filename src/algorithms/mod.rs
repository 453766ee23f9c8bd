//! Evolution strategies
//!
//! This module provides the strategy contract, the CMA-ES engine, batched
//! execution over independent instances and the run driver.

pub mod batch;
pub mod cma_es;
pub mod driver;
pub mod traits;

pub mod prelude {
    pub use super::batch::{ask_batch, initialize_batch, tell_batch};
    pub use super::cma_es::{
        ask, check_termination, initialize, tell, CmaEs, CmaEsParams, CmaEsState,
        CmaEsTermination, EigenCache, TerminationTolerances,
    };
    pub use super::driver::{EsRun, RunOutcome};
    pub use super::traits::{EvolutionStrategy, FitnessVector, Population};
}
