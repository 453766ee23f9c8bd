//! # fugue-es
//!
//! Evolution strategies for black-box optimization in Rust.
//!
//! Strategies are exposed as pure ask/tell transitions over explicit state
//! values, so the same code drives a simple loop, a checkpointed
//! long-running experiment, or a data-parallel batch of independent
//! instances.
//!
//! ## Core Concepts
//!
//! - **Explicit randomness**: every random draw flows from a splittable [`random::PrngKey`]
//! - **Pure transitions**: `initialize`, `ask` and `tell` never mutate their inputs
//! - **CMA-ES**: full covariance adaptation with evolution paths and step-size control
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fugue_es::prelude::*;
//!
//! let params = CmaEsParams::new(10, CmaEsParams::default_popsize(10)).with_init_sigma(0.5);
//!
//! let outcome = EsRun::new(CmaEs::new(), params)
//!     .with_termination(TargetFitness::with_tolerance(0.0, 1e-8))
//!     .with_max_generations(2000)
//!     .run(PrngKey::new(42), &Rosenbrock::new(10))?;
//!
//! println!("best fitness: {}", outcome.best_fitness);
//! ```

pub mod algorithms;
#[cfg(feature = "checkpoint")]
pub mod checkpoint;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod random;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    #[cfg(feature = "checkpoint")]
    pub use crate::checkpoint::prelude::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::random::PrngKey;
    pub use crate::termination::prelude::*;
}
