//! Fitness evaluation, shaping and benchmarks
//!
//! This module provides the evaluator abstraction, fitness shaping and
//! benchmark functions.

pub mod benchmarks;
pub mod shaping;
pub mod traits;

pub mod prelude {
    pub use super::benchmarks::*;
    pub use super::shaping::FitnessShaper;
    pub use super::traits::*;
}
