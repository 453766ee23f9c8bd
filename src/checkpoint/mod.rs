//! Checkpointing support for run persistence
//!
//! A checkpoint stores a strategy's parameters and state together with the
//! key the next generation splits from, so a resumed run continues on the
//! exact trajectory it would have followed without the interruption.

mod recovery;
mod state;

pub use recovery::{load_checkpoint, save_checkpoint, CheckpointFormat, CheckpointManager};
pub use state::{Checkpoint, CHECKPOINT_VERSION};

/// Prelude for checkpoint module
pub mod prelude {
    pub use super::recovery::{CheckpointFormat, CheckpointManager};
    pub use super::state::Checkpoint;
}
