//! Artifact persistence and lifecycle.

mod store;
mod sweeper;

pub use store::ArtifactStore;
pub use sweeper::{start_sweep_task, ArtifactSweeper, SweepStats};
