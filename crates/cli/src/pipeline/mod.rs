//! Drain pipeline: a blocking drain thread feeding an async printer.

mod drain;
mod orchestrator;
mod stats;

pub use drain::{drain_loop, DrainLoopConfig, DrainReport};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::{PipelineStats, PrintStats};
