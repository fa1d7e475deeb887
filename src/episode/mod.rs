//! Benchmark episode orchestration around an external [`Environment`].
pub mod budget;
pub mod environment;
pub mod recorder;
pub mod runner;
pub mod timeout;

pub use environment::{Environment, Observation, StepOutcome, TaskConfig};
pub use recorder::TrajectoryRecorder;
pub use runner::EpisodeRunner;
pub use timeout::TimeoutPolicy;
