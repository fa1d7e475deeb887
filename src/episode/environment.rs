use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent_engine::state::ComputerUpdate;
use crate::errors::ArenaResult;

/// One observation from the benchmark environment.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// Encoded full-screen screenshot (PNG or JPEG).
    pub screenshot: Vec<u8>,
    /// Encoded image of the focused window, when the environment provides one.
    pub window_image: Option<Vec<u8>>,
    /// `[left, top, right, bottom]` of the focused window.
    pub window_rect: Option<[i32; 4]>,
    pub window_title: String,
    pub window_names_str: String,
    pub computer_clipboard: String,
}

#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// `None` when the environment could not produce an observation.
    pub observation: Option<Observation>,
    pub reward: f64,
    pub done: bool,
    pub info: serde_json::Value,
}

/// A benchmark task as loaded from its JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: String,
    pub instruction: String,
    /// Evaluator and setup fields, passed through to the environment.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The controlled computer the agent acts on.
///
/// Implementations live outside this crate; methods take `&self` so a call
/// can be retried from a closure.
#[async_trait]
pub trait Environment: Send + Sync {
    async fn reset(&self, task: &TaskConfig) -> ArenaResult<Option<Observation>>;

    async fn step(&self, action: &str, sleep_after_execution: f64) -> ArenaResult<StepOutcome>;

    /// Score of the finished episode.
    async fn evaluate(&self) -> ArenaResult<f64>;

    /// Tell the environment which region normalized coordinates refer to.
    async fn update_computer(&self, _update: &ComputerUpdate) -> ArenaResult<()> {
        Ok(())
    }
}
