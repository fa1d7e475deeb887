use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent_engine::session::AgentSession;
use crate::config::EpisodeConfig;
use crate::episode::budget::EpisodeBudget;
use crate::episode::environment::{Environment, TaskConfig};
use crate::episode::recorder::{format_elapsed, timestamp, StepRecord, TrajectoryRecorder};
use crate::episode::timeout::TimeoutPolicy;
use crate::errors::ArenaResult;

/// Drives one benchmark task from reset to evaluation.
pub struct EpisodeRunner {
    config: EpisodeConfig,
    timeouts: TimeoutPolicy,
}

impl EpisodeRunner {
    pub fn new(config: EpisodeConfig) -> Self {
        let timeouts = TimeoutPolicy::from_config(&config);
        Self { config, timeouts }
    }

    /// `{episode.result_dir}/{task id}`.
    pub fn example_result_dir(&self, task: &TaskConfig) -> PathBuf {
        self.config.result_dir.join(&task.id)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Run the agent loop on `task` and return the evaluator's score.
    ///
    /// The trajectory and `result.txt` are written under `result_dir`.
    pub async fn run_single_example<E>(
        &self,
        session: &mut AgentSession,
        env: &E,
        task: &TaskConfig,
        instruction: &str,
        result_dir: &Path,
    ) -> ArenaResult<f64>
    where
        E: Environment + ?Sized,
    {
        session.reset();
        let mut obs = self.timeouts.run("reset", || env.reset(task)).await?;

        let start = chrono::Local::now();
        let mut recorder = TrajectoryRecorder::new(result_dir)?;
        recorder.record_init(obs.as_ref(), task, timestamp(start))?;
        tracing::info!(
            task = %task.id,
            run_id = %recorder.run_id,
            dir = %result_dir.display(),
            "episode started"
        );

        let budget = EpisodeBudget::from_config(&self.config);
        let mut done = false;
        let mut step_idx: u32 = 0;

        while !done {
            if let Some(reason) = budget.check(step_idx) {
                tracing::info!(step_idx, ?reason, "episode budget reached");
                break;
            }

            let Some(current) = obs.as_ref() else {
                tracing::error!(step_idx, "observation is missing, waiting before the next step");
                let wait = Duration::from_secs(self.config.none_observation_wait_secs);
                tokio::time::sleep(wait).await;
                step_idx += 1;
                continue;
            };

            tracing::info!(step_idx, "agent thinking");
            let turn = session.predict(instruction, current).await?;
            env.update_computer(&turn.computer_update).await?;

            for action in &turn.actions {
                let now = chrono::Local::now();
                let action_timestamp = timestamp(now);
                let elapsed = format_elapsed(now - start);
                tracing::info!(step = step_idx + 1, action = %action, "executing action");

                let outcome = self
                    .timeouts
                    .run("step", || env.step(action, self.config.sleep_after_execution))
                    .await?;
                tracing::info!(reward = outcome.reward, done = outcome.done, "step finished");

                recorder.record_step(StepRecord {
                    observation: outcome.observation.as_ref(),
                    logs: &turn.logs,
                    step_idx,
                    action_timestamp,
                    elapsed,
                    action,
                    reward: outcome.reward,
                    done: outcome.done,
                    info: &outcome.info,
                })?;

                obs = outcome.observation;
                done = outcome.done;
                if done {
                    tracing::info!(step_idx, "episode done");
                    break;
                }
            }
            step_idx += 1;
        }

        tracing::info!("running evaluator");
        let result = self.timeouts.run("evaluate", || env.evaluate()).await?;
        tracing::info!(result, steps = step_idx, "episode evaluated");

        std::fs::write(result_dir.join("result.txt"), format!("{result:?}\n"))?;
        recorder.record_end(result, start)?;
        Ok(result)
    }
}
