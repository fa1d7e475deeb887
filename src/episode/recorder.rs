use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::agent_engine::state::TurnLogs;
use crate::episode::environment::{Observation, TaskConfig};
use crate::errors::ArenaResult;
use crate::perception::guess_extension;

/// Timestamp format used in record fields and screenshot file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d@%H%M%S";

pub fn timestamp(at: chrono::DateTime<chrono::Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `H:MM:SS[.ffffff]`.
pub fn format_elapsed(elapsed: chrono::TimeDelta) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if frac == 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{h}:{m:02}:{s:02}.{frac:06}")
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrajectoryRecord<'a> {
    Init {
        run_id: &'a str,
        timestamp: String,
        task: &'a TaskConfig,
        #[serde(skip_serializing_if = "Option::is_none")]
        screenshot_file: Option<String>,
    },
    Step {
        step_idx: u32,
        action_timestamp: String,
        elapsed: String,
        action: &'a str,
        reward: f64,
        done: bool,
        info: &'a serde_json::Value,
        logs: &'a TurnLogs,
        #[serde(skip_serializing_if = "Option::is_none")]
        screenshot_file: Option<String>,
    },
    End {
        result: f64,
        timestamp: String,
        elapsed: String,
    },
}

/// One step as handed to [`TrajectoryRecorder::record_step`].
pub struct StepRecord<'a> {
    pub observation: Option<&'a Observation>,
    pub logs: &'a TurnLogs,
    pub step_idx: u32,
    pub action_timestamp: String,
    pub elapsed: String,
    pub action: &'a str,
    pub reward: f64,
    pub done: bool,
    pub info: &'a serde_json::Value,
}

/// Appends one JSON line per record to `{dir}/traj.jsonl` and saves the
/// screenshots next to it.
pub struct TrajectoryRecorder {
    pub run_id: String,
    dir: PathBuf,
    file_path: PathBuf,
    records: usize,
}

impl TrajectoryRecorder {
    pub fn new(dir: &Path) -> ArenaResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            dir: dir.to_path_buf(),
            file_path: dir.join("traj.jsonl"),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn record_init(
        &mut self,
        observation: Option<&Observation>,
        task: &TaskConfig,
        timestamp: String,
    ) -> ArenaResult<()> {
        let screenshot_file = match observation {
            Some(obs) => {
                let name = format!("initial_state_{timestamp}");
                Some(self.save_screenshot(&name, &obs.screenshot)?)
            }
            None => None,
        };
        let run_id = self.run_id.clone();
        self.append(&TrajectoryRecord::Init {
            run_id: &run_id,
            timestamp,
            task,
            screenshot_file,
        })
    }

    pub fn record_step(&mut self, step: StepRecord<'_>) -> ArenaResult<()> {
        let screenshot_file = match step.observation {
            Some(obs) => Some(self.save_screenshot(
                &format!("step_{}_{}", step.step_idx, step.action_timestamp),
                &obs.screenshot,
            )?),
            None => None,
        };
        self.append(&TrajectoryRecord::Step {
            step_idx: step.step_idx,
            action_timestamp: step.action_timestamp,
            elapsed: step.elapsed,
            action: step.action,
            reward: step.reward,
            done: step.done,
            info: step.info,
            logs: step.logs,
            screenshot_file,
        })
    }

    pub fn record_end(
        &mut self,
        result: f64,
        start: chrono::DateTime<chrono::Local>,
    ) -> ArenaResult<()> {
        let now = chrono::Local::now();
        self.append(&TrajectoryRecord::End {
            result,
            timestamp: timestamp(now),
            elapsed: format_elapsed(now - start),
        })
    }

    fn save_screenshot(&self, stem: &str, bytes: &[u8]) -> ArenaResult<String> {
        let name = format!("{stem}.{}", guess_extension(bytes));
        std::fs::write(self.dir.join(&name), bytes)?;
        Ok(name)
    }

    fn append(&mut self, record: &TrajectoryRecord<'_>) -> ArenaResult<()> {
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        self.records += 1;
        tracing::debug!(
            path = %self.file_path.display(),
            records = self.records,
            "trajectory record flushed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::screen::solid_png;

    fn task() -> TaskConfig {
        serde_json::from_value(serde_json::json!({"id": "t1", "instruction": "Open Paint"})).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_records_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = TrajectoryRecorder::new(dir.path()).unwrap();
        let obs = Observation {
            screenshot: solid_png(8, 8),
            ..Default::default()
        };
        let start = chrono::Local::now();
        rec.record_init(Some(&obs), &task(), "20240101@120000".into()).unwrap();

        let logs = TurnLogs {
            decision: "CONTINUE".into(),
            ..Default::default()
        };
        let info = serde_json::json!({});
        rec.record_step(StepRecord {
            observation: Some(&obs),
            logs: &logs,
            step_idx: 0,
            action_timestamp: "20240101@120005".into(),
            elapsed: "0:00:05".into(),
            action: "computer.mouse.single_click()",
            reward: 0.0,
            done: false,
            info: &info,
        })
        .unwrap();
        rec.record_end(1.0, start).unwrap();

        let lines = read_lines(rec.path());
        assert_eq!(lines.len(), 3);
        assert_eq!(rec.records(), 3);
        assert_eq!(lines[0]["type"], "init");
        assert_eq!(lines[0]["task"]["instruction"], "Open Paint");
        assert_eq!(lines[0]["screenshot_file"], "initial_state_20240101@120000.png");
        assert_eq!(lines[1]["type"], "step");
        assert_eq!(lines[1]["logs"]["decision"], "CONTINUE");
        assert_eq!(lines[1]["screenshot_file"], "step_0_20240101@120005.png");
        assert_eq!(lines[2]["type"], "end");
        assert_eq!(lines[2]["result"], 1.0);
        assert!(dir.path().join("step_0_20240101@120005.png").exists());
    }

    #[test]
    fn test_missing_observation_saves_no_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = TrajectoryRecorder::new(dir.path()).unwrap();
        rec.record_init(None, &task(), "x".into()).unwrap();
        let lines = read_lines(rec.path());
        assert!(lines[0].get("screenshot_file").is_none());
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(chrono::TimeDelta::seconds(3725)), "1:02:05");
        assert_eq!(
            format_elapsed(chrono::TimeDelta::milliseconds(1500)),
            "0:00:01.500000"
        );
    }
}
