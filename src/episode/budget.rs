use std::time::{Duration, Instant};

use crate::config::EpisodeConfig;

/// Why an episode stopped stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxSteps,
    TimeLimit,
}

/// Step and wall-clock limits for one episode.
pub struct EpisodeBudget {
    max_steps: u32,
    time_limit: Option<Duration>,
    start_time: Instant,
}

impl EpisodeBudget {
    pub fn new(max_steps: u32, time_limit: Option<Duration>) -> Self {
        Self {
            max_steps,
            time_limit,
            start_time: Instant::now(),
        }
    }

    pub fn from_config(config: &EpisodeConfig) -> Self {
        Self::new(config.max_steps, config.time_limit_secs.map(Duration::from_secs))
    }

    pub fn check(&self, step_idx: u32) -> Option<StopReason> {
        if step_idx >= self.max_steps {
            return Some(StopReason::MaxSteps);
        }
        match self.time_limit {
            Some(limit) if self.start_time.elapsed() >= limit => Some(StopReason::TimeLimit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit() {
        let budget = EpisodeBudget::new(2, None);
        assert_eq!(budget.check(1), None);
        assert_eq!(budget.check(2), Some(StopReason::MaxSteps));
    }

    #[test]
    fn test_zero_time_limit_stops_immediately() {
        let budget = EpisodeBudget::new(10, Some(Duration::ZERO));
        assert_eq!(budget.check(0), Some(StopReason::TimeLimit));
    }
}
