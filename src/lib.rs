pub mod action;
pub mod agent_engine;
pub mod config;
pub mod episode;
pub mod errors;
pub mod grounding;
pub mod llm;
pub mod parser;
pub mod perception;

pub use agent_engine::AgentSession;
pub use config::AppConfig;
pub use episode::{Environment, EpisodeRunner};
pub use errors::{ArenaError, ArenaResult};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init();
}
