pub mod history;
pub mod session;
pub mod state;

pub use session::AgentSession;
pub use state::{ComputerUpdate, ObsView, TurnLogs, TurnOutput, TurnPhase};
