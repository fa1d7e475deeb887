use serde::{Deserialize, Serialize};

use crate::grounding::types::GroundingResult;

/// Which image the planner sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsView {
    /// The full screenshot.
    #[default]
    Screen,
    /// The focused window image and rectangle.
    Window,
}

/// Lifecycle of one planning turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Init,
    Query,
    Parse,
    Ground,
    Emit,
    /// The planner answered DONE or FAIL. Other decisions stay in `Emit`.
    Terminated,
}

/// Everything recorded about one turn, written into the trajectory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnLogs {
    pub window_title: String,
    pub window_names_str: String,
    pub computer_clipboard: String,
    pub image_width: u32,
    pub image_height: u32,
    pub plan_result_full: String,
    pub plan_result: String,
    pub decision: String,
    pub actions: String,
    pub actions_grounded: String,
    pub grounding: Vec<GroundingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub parse_miss: bool,
}

/// Window/screen state handed back to the environment so it can map
/// normalized coordinates onto the right region.
#[derive(Debug, Clone, Serialize)]
pub struct ComputerUpdate {
    pub rects: Vec<[i32; 4]>,
    pub window_rect: [i32; 4],
    #[serde(skip)]
    pub screenshot: Vec<u8>,
    pub scale: f64,
    pub clipboard_content: String,
    pub swap_ctrl_alt: bool,
}

/// Output of [`crate::agent_engine::session::AgentSession::predict`].
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// Free-form reply text for the caller; empty for this agent.
    pub response: String,
    pub actions: Vec<String>,
    pub logs: TurnLogs,
    pub computer_update: ComputerUpdate,
}
