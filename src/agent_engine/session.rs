use std::sync::Arc;

use crate::action::resolver::{ActionResolver, ResolvedAction};
use crate::agent_engine::history::ConversationHistory;
use crate::agent_engine::state::{ComputerUpdate, ObsView, TurnLogs, TurnOutput, TurnPhase};
use crate::config::AppConfig;
use crate::episode::environment::Observation;
use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::GroundingClient;
use crate::llm::provider::LlmProvider;
use crate::llm::registry::{ProviderRegistry, Role};
use crate::llm::types::{CallConfig, ChatMessage, ContentPart};
use crate::parser::{strip_solution, ParsedAction, ParsedResponse, ResponseParser};
use crate::perception::encode_jpeg_base64;

pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../prompts/planner_system.md");

const PLANNER_TEMPERATURE: f64 = 0.6;
const PLANNER_MAX_TOKENS: u32 = 4096;
// Higher penalties break the action format.
const PLANNER_FREQUENCY_PENALTY: f64 = 0.0;

/// One agent conversation: plans a move per observation and resolves it into
/// executable actions.
pub struct AgentSession {
    planner: Arc<dyn LlmProvider>,
    call: CallConfig,
    system_prompt: String,
    parser: ResponseParser,
    resolver: ActionResolver,
    history: ConversationHistory,
    obs_view: ObsView,
    step_counter: u32,
    phase: TurnPhase,
}

impl AgentSession {
    /// Planner sampling defaults fill whatever `call` leaves unset.
    pub fn new(
        planner: Arc<dyn LlmProvider>,
        mut call: CallConfig,
        system_prompt: String,
        parser: ResponseParser,
        resolver: ActionResolver,
        n_prev: usize,
        obs_view: ObsView,
    ) -> Self {
        call.max_tokens.get_or_insert(PLANNER_MAX_TOKENS);
        call.frequency_penalty.get_or_insert(PLANNER_FREQUENCY_PENALTY);
        // Keep the solution delimiters in the completion.
        call.extra_body.get_or_insert_with(|| serde_json::json!({ "skip_special_tokens": false }));
        Self {
            planner,
            call,
            system_prompt,
            parser,
            resolver,
            history: ConversationHistory::new(n_prev),
            obs_view,
            step_counter: 0,
            phase: TurnPhase::Init,
        }
    }

    pub fn from_config(config: &AppConfig, registry: &ProviderRegistry) -> ArenaResult<Self> {
        let (planner, mut call) = registry.call_config_for_role(Role::Planner)?;
        let planner_temperature = config.llm.roles.planner.as_ref().and_then(|r| r.temperature);
        if planner_temperature.is_none() {
            call.temperature = PLANNER_TEMPERATURE;
        }

        let grounding = GroundingClient::from_config(config, registry)?;

        tracing::info!(
            model = %call.model,
            n_prev = config.agent.n_prev,
            obs_view = ?config.agent.obs_view,
            dialect = ?config.agent.response_dialect,
            "agent session created"
        );
        Ok(Self::new(
            planner,
            call,
            config.system_prompt()?,
            ResponseParser::new(config.agent.response_dialect),
            ActionResolver::new(grounding),
            config.agent.n_prev,
            config.agent.obs_view,
        ))
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.step_counter = 0;
        self.phase = TurnPhase::Init;
        tracing::debug!("agent session reset");
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn step_counter(&self) -> u32 {
        self.step_counter
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Plan, parse and ground the next move for `obs`.
    ///
    /// Only the planner call and image decoding can fail; a failed planner
    /// call leaves a dangling user turn that the next call drops.
    pub async fn predict(
        &mut self,
        instruction: &str,
        obs: &Observation,
    ) -> ArenaResult<TurnOutput> {
        let (view_bytes, view_rect) = self.select_view(obs)?;
        let encoded = encode_jpeg_base64(view_bytes)?;
        let view_rect = view_rect.unwrap_or([0, 0, encoded.width as i32, encoded.height as i32]);

        let mut logs = TurnLogs {
            window_title: obs.window_title.clone(),
            window_names_str: obs.window_names_str.clone(),
            computer_clipboard: obs.computer_clipboard.clone(),
            image_width: encoded.width,
            image_height: encoded.height,
            ..Default::default()
        };

        self.history.repair();
        let query = ChatMessage::user(vec![
            ContentPart::jpeg_base64(&encoded.base64, Some("auto")),
            ContentPart::text(format!("Task: {instruction}. Please generate the next move.")),
        ]);
        let mut context = self.history.context();
        context.push(query.clone());
        self.history.push_user(query);
        if let Some(first) = context.first_mut() {
            first.prepend_text(self.system_prompt.as_str());
        }

        self.phase = TurnPhase::Query;
        tracing::info!(step = self.step_counter, messages = context.len(), "querying planner");
        let plan_result_full = self.planner.chat(context, &self.call).await?.content;

        self.phase = TurnPhase::Parse;
        let plan_result = strip_solution(&plan_result_full).to_string();
        let ParsedResponse { decision_text, action } = self.parser.parse(&plan_result);

        self.phase = TurnPhase::Ground;
        let resolved = self.resolver.resolve(&encoded.base64, &action).await;
        let actions = resolved.actions();

        logs.plan_result_full = plan_result_full.clone();
        logs.plan_result = plan_result;
        logs.decision = decision_text;
        logs.actions = action.as_str().to_string();
        logs.actions_grounded = match &resolved {
            ResolvedAction::Grounded(g) => g.text.clone(),
            _ => action.as_str().to_string(),
        };
        logs.grounding = resolved.results().to_vec();
        logs.grounding_error = resolved.grounding_error().map(str::to_string);
        logs.parse_miss = matches!(action, ParsedAction::NotFound);

        self.history.push_assistant(&plan_result_full);
        self.step_counter += 1;
        self.phase = match resolved {
            ResolvedAction::Terminal(decision) if decision.ends_episode() => TurnPhase::Terminated,
            _ => TurnPhase::Emit,
        };
        tracing::info!(
            step = self.step_counter,
            decision = %logs.decision,
            actions = actions.len(),
            phase = ?self.phase,
            "turn complete"
        );

        Ok(TurnOutput {
            response: String::new(),
            actions,
            logs,
            computer_update: ComputerUpdate {
                rects: vec![view_rect],
                window_rect: view_rect,
                screenshot: view_bytes.to_vec(),
                scale: 1.0,
                clipboard_content: obs.computer_clipboard.clone(),
                swap_ctrl_alt: false,
            },
        })
    }

    fn select_view<'a>(&self, obs: &'a Observation) -> ArenaResult<(&'a [u8], Option<[i32; 4]>)> {
        match self.obs_view {
            ObsView::Screen => Ok((obs.screenshot.as_slice(), None)),
            ObsView::Window => {
                let image = obs.window_image.as_deref().ok_or_else(|| {
                    ArenaError::Perception(
                        "window view requested but observation has no window image".into(),
                    )
                })?;
                let rect = obs.window_rect.ok_or_else(|| {
                    ArenaError::Perception(
                        "window view requested but observation has no window rect".into(),
                    )
                })?;
                Ok((image, Some(rect)))
            }
        }
    }
}
