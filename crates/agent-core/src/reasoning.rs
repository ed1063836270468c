//! Reasoning Loop
//!
//! Plan → act → observe. Each iteration sends the mode preamble, the tool
//! catalog and the running transcript to the provider, runs every tool call
//! found in the reply through the policy layer and the registry, and folds
//! the outcomes back into the transcript. The turn ends when a reply carries
//! no tool calls or the iteration budget runs out.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::{AgentMode, CallContext};
use crate::error::{AgentError, Result};
use crate::policy::{audit_hook, PolicyDecision, PolicyLayer};
use crate::protocol::{format_instructions, parse_tool_calls};
use crate::provider::LlmProvider;
use crate::state::{ConversationEntry, MemoryStateStore, StateStore, UserState};
use crate::tool::{ToolInvocation, ToolOutcome, ToolRegistry};

/// Default reply when the iteration budget runs out
pub const BUDGET_EXHAUSTED_MESSAGE: &str =
    "I need more information to complete this request. Could you provide more details?";

const DEFAULT_GUIDELINES: &str = r#"RESPONSE FORMAT:
1. Acknowledge the user's query
2. If you need information, ask clearly
3. If using tools, explain why
4. Provide actionable advice
5. Flag any compliance risks
6. Suggest next steps

IMPORTANT DISCLAIMERS:
- You provide guidance, not legal/tax advice
- Complex cases need professional consultation
- Tax laws change; verify with official sources"#;

/// Instruction preamble for each operating mode
pub fn mode_preamble(mode: AgentMode) -> &'static str {
    match mode {
        AgentMode::Individual => {
            "You are a tax compliance assistant for Indian individuals.\n\
             You help with income tax, GST (if applicable), and financial compliance.\n\
             Always explain your reasoning. Flag uncertainties. Recommend professional consultation for complex cases."
        }
        AgentMode::MicroBusiness => {
            "You are a tax compliance assistant for Indian micro-businesses.\n\
             You help with GST compliance, income tax, TDS, and business finances.\n\
             Proactively identify compliance risks. Explain in simple terms. Track deadlines."
        }
        AgentMode::AccountantAssist => {
            "You are assisting a practising accountant with client compliance files.\n\
             Be precise and cite the rule or threshold behind every conclusion.\n\
             Prefer tool results over recollection, and list open questions for the accountant."
        }
        AgentMode::ComplianceAudit => {
            "You are reviewing an entity's tax compliance position.\n\
             Check every obligation systematically, rank risks by severity, and note the evidence for each finding.\n\
             Do not change any records; report what should be corrected."
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum reasoning iterations per turn
    pub max_iterations: usize,

    /// Prior turns replayed into the transcript
    pub history_window: usize,

    /// Characters of each reply kept in the reasoning trace
    pub trace_excerpt_chars: usize,

    /// Response format and disclaimer section appended to every preamble
    pub guidelines: String,

    /// Reply returned when the iteration budget runs out
    pub budget_message: String,

    /// Persist finished turns through the state store
    pub record_turns: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            history_window: 5,
            trace_excerpt_chars: 200,
            guidelines: DEFAULT_GUIDELINES.into(),
            budget_message: BUDGET_EXHAUSTED_MESSAGE.into(),
            record_turns: true,
        }
    }
}

impl AgentConfig {
    /// Defaults overridden by `AGENT_MAX_ITERATIONS` and `AGENT_HISTORY_WINDOW`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_iterations = std::env::var("AGENT_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_iterations);
        let history_window = std::env::var("AGENT_HISTORY_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.history_window);

        Self {
            max_iterations,
            history_window,
            ..defaults
        }
    }
}

/// How a turn ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// A reply without tool calls was returned as the message
    Completed,
    /// The iteration budget ran out
    BudgetExhausted,
    /// The provider returned an error. The message is the error's user-facing text.
    GenerationFailed,
}

/// Final result of one turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// User-facing reply
    pub message: String,

    pub status: TurnStatus,

    /// Iterations actually run
    pub iterations: usize,

    /// Requests that reached a registered tool, in dispatch order
    pub tool_calls: Vec<ToolInvocation>,

    /// Every outcome, including policy rejections and unknown tools
    pub tool_results: Vec<ToolOutcome>,

    /// Loop annotations for audit
    pub reasoning_trace: Vec<String>,

    #[serde(default)]
    pub suggestions: Vec<String>,

    pub confidence: f32,
}

/// Per-turn accumulator, owned by a single `run` call
#[derive(Default)]
struct TurnLog {
    trace: Vec<String>,
    calls: Vec<ToolInvocation>,
    results: Vec<ToolOutcome>,
}

impl TurnLog {
    fn finish(self, message: String, status: TurnStatus, iterations: usize) -> AgentResponse {
        AgentResponse {
            message,
            status,
            iterations,
            tool_calls: self.calls,
            tool_results: self.results,
            reasoning_trace: self.trace,
            suggestions: Vec::new(),
            confidence: 1.0,
        }
    }
}

/// First `max_chars` characters of `text`
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// The main Agent struct
///
/// Shared collaborators are read-only during a turn, so one `Agent` can
/// serve concurrent turns for different users.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    state: Arc<dyn StateStore>,
    policy: PolicyLayer,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent. The audit hook is appended to `policy`.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        state: Arc<dyn StateStore>,
        mut policy: PolicyLayer,
        config: AgentConfig,
    ) -> Self {
        policy.add_policy(audit_hook);

        Self {
            provider,
            tools,
            state,
            policy,
            config,
        }
    }

    /// Create with default configuration and no extra policies
    pub fn with_defaults(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        state: Arc<dyn StateStore>,
    ) -> Self {
        Self::new(provider, tools, state, PolicyLayer::new(), AgentConfig::default())
    }

    /// Mode preamble, tool catalog and response guidelines
    pub fn build_system_prompt(&self, mode: AgentMode) -> String {
        let mut prompt = String::from(mode_preamble(mode));

        if !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
            prompt.push_str(&format_instructions());
        }

        prompt.push_str("\n\n");
        prompt.push_str(&self.config.guidelines);
        prompt
    }

    /// Stored state, the recent history window (oldest first) and the input
    pub fn build_transcript(&self, user_input: &str, state: &UserState) -> Result<String> {
        let mut parts = Vec::new();

        if let Some(profile) = &state.profile {
            parts.push(format!("USER PROFILE:\n{}", serde_json::to_string_pretty(profile)?));
        }
        if !state.entities.is_empty() {
            parts.push(format!("USER ENTITIES:\n{}", serde_json::to_string_pretty(&state.entities)?));
        }
        if !state.active_risks.is_empty() {
            parts.push(format!("ACTIVE RISKS:\n{}", serde_json::to_string_pretty(&state.active_risks)?));
        }
        if !state.upcoming_deadlines.is_empty() {
            parts.push(format!(
                "UPCOMING DEADLINES:\n{}",
                serde_json::to_string_pretty(&state.upcoming_deadlines)?
            ));
        }

        let history = &state.conversation_history;
        let window = &history[history.len().saturating_sub(self.config.history_window)..];
        if !window.is_empty() {
            parts.push("RECENT CONVERSATION:".into());
            for entry in window {
                parts.push(format!("User: {}", entry.user_message));
                parts.push(format!("Assistant: {}", entry.assistant_message));
            }
        }

        parts.push(format!("\nCURRENT USER INPUT:\n{}", user_input));

        Ok(parts.join("\n\n"))
    }

    /// Run one user turn.
    ///
    /// Returns `Err` only when the user's state cannot be loaded. Provider
    /// errors end the turn with [`TurnStatus::GenerationFailed`] and keep
    /// whatever was accumulated.
    pub async fn run(&self, user_input: &str, context: &CallContext) -> Result<AgentResponse> {
        tracing::info!(
            user = %context.user_id,
            session = %context.session_id,
            mode = %context.mode,
            "Starting turn"
        );

        let user_state = self.state.get_user_state(&context.user_id).await?;
        let mut transcript = self.build_transcript(user_input, &user_state)?;
        let system_prompt = self.build_system_prompt(context.mode);
        let mut turn = TurnLog::default();

        for iteration in 1..=self.config.max_iterations {
            turn.trace.push(format!("Iteration {}", iteration));

            let prompt = format!("{}\n\n{}", system_prompt, transcript);
            let reply = match self.provider.generate(&prompt, context).await {
                Ok(reply) => reply,
                Err(e) => return Ok(self.generation_failed(turn, e, iteration)),
            };

            turn.trace.push(format!("LLM: {}...", excerpt(&reply, self.config.trace_excerpt_chars)));

            let calls = parse_tool_calls(&reply);
            if calls.is_empty() {
                // Text that merely reports an upstream failure also lands here.
                let response = turn.finish(reply, TurnStatus::Completed, iteration);
                self.record(user_input, context, &response).await;
                return Ok(response);
            }

            for call in calls {
                if let PolicyDecision::Deny(reason) = self.policy.check(&call.action(), context) {
                    tracing::info!(tool = %call.tool, %reason, "Tool call blocked by policy");
                    turn.trace.push(format!("Policy blocked {}: {}", call.tool, reason));
                    turn.results.push(
                        ToolOutcome::failure(&call.tool, format!("Policy blocked: {}", reason))
                            .with_metadata("stage", "policy".into()),
                    );
                    continue;
                }

                let resolved = self.tools.contains(&call.tool);
                let outcome = self.tools.dispatch(&call, context).await;

                turn.trace.push(format!(
                    "Tool {}: {}",
                    call.tool,
                    if outcome.success { "ok" } else { "failed" }
                ));
                transcript.push_str("\n\n");
                transcript.push_str(&outcome.summary());

                turn.results.push(outcome);
                if resolved {
                    turn.calls.push(call);
                }
            }
        }

        tracing::info!(
            session = %context.session_id,
            max_iterations = self.config.max_iterations,
            "Iteration budget exhausted"
        );

        let response = turn.finish(
            self.config.budget_message.clone(),
            TurnStatus::BudgetExhausted,
            self.config.max_iterations,
        );
        self.record(user_input, context, &response).await;
        Ok(response)
    }

    fn generation_failed(&self, mut turn: TurnLog, error: AgentError, iteration: usize) -> AgentResponse {
        tracing::warn!(
            provider = self.provider.name(),
            error = %error,
            retryable = error.is_retryable(),
            "Generation failed"
        );
        turn.trace.push(format!("Generation failed: {}", error));
        turn.finish(error.user_message(), TurnStatus::GenerationFailed, iteration)
    }

    /// Persist a finished turn. Storage errors are logged, not returned.
    async fn record(&self, user_input: &str, context: &CallContext, response: &AgentResponse) {
        if !self.config.record_turns {
            return;
        }

        let entry = ConversationEntry {
            turn_id: uuid::Uuid::new_v4().to_string(),
            session_id: context.session_id.clone(),
            user_id: context.user_id.clone(),
            user_message: user_input.to_string(),
            assistant_message: response.message.clone(),
            tool_calls: response.tool_calls.iter().map(|c| c.tool.clone()).collect(),
            entity_id: context.entity_id.clone(),
            timestamp: chrono::Utc::now(),
        };

        if let Err(e) = self.state.record_turn(&context.session_id, entry).await {
            tracing::warn!(session = %context.session_id, error = %e, "Failed to record turn");
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the state store
    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    state: Option<Arc<dyn StateStore>>,
    policy: PolicyLayer,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn policy(mut self, policy: PolicyLayer) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.config.guidelines = guidelines.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self.tools.unwrap_or_default();
        let state: Arc<dyn StateStore> = match self.state {
            Some(state) => state,
            None => {
                tracing::debug!("No state store configured, using in-memory store");
                Arc::new(MemoryStateStore::new())
            }
        };

        Ok(Agent::new(provider, tools, state, self.policy, self.config))
    }
}
