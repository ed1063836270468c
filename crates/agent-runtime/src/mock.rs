//! Scripted provider for offline runs and tests.
//!
//! Replies queued with [`ScriptedProvider::with_replies`] are returned in
//! order. Once the queue is empty the provider answers from keywords in the
//! current user input: it asks for a matching tool first and summarises the
//! tool results on the next iteration.

use std::collections::VecDeque;

use agent_core::{
    context::CallContext,
    error::{AgentError, Result},
    protocol::{CLOSE_FENCE, TOOL_FENCE},
    provider::LlmProvider,
};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

const INPUT_MARKER: &str = "CURRENT USER INPUT:\n";
const RESULT_PREFIX: &str = "Tool ";

/// Deterministic stand-in for a real model
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies returned before keyword answering takes over
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure
    pub async fn push_error(&self, error: AgentError) {
        self.replies.lock().await.push_back(Err(error));
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    /// Every prompt received so far
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    fn keyword_reply(prompt: &str) -> String {
        let tail = prompt
            .rsplit_once(INPUT_MARKER)
            .map_or(prompt, |(_, tail)| tail);
        let (input, observations) = tail.split_once("\n\n").unwrap_or((tail, ""));

        let results: Vec<&str> = observations
            .split("\n\n")
            .filter(|block| block.starts_with(RESULT_PREFIX))
            .collect();
        if !results.is_empty() {
            return format!(
                "Here is what I found:\n\n{}\n\nPlease verify these figures with a professional before filing.",
                results.join("\n")
            );
        }

        let lowered = input.to_lowercase();
        let call = if lowered.contains("transaction") || lowered.contains("categori") {
            Some(json!({
                "tool": "transaction_interpreter",
                "params": {"action": "categorize", "description": input.trim()},
                "reasoning": "Classify the transaction for tax purposes"
            }))
        } else if lowered.contains("deadline") || lowered.contains("due") {
            Some(json!({
                "tool": "calendar_tracker",
                "params": {"action": "get_upcoming", "days_ahead": 30},
                "reasoning": "The user asked about upcoming deadlines"
            }))
        } else if lowered.contains("gst") || lowered.contains("turnover") {
            Some(json!({
                "tool": "compliance_rule_engine",
                "params": {"check_type": "gst_registration"},
                "reasoning": "GST registration depends on turnover"
            }))
        } else if lowered.contains("tax") {
            Some(json!({
                "tool": "compliance_rule_engine",
                "params": {"check_type": "income_tax"},
                "reasoning": "Estimate income tax under the new regime"
            }))
        } else if lowered.contains("profile") || lowered.contains("pan") {
            Some(json!({
                "tool": "profile_collector",
                "params": {"action": "get"},
                "reasoning": "Look up the stored tax profile"
            }))
        } else {
            None
        };

        match call {
            Some(call) => format!(
                "Let me check that for you.\n{TOOL_FENCE}\n{}\n{CLOSE_FENCE}",
                call
            ),
            None => "I can help with GST registration, income tax estimates, and filing deadlines. \
                     What would you like to look at?"
                .into(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _context: &CallContext) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());

        match self.replies.lock().await.pop_front() {
            Some(reply) => reply,
            None => Ok(Self::keyword_reply(prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{protocol::parse_tool_calls, AgentMode, SessionId};

    fn context() -> CallContext {
        CallContext::new("u1", SessionId::from_string("s1"), AgentMode::Individual)
    }

    #[tokio::test]
    async fn test_queued_replies_come_first() {
        let provider = ScriptedProvider::with_replies(["one", "two"]);
        provider.push_error(AgentError::ProviderUnavailable("down".into())).await;

        assert_eq!(provider.generate("p", &context()).await.unwrap(), "one");
        assert_eq!(provider.generate("p", &context()).await.unwrap(), "two");
        assert!(provider.generate("p", &context()).await.is_err());
        assert_eq!(provider.prompts().await.len(), 3);
    }

    #[tokio::test]
    async fn test_keyword_reply_requests_tool() {
        let provider = ScriptedProvider::new();
        let prompt = "system\n\nCURRENT USER INPUT:\nWhat deadlines are coming up?";

        let reply = provider.generate(prompt, &context()).await.unwrap();
        let calls = parse_tool_calls(&reply);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "calendar_tracker");
    }

    #[tokio::test]
    async fn test_transaction_question_goes_to_interpreter() {
        let provider = ScriptedProvider::new();
        let prompt = "CURRENT USER INPUT:\nCategorize this transaction: NEFT Consulting fees Acme";

        let calls = parse_tool_calls(&provider.generate(prompt, &context()).await.unwrap());
        assert_eq!(calls[0].tool, "transaction_interpreter");
        assert_eq!(calls[0].params["description"], json!("Categorize this transaction: NEFT Consulting fees Acme"));
    }

    #[tokio::test]
    async fn test_keyword_reply_summarises_results() {
        let provider = ScriptedProvider::new();
        let prompt = "system\n\nCURRENT USER INPUT:\nDo I need GST?\n\nTool compliance_rule_engine result: {\"required\":true}";

        let reply = provider.generate(prompt, &context()).await.unwrap();
        assert!(parse_tool_calls(&reply).is_empty());
        assert!(reply.contains("Tool compliance_rule_engine result"));
    }

    #[tokio::test]
    async fn test_unrecognised_input_gets_plain_answer() {
        let provider = ScriptedProvider::new();
        let reply = provider
            .generate("CURRENT USER INPUT:\nhello", &context())
            .await
            .unwrap();
        assert!(parse_tool_calls(&reply).is_empty());
    }
}
