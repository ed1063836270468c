//! Policy Layer
//!
//! Ordered allow/deny predicates over an action descriptor (for tool calls,
//! `tool:<name>`) and the turn's context. The first denial wins.

use std::collections::HashSet;
use std::sync::Arc;

use crate::context::CallContext;
use crate::tool::ToolRegistry;

/// Context metadata key that marks a turn as human-confirmed
pub const CONFIRMED_KEY: &str = "confirmed";

/// Verdict of a single predicate or of the whole layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
}

impl PolicyDecision {
    pub fn deny(reason: impl Into<String>) -> Self {
        PolicyDecision::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    /// Denial reason, or the empty string when allowed
    pub fn reason(&self) -> &str {
        match self {
            PolicyDecision::Allow => "",
            PolicyDecision::Deny(reason) => reason,
        }
    }
}

/// A pure allow/deny rule
pub trait Policy: Send + Sync {
    fn check(&self, action: &str, context: &CallContext) -> PolicyDecision;
}

impl<F> Policy for F
where
    F: Fn(&str, &CallContext) -> PolicyDecision + Send + Sync,
{
    fn check(&self, action: &str, context: &CallContext) -> PolicyDecision {
        self(action, context)
    }
}

/// Ordered predicate list
#[derive(Default)]
pub struct PolicyLayer {
    policies: Vec<Box<dyn Policy>>,
}

impl PolicyLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate; it runs after every predicate already added
    pub fn add_policy<P: Policy + 'static>(&mut self, policy: P) {
        self.policies.push(Box::new(policy));
    }

    /// Builder-style `add_policy`
    pub fn with_policy<P: Policy + 'static>(mut self, policy: P) -> Self {
        self.add_policy(policy);
        self
    }

    /// Evaluate predicates in order, stopping at the first denial
    pub fn check(&self, action: &str, context: &CallContext) -> PolicyDecision {
        for policy in &self.policies {
            let decision = policy.check(action, context);
            if !decision.is_allowed() {
                return decision;
            }
        }
        PolicyDecision::Allow
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Always allows. Installed by the agent as the audit hook point.
pub fn audit_hook(action: &str, context: &CallContext) -> PolicyDecision {
    tracing::debug!(
        action,
        user = %context.user_id,
        session = %context.session_id,
        mode = %context.mode,
        "Policy audit"
    );
    PolicyDecision::Allow
}

/// Deny a fixed set of action descriptors
pub fn deny_actions<I, S>(actions: I) -> impl Policy
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let denied: HashSet<String> = actions.into_iter().map(Into::into).collect();

    move |action: &str, _context: &CallContext| {
        if denied.contains(action) {
            PolicyDecision::deny(format!("{} is disabled", action))
        } else {
            PolicyDecision::Allow
        }
    }
}

/// Deny tools flagged `requires_confirmation` unless the context carries
/// `confirmed: true` in its metadata
pub fn confirmation_gate(tools: Arc<ToolRegistry>) -> impl Policy {
    move |action: &str, context: &CallContext| {
        let Some(name) = action.strip_prefix("tool:") else {
            return PolicyDecision::Allow;
        };

        match tools.get(name) {
            Some(tool) if tool.requires_confirmation() && !context.flag(CONFIRMED_KEY) => {
                PolicyDecision::deny(format!("{} requires user confirmation", name))
            }
            _ => PolicyDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentMode, SessionId};
    use crate::error::Result;
    use crate::tool::{ParametersSchema, Tool, ToolParams};
    use async_trait::async_trait;

    fn context() -> CallContext {
        CallContext::new("u1", SessionId::from_string("s1"), AgentMode::Individual)
    }

    #[test]
    fn test_empty_layer_allows() {
        let layer = PolicyLayer::new();
        let decision = layer.check("tool:anything", &context());
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), "");
    }

    #[test]
    fn test_first_denial_wins() {
        let layer = PolicyLayer::new()
            .with_policy(audit_hook)
            .with_policy(|_: &str, _: &CallContext| PolicyDecision::deny("first"))
            .with_policy(|_: &str, _: &CallContext| PolicyDecision::deny("second"));

        assert_eq!(layer.check("tool:x", &context()), PolicyDecision::deny("first"));
    }

    #[test]
    fn test_later_predicates_not_evaluated_after_denial() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let layer = PolicyLayer::new()
            .with_policy(|_: &str, _: &CallContext| PolicyDecision::deny("stop"))
            .with_policy(move |_: &str, _: &CallContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                PolicyDecision::Allow
            });

        layer.check("tool:x", &context());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deny_actions() {
        let layer = PolicyLayer::new().with_policy(deny_actions(["tool:calendar_tracker"]));

        assert!(layer.check("tool:profile_collector", &context()).is_allowed());
        assert_eq!(
            layer.check("tool:calendar_tracker", &context()).reason(),
            "tool:calendar_tracker is disabled"
        );
    }

    struct SensitiveTool;

    #[async_trait]
    impl Tool for SensitiveTool {
        fn name(&self) -> &str {
            "sensitive"
        }

        fn description(&self) -> &str {
            "Needs a human to sign off"
        }

        fn parameters_schema(&self) -> ParametersSchema {
            ParametersSchema::object()
        }

        fn requires_confirmation(&self) -> bool {
            true
        }

        async fn execute(&self, _params: &ToolParams, _context: &CallContext) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_confirmation_gate() {
        let mut registry = ToolRegistry::new();
        registry.register(SensitiveTool);
        let layer = PolicyLayer::new().with_policy(confirmation_gate(Arc::new(registry)));

        let ctx = context();
        assert_eq!(
            layer.check("tool:sensitive", &ctx).reason(),
            "sensitive requires user confirmation"
        );
        assert!(layer.check("tool:unregistered", &ctx).is_allowed());

        let confirmed = ctx.with_metadata(CONFIRMED_KEY, serde_json::json!(true));
        assert!(layer.check("tool:sensitive", &confirmed).is_allowed());
    }
}
