//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered once at startup and dispatched by the reasoning loop.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::context::CallContext;
use crate::error::{AgentError, Result};

/// Parameters passed to a tool, as a JSON object
pub type ToolParams = serde_json::Map<String, serde_json::Value>;

/// Category reported by tools that do not override `Tool::category`
pub const DEFAULT_CATEGORY: &str = "general";

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tool invocation request parsed from model output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Registry key of the tool to run
    pub tool: String,

    /// Arguments as key-value pairs
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: ToolParams,

    /// Why the model asked for this call. Audit only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, params: ToolParams) -> Self {
        Self {
            tool: tool.into(),
            params,
            reasoning: String::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Action descriptor checked by the policy layer
    pub fn action(&self) -> String {
        format!("tool:{}", self.tool)
    }
}

/// Result of attempting (or refusing) one tool invocation.
///
/// `error` is `Some` exactly when `success` is `false`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Tool the request named
    pub tool: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Structured payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Extra audit data
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ToolOutcome {
    pub fn success(tool: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            data: Some(data),
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// One-line rendering folded back into the transcript
    pub fn summary(&self) -> String {
        match (&self.data, &self.error) {
            (Some(data), None) => format!("Tool {} result: {}", self.tool, data),
            (_, Some(error)) => format!("Tool {} failed: {}", self.tool, error),
            (None, None) => format!("Tool {} result: null", self.tool),
        }
    }
}

/// Schema for a single parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default value if not provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl PropertySchema {
    pub fn new(param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            description: Some(description.into()),
            default: None,
            enum_values: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new("string", description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new("number", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new("integer", description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new("boolean", description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new("object", description)
    }

    pub fn array(description: impl Into<String>) -> Self {
        Self::new("array", description)
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(
            values
                .into_iter()
                .map(|v| serde_json::Value::String(v.into()))
                .collect(),
        );
        self
    }
}

/// JSON-Schema-shaped description of a tool's parameters:
/// `{"type": "object", "properties": {...}, "required": [...]}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,

    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ParametersSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl ParametersSchema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, property);
        self
    }

    pub fn optional(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Listing entry for a registered tool (used for prompt construction)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: ParametersSchema,

    /// Category for grouping
    pub category: String,

    /// Whether a human should confirm before execution
    #[serde(default)]
    pub requires_confirmation: bool,
}

/// Tool trait - implement to add new capabilities.
///
/// Tools hold no hidden per-call state: everything `execute` needs arrives
/// through `params` or `context`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identity used for dispatch and in the tool-call blocks
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Accepted parameters
    fn parameters_schema(&self) -> ParametersSchema;

    /// Grouping tag
    fn category(&self) -> &str {
        DEFAULT_CATEGORY
    }

    /// Advisory flag for callers; the registry does not enforce it
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Run the tool. Failures should be `AgentError::ToolExecution`.
    async fn execute(&self, params: &ToolParams, context: &CallContext)
    -> Result<serde_json::Value>;

    /// Validate arguments before execution
    fn validate_params(&self, params: &ToolParams) -> std::result::Result<(), String> {
        let schema = self.parameters_schema();

        match schema.required.iter().find(|field| !params.contains_key(field.as_str())) {
            Some(field) => Err(format!("Missing required field: {}", field)),
            None => Ok(()),
        }
    }

    /// Listing entry for this tool
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            category: self.category().to_string(),
            requires_confirmation: self.requires_confirmation(),
        }
    }
}

/// Registry for available tools.
///
/// Iteration follows first registration order. Registering a name twice
/// replaces the instance but keeps the original position.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();

        match self.index.get(&name) {
            Some(&slot) => {
                tracing::debug!(tool = %name, "Replacing registered tool");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.tools[slot]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tool listings, in registration order
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve and run a tool call.
    ///
    /// Never fails: unknown tools, rejected parameters and execution errors
    /// all come back as failure outcomes.
    pub async fn dispatch(&self, call: &ToolInvocation, context: &CallContext) -> ToolOutcome {
        let Some(tool) = self.get(&call.tool) else {
            return ToolOutcome::failure(
                &call.tool,
                AgentError::ToolNotFound(call.tool.clone()).to_string(),
            );
        };

        if let Err(message) = tool.validate_params(&call.params) {
            tracing::debug!(tool = %call.tool, %message, "Tool parameters rejected");
            return ToolOutcome::failure(&call.tool, AgentError::ToolValidation(message).to_string())
                .with_metadata("category", tool.category().into())
                .with_metadata("stage", "validation".into());
        }

        tracing::debug!(tool = %call.tool, "Executing tool");

        match tool.execute(&call.params, context).await {
            Ok(data) => ToolOutcome::success(&call.tool, data)
                .with_metadata("category", tool.category().into()),
            Err(e) => {
                tracing::warn!(tool = %call.tool, error = %e, "Tool execution failed");
                ToolOutcome::failure(&call.tool, e.to_string())
                    .with_metadata("category", tool.category().into())
                    .with_metadata("stage", "execution".into())
            }
        }
    }

    /// Generate the prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");

        for schema in self.list() {
            prompt.push_str(&format!("### {}\n", schema.name));
            prompt.push_str(&format!("{}\n", schema.description));

            if !schema.parameters.properties.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for (name, param) in &schema.parameters.properties {
                    let required = if schema.parameters.is_required(name) { " (required)" } else { "" };
                    let mut line = format!("- `{}` ({}){}", name, param.param_type, required);
                    if let Some(description) = &param.description {
                        line.push_str(&format!(": {}", description));
                    }
                    if let Some(values) = &param.enum_values {
                        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                        line.push_str(&format!(" [one of: {}]", values.join(", ")));
                    }
                    prompt.push_str(&line);
                    prompt.push('\n');
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentMode, SessionId};
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text parameter"
        }

        fn parameters_schema(&self) -> ParametersSchema {
            ParametersSchema::object().required("text", PropertySchema::string("Text to echo"))
        }

        async fn execute(&self, params: &ToolParams, _context: &CallContext) -> Result<serde_json::Value> {
            Ok(json!({ "echo": params["text"] }))
        }
    }

    struct BrokenTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> ParametersSchema {
            ParametersSchema::object()
        }

        fn category(&self) -> &str {
            "testing"
        }

        async fn execute(&self, _params: &ToolParams, _context: &CallContext) -> Result<serde_json::Value> {
            Err(AgentError::tool("ledger locked"))
        }
    }

    fn context() -> CallContext {
        CallContext::new("u1", SessionId::from_string("s1"), AgentMode::Individual)
    }

    fn params(value: serde_json::Value) -> ToolParams {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_schema_serializes_as_json_schema() {
        let schema = EchoTool.parameters_schema();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["type"], "object");
        assert_eq!(value["properties"]["text"]["type"], "string");
        assert_eq!(value["required"], json!(["text"]));
    }

    #[test]
    fn test_default_validation_checks_required() {
        assert!(EchoTool.validate_params(&params(json!({"text": "hi"}))).is_ok());
        assert_eq!(
            EchoTool.validate_params(&ToolParams::new()).unwrap_err(),
            "Missing required field: text"
        );
    }

    #[test]
    fn test_registry_keeps_insertion_order_and_overwrites() {
        let mut registry = ToolRegistry::new();
        registry.register(BrokenTool { name: "zeta" });
        registry.register(EchoTool);
        registry.register(BrokenTool { name: "alpha" });
        registry.register(BrokenTool { name: "zeta" });

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["zeta", "echo", "alpha"]);
        assert!(registry.get("unknown").is_none());

        let listed: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(listed, vec!["zeta", "echo", "alpha"]);
        assert_eq!(registry.list()[0].category, "testing");
        assert_eq!(registry.list()[1].category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::new();
        let call = ToolInvocation::new("ghost", ToolParams::new());

        let outcome = registry.dispatch(&call, &context()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Unknown tool: ghost"));
        assert!(outcome.data.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_converts_execution_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(BrokenTool { name: "broken" });

        let outcome = registry
            .dispatch(&ToolInvocation::new("broken", ToolParams::new()), &context())
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("ledger locked"));
        assert_eq!(outcome.metadata["stage"], "execution");
    }

    #[tokio::test]
    async fn test_dispatch_validates_before_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let rejected = registry
            .dispatch(&ToolInvocation::new("echo", ToolParams::new()), &context())
            .await;
        assert_eq!(rejected.error.as_deref(), Some("Missing required field: text"));
        assert_eq!(rejected.metadata["stage"], "validation");

        let ok = registry
            .dispatch(&ToolInvocation::new("echo", params(json!({"text": "hi"}))), &context())
            .await;
        assert!(ok.success);
        assert_eq!(ok.data, Some(json!({"echo": "hi"})));
        assert_eq!(ok.summary(), r#"Tool echo result: {"echo":"hi"}"#);
    }

    #[test]
    fn test_prompt_section_lists_parameters() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let section = registry.generate_prompt_section();
        assert!(section.contains("### echo"));
        assert!(section.contains("- `text` (string) (required): Text to echo"));
    }
}
