//! Tool-call blocks embedded in model output.
//!
//! A call is a fenced block whose opening line is exactly ```` ```tool ````
//! and whose body is one JSON object:
//!
//! ````text
//! ```tool
//! {"tool": "calendar_tracker", "params": {"action": "get_upcoming"}, "reasoning": "..."}
//! ```
//! ````
//!
//! Blocks are read left to right and are independent of each other. A block
//! whose body does not decode into a [`ToolInvocation`] is dropped, as is a
//! block with no closing fence. The closing fence must open its own line.

use crate::tool::ToolInvocation;

/// Opening fence of a tool-call block
pub const TOOL_FENCE: &str = "```tool";

/// Closing fence
pub const CLOSE_FENCE: &str = "```";

/// Instructions appended to every prompt so the model knows the format
pub fn format_instructions() -> String {
    format!(
        "## Using Tools\n\n\
         To use a tool, respond with one block per call in this exact format:\n\n\
         {TOOL_FENCE}\n\
         {{\"tool\": \"tool_name\", \"params\": {{\"arg\": \"value\"}}, \"reasoning\": \"why this tool\"}}\n\
         {CLOSE_FENCE}\n\n\
         You may request several tools in one response. \
         When you have everything you need, answer without any tool blocks."
    )
}

/// Raw body of each well-delimited block, in document order
pub fn extract_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(TOOL_FENCE) {
        let after_fence = &rest[start + TOOL_FENCE.len()..];

        // The tag must end its line: "```tools" or "```tool {..." are not blocks.
        let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
        if !after_fence[..line_end].trim().is_empty() {
            rest = after_fence;
            continue;
        }

        let body_start = (line_end + 1).min(after_fence.len());
        let body = &after_fence[body_start..];

        let Some((end, resume)) = closing_fence(body) else {
            break;
        };

        blocks.push(body[..end].trim());
        rest = &body[resume..];
    }

    blocks
}

/// Closing fence at the start of a line: (end of body, first byte after the fence).
/// Backticks inside the JSON payload do not close the block.
fn closing_fence(body: &str) -> Option<(usize, usize)> {
    if body.starts_with(CLOSE_FENCE) {
        return Some((0, CLOSE_FENCE.len()));
    }

    let newline_fence = format!("\n{CLOSE_FENCE}");
    body.find(&newline_fence)
        .map(|end| (end, end + newline_fence.len()))
}

/// Parse every well-formed tool call, in document order
pub fn parse_tool_calls(text: &str) -> Vec<ToolInvocation> {
    extract_blocks(text)
        .into_iter()
        .enumerate()
        .filter_map(|(position, body)| match serde_json::from_str::<ToolInvocation>(body) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::debug!(position, error = %e, "Dropping malformed tool block");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_has_no_calls() {
        assert!(parse_tool_calls("You owe nothing this quarter.").is_empty());
        assert!(parse_tool_calls("").is_empty());
    }

    #[test]
    fn test_single_block_with_defaults() {
        let text = "Let me check.\n```tool\n{\"tool\": \"calendar_tracker\"}\n```\nOne moment.";
        let calls = parse_tool_calls(text);

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "calendar_tracker");
        assert!(calls[0].params.is_empty());
        assert_eq!(calls[0].reasoning, "");
    }

    #[test]
    fn test_full_block() {
        let text = r#"```tool
{"tool": "compliance_rule_engine", "params": {"check_type": "gst_registration", "turnover": 2500000}, "reasoning": "turnover is high"}
```"#;
        let calls = parse_tool_calls(text);

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].params["check_type"], json!("gst_registration"));
        assert_eq!(calls[0].params["turnover"], json!(2500000));
        assert_eq!(calls[0].reasoning, "turnover is high");
    }

    #[test]
    fn test_multiple_blocks_keep_document_order() {
        let text = "```tool\n{\"tool\": \"a\"}\n```\ntext between\n```tool\n{\"tool\": \"b\"}\n```\n```tool\n{\"tool\": \"c\"}\n```";
        let names: Vec<String> = parse_tool_calls(text).into_iter().map(|c| c.tool).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_block_does_not_poison_siblings() {
        let text = "```tool\n{\"tool\": \"broken\", \"params\": \n```\n\n```tool\n{\"tool\": \"profile_collector\", \"params\": {\"action\": \"get\"}}\n```";
        let calls = parse_tool_calls(text);

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "profile_collector");
    }

    #[test]
    fn test_missing_tool_key_or_wrong_types_dropped() {
        let text = "```tool\n{\"params\": {}}\n```\n```tool\n{\"tool\": 42}\n```\n```tool\n[1, 2]\n```\n```tool\n{\"tool\": \"x\", \"params\": \"nope\"}\n```";
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn test_null_params_and_reasoning_default() {
        let text = "```tool\n{\"tool\": \"x\", \"params\": null, \"reasoning\": null}\n```";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].params.is_empty());
    }

    #[test]
    fn test_other_fences_ignored() {
        let text = "```json\n{\"tool\": \"x\"}\n```\n```tools\n{\"tool\": \"y\"}\n```";
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn test_unterminated_block_dropped() {
        let text = "```tool\n{\"tool\": \"a\"}\n```\n```tool\n{\"tool\": \"b\"}";
        let names: Vec<String> = parse_tool_calls(text).into_iter().map(|c| c.tool).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_backticks_inside_payload_do_not_close_block() {
        let text = "```tool\n{\"tool\": \"calendar_tracker\", \"params\": {}, \"reasoning\": \"user pasted ```gstr3b``` output\"}\n```\nDone.";
        let calls = parse_tool_calls(text);

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "calendar_tracker");
        assert_eq!(calls[0].reasoning, "user pasted ```gstr3b``` output");
    }

    #[test]
    fn test_instructions_mention_fence() {
        let instructions = format_instructions();
        assert!(instructions.contains("```tool\n{\"tool\": \"tool_name\""));
    }
}
