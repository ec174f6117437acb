//! Summarizer agent: turns everything gathered so far into an analytical
//! summary via the configured LLM provider.

use async_trait::async_trait;
use fieldnote_core::agent::{Agent, AgentOutput};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use fieldnote_core::message::Message;
use fieldnote_core::provider::{Provider, ProviderRequest};
use serde_json::Value;
use std::sync::Arc;

/// Returned when the model's reply is too short to be useful.
pub const INSUFFICIENT_SUMMARY: &str = "Summary: The available data was insufficient for a detailed summary, but key findings are presented below.";

/// Replies of this many words or fewer are treated as insufficient.
const MIN_REPLY_WORDS: usize = 10;

const SYSTEM_PROMPT: &str = "You are an analytical research assistant. \
Given the research goal and the data gathered by several agents, write a \
detailed summary of several paragraphs. Explain what the data suggests, note \
cause-effect relationships and implications, and call out gaps or \
contradictions. Convert temperatures given in Kelvin to Celsius and \
Fahrenheit. Do not invent facts that are not in the data.";

pub struct SummarizerAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl SummarizerAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// Render the goal and gathered data as plain text for the prompt.
pub fn format_context(context: &Context) -> String {
    let mut parts = Vec::new();
    if !context.goal().is_empty() {
        parts.push(format!("Goal:\n{}\n", context.goal()));
    }

    for (key, value) in context.data() {
        if key == "summary" || is_empty(value) {
            continue;
        }
        let title = capitalize(key);
        match value {
            Value::Array(items) if items.iter().all(Value::is_object) => {
                for item in items {
                    let entity = item
                        .get("entity")
                        .or_else(|| item.get("topic"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let lines: Vec<String> = item
                        .as_object()
                        .into_iter()
                        .flatten()
                        .filter(|(k, _)| k.as_str() != "entity")
                        .map(|(k, v)| format!("  - {k}: {}", plain(v)))
                        .collect();
                    parts.push(format!("{title} for {entity}:\n{}", lines.join("\n")));
                }
            }
            Value::Object(map) => {
                let lines: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("  • {k}: {}", plain(v)))
                    .collect();
                parts.push(format!("{title}:\n{}\n", lines.join("\n")));
            }
            Value::Array(items) => {
                let lines: Vec<String> = items.iter().map(|v| format!("  - {}", plain(v))).collect();
                parts.push(format!("{title}:\n{}\n", lines.join("\n")));
            }
            other => parts.push(format!("{title}:\n{}\n", plain(other))),
        }
    }

    let text = parts.join("\n");
    let text = text.trim();
    if text.is_empty() {
        "No relevant input found.".to_string()
    } else {
        text.to_string()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

/// Strings without quotes, everything else as compact JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wrap a model reply, falling back when it is too short.
pub fn finalize_summary(provider: &str, reply: &str) -> String {
    let reply = reply.trim();
    if reply.split_whitespace().count() > MIN_REPLY_WORDS {
        format!("In-depth Analytical Summary ({provider}):\n{reply}")
    } else {
        INSUFFICIENT_SUMMARY.to_string()
    }
}

#[async_trait]
impl Agent for SummarizerAgent {
    fn name(&self) -> &str {
        "summarizer"
    }

    fn description(&self) -> &str {
        "Analytical summary of all gathered data (run last)"
    }

    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let input = format_context(context);
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(SYSTEM_PROMPT), Message::user(input)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| AgentError::Failed(format!("summary request failed: {e}")))?;

        Ok(AgentOutput::text(finalize_summary(
            self.provider.name(),
            &response.message.content,
        )))
    }
}
