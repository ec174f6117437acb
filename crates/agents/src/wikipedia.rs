//! Wikipedia summary agent: the lead extract of the page matching the topic.

use async_trait::async_trait;
use fieldnote_config::EndpointConfig;
use fieldnote_core::agent::{Agent, AgentOutput};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::http;

const OUTPUT_KEY: &str = "wikipedia_summary";

pub struct WikipediaSummaryAgent {
    endpoint: EndpointConfig,
    client: reqwest::Client,
}

impl WikipediaSummaryAgent {
    pub fn new(endpoint: EndpointConfig, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http::build_client(timeout),
        }
    }
}

/// The page title to look up: a gathered `topic`, else the goal, with
/// spaces turned into underscores.
pub fn page_title(context: &Context) -> Option<String> {
    let topic = context
        .get_str("topic")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| context.goal())
        .trim();
    if topic.is_empty() {
        None
    } else {
        Some(topic.replace(' ', "_"))
    }
}

fn output(text: impl Into<String>) -> AgentOutput {
    let mut map = Map::new();
    map.insert(OUTPUT_KEY.into(), Value::String(text.into()));
    AgentOutput::Mapping(map)
}

#[async_trait]
impl Agent for WikipediaSummaryAgent {
    fn name(&self) -> &str {
        "wikipedia_summary"
    }

    fn description(&self) -> &str {
        "Encyclopedia summary of the goal's topic"
    }

    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let Some(title) = page_title(context) else {
            return Ok(output("No topic provided."));
        };

        let url = http::with_segment(&self.endpoint.endpoint, &title)?;
        match http::get_json(&self.client, self.name(), url, &[]).await {
            Ok(page) => {
                let extract = page
                    .get("extract")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("No summary found.");
                Ok(output(extract))
            }
            Err(AgentError::Http { reason, .. }) if reason.starts_with("HTTP ") => {
                tracing::debug!(title = %title, %reason, "No Wikipedia page");
                Ok(output("No Wikipedia summary found."))
            }
            Err(e) => Ok(output(format!("Error fetching Wikipedia summary: {e}"))),
        }
    }
}
