//! News agent: recent headlines per entity from newsdata.io.

use async_trait::async_trait;
use fieldnote_config::EndpointConfig;
use fieldnote_core::agent::{Agent, AgentOutput};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use std::time::Duration;

use crate::http;

const MAX_HEADLINES: usize = 3;

static IN_PLACE: LazyLock<regex_lite::Regex> =
    LazyLock::new(|| regex_lite::Regex::new(r"\bin ([A-Za-z ,]+)").expect("static regex"));

pub struct NewsAgent {
    endpoint: EndpointConfig,
    client: reqwest::Client,
}

impl NewsAgent {
    pub fn new(endpoint: EndpointConfig, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http::build_client(timeout),
        }
    }

    async fn headlines_for(&self, query: &str, api_key: Option<&str>) -> Value {
        let mut params = vec![("q", query.to_string()), ("language", "en".to_string())];
        if let Some(key) = api_key {
            params.push(("apikey", key.to_string()));
        }

        let result = match http::parse_url(&self.endpoint.endpoint) {
            Ok(url) => http::get_json(&self.client, "news", url, &params).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => {
                let titles: Vec<String> = body
                    .get("results")
                    .and_then(Value::as_array)
                    .map(|articles| {
                        articles
                            .iter()
                            .filter_map(|a| a.get("title").and_then(Value::as_str))
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
                headline_record(query, titles)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "News lookup failed");
                json!({
                    "entity": query,
                    "news": [format!("Error: {e}")],
                    "validated": false,
                    "reasoning": format!("Exception: {e}"),
                })
            }
        }
    }
}

/// Build the per-entity record from the fetched titles.
pub fn headline_record(entity: &str, titles: Vec<String>) -> Value {
    if titles.is_empty() {
        return json!({
            "entity": entity,
            "news": ["No news found for this topic."],
            "validated": false,
            "reasoning": "No articles found.",
        });
    }
    let total = titles.len();
    let top: Vec<String> = titles.into_iter().take(MAX_HEADLINES).collect();
    json!({
        "entity": entity,
        "news": top,
        "validated": true,
        "reasoning": format!("Fetched {total} articles for {entity}."),
    })
}

/// What to search for: the entities, else a gathered location/topic, else
/// the place named in the goal, else its first two words.
pub fn news_queries(context: &Context) -> Vec<String> {
    if !context.entities().is_empty() {
        return context.entities().to_vec();
    }
    for key in ["location", "city", "topic"] {
        if let Some(value) = context.get_str(key).filter(|v| !v.trim().is_empty()) {
            return vec![value.to_string()];
        }
    }
    let goal = context.goal();
    if let Some(caps) = IN_PLACE.captures(goal) {
        let place = caps[1].split(',').next().unwrap_or_default().trim();
        if !place.is_empty() {
            return vec![place.to_string()];
        }
    }
    let head: Vec<&str> = goal.split_whitespace().take(2).collect();
    if head.is_empty() {
        Vec::new()
    } else {
        vec![head.join(" ")]
    }
}

#[async_trait]
impl Agent for NewsAgent {
    fn name(&self) -> &str {
        "news"
    }

    fn description(&self) -> &str {
        "Recent news headlines for each entity in the goal"
    }

    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let api_key = http::require_key(&self.endpoint)?;
        let queries = news_queries(context);
        if queries.is_empty() {
            return Err(AgentError::MissingInput("nothing to search news for".into()));
        }

        let mut records = Vec::with_capacity(queries.len());
        for query in &queries {
            records.push(self.headlines_for(query, api_key.as_deref()).await);
        }

        let mut output = Map::new();
        output.insert("news".into(), Value::Array(records));
        Ok(AgentOutput::Mapping(output))
    }
}
