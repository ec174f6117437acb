//! Config-driven JSON fetchers (`weather`, `spacex_next`).
//!
//! One agent type covers every endpoint that answers a plain GET with a JSON
//! object. What varies is how the query string is built from the context.

use async_trait::async_trait;
use fieldnote_config::EndpointConfig;
use fieldnote_core::agent::{Agent, AgentOutput};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::http;

/// How an [`HttpJsonAgent`] derives its query parameters.
#[derive(Debug, Clone)]
pub enum QueryStyle {
    /// No parameters.
    Plain,
    /// OpenWeather style: `q=<city>&appid=<key>`.
    City { default_city: String },
}

/// A GET-a-JSON-object agent.
pub struct HttpJsonAgent {
    name: String,
    description: String,
    endpoint: EndpointConfig,
    query: QueryStyle,
    /// Response keys moved to another name before merging.
    renames: &'static [(&'static str, &'static str)],
    client: reqwest::Client,
}

impl HttpJsonAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint: EndpointConfig,
        query: QueryStyle,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            endpoint,
            query,
            renames: &[],
            client: http::build_client(timeout),
        }
    }

    pub fn with_renames(mut self, renames: &'static [(&'static str, &'static str)]) -> Self {
        self.renames = renames;
        self
    }

    /// Current weather for the goal's first city.
    pub fn weather(endpoint: EndpointConfig, default_city: impl Into<String>, timeout: Duration) -> Self {
        Self::new(
            "weather",
            "Current weather conditions for the city named in the goal",
            endpoint,
            QueryStyle::City {
                default_city: default_city.into(),
            },
            timeout,
        )
    }

    /// The next scheduled SpaceX launch.
    ///
    /// The launch `name` is stored as `launch_name`; weather responses carry a
    /// top-level `name` of their own.
    pub fn spacex_next(endpoint: EndpointConfig, timeout: Duration) -> Self {
        Self::new(
            "spacex_next",
            "Details of the next scheduled SpaceX launch",
            endpoint,
            QueryStyle::Plain,
            timeout,
        )
        .with_renames(&[("name", "launch_name")])
    }

    fn query(&self, context: &Context) -> Result<Vec<(&'static str, String)>, AgentError> {
        match &self.query {
            QueryStyle::Plain => Ok(Vec::new()),
            QueryStyle::City { default_city } => {
                let mut query = vec![("q", resolve_city(context, default_city))];
                if let Some(key) = http::require_key(&self.endpoint)? {
                    query.push(("appid", key));
                }
                Ok(query)
            }
        }
    }
}

/// Move each `(from, to)` key of `map` to its new name.
pub fn apply_renames(map: &mut Map<String, Value>, renames: &[(&str, &str)]) {
    for (from, to) in renames {
        if let Some(value) = map.remove(*from) {
            map.insert((*to).to_string(), value);
        }
    }
}

/// The city to query: the first entity (at most two words), else a `city`
/// value already gathered, else `default_city`.
pub fn resolve_city(context: &Context, default_city: &str) -> String {
    if let Some(first) = context.entities().first() {
        let words: Vec<&str> = first.split_whitespace().take(2).collect();
        if !words.is_empty() {
            return words.join(" ");
        }
    }
    context
        .get_str("city")
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(default_city)
        .to_string()
}

#[async_trait]
impl Agent for HttpJsonAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let query = self.query(context)?;
        let url = http::parse_url(&self.endpoint.endpoint)?;
        let body = http::get_json(&self.client, &self.name, url, &query).await?;

        match AgentOutput::from_value(body) {
            AgentOutput::Mapping(mut map) => {
                apply_renames(&mut map, self.renames);
                Ok(AgentOutput::Mapping(map))
            }
            other => Err(AgentError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                other.kind()
            ))),
        }
    }
}
