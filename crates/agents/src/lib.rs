//! Built-in agents for fieldnote.
//!
//! Agents fetch or derive one piece of information each: current weather,
//! the next SpaceX launch, headlines, an encyclopedia summary, headline
//! sentiment, and the final LLM summary. They are thin I/O adapters; how
//! their output is merged is declared here, at registration.

pub mod fetch;
pub mod http;
pub mod launchpad;
pub mod news;
pub mod sentiment;
pub mod summarizer;
pub mod wikipedia;

use fieldnote_config::AppConfig;
use fieldnote_core::agent::{AgentRegistry, FieldExtraction, MergeStrategy};
use fieldnote_core::provider::Provider;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub use fetch::{HttpJsonAgent, QueryStyle};
pub use launchpad::LaunchpadLookup;
pub use news::NewsAgent;
pub use sentiment::SentimentAgent;
pub use summarizer::SummarizerAgent;
pub use wikipedia::WikipediaSummaryAgent;

/// Merge strategy for the sentiment agent's `score`/`label`/`reasoning`.
pub fn sentiment_strategy() -> MergeStrategy {
    MergeStrategy::ExtractFields(vec![
        FieldExtraction::new("score", "sentiment_score", json!(0)),
        FieldExtraction::new("label", "sentiment", json!("Neutral")),
        FieldExtraction::new("reasoning", "sentiment_reasoning", json!("")),
    ])
}

/// Create the registry of built-in agents.
///
/// Disabled endpoints are left out. The summarizer is only registered when
/// an LLM provider is available.
pub fn default_registry(config: &AppConfig, provider: Option<Arc<dyn Provider>>) -> AgentRegistry {
    let agents = &config.agents;
    let timeout = Duration::from_secs(agents.http_timeout_secs);
    let mut registry = AgentRegistry::new();

    if agents.weather.enabled {
        registry.register_default(Arc::new(HttpJsonAgent::weather(
            agents.weather.clone(),
            agents.default_city.clone(),
            timeout,
        )));
    }

    if agents.spacex_next.enabled {
        let agent = Arc::new(HttpJsonAgent::spacex_next(agents.spacex_next.clone(), timeout));
        let strategy = if agents.launchpads.enabled {
            MergeStrategy::side_fetch(
                "launchpad",
                Arc::new(LaunchpadLookup::new(agents.launchpads.endpoint.clone(), timeout)),
            )
        } else {
            MergeStrategy::ShallowMerge
        };
        registry.register(agent, strategy);
    }

    if agents.news.enabled {
        registry.register_default(Arc::new(NewsAgent::new(agents.news.clone(), timeout)));
    }

    if agents.wikipedia_summary.enabled {
        registry.register_default(Arc::new(WikipediaSummaryAgent::new(
            agents.wikipedia_summary.clone(),
            timeout,
        )));
    }

    if agents.sentiment {
        registry.register(Arc::new(SentimentAgent), sentiment_strategy());
    }

    match provider {
        Some(provider) => {
            let summarizer = SummarizerAgent::new(provider, config.default_model.clone())
                .with_sampling(config.default_temperature, config.default_max_tokens);
            registry.register(Arc::new(summarizer), MergeStrategy::replace_key("summary"));
        }
        None => tracing::warn!("No LLM provider available; summarizer agent not registered"),
    }

    registry
}
