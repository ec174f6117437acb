//! Chain planners.
//!
//! [`LlmChainPlanner`] asks an LLM provider for the next agent chain and
//! parses the list out of its free-form reply. [`StaticPlanner`] always
//! proposes the same chain.

use async_trait::async_trait;
use fieldnote_core::error::PlannerError;
use fieldnote_core::message::Message;
use fieldnote_core::planner::ChainPlanner;
use fieldnote_core::provider::{Provider, ProviderRequest};
use regex_lite::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z]*\n?").expect("static regex"));
static ASSIGNED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\s*=\s*(\[.*\])$").expect("static regex"));
static ANY_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\[.*\])").expect("static regex"));

/// Parse an agent chain out of a model reply.
///
/// Accepts a line that is a list literal, a line of the form
/// `chain = [...]`, or failing that the widest `[...]` span in the text.
/// Items may be single- or double-quoted.
pub fn parse_chain(text: &str) -> Result<Vec<String>, PlannerError> {
    let mut body = text.trim();
    let stripped;
    if body.starts_with("```") {
        stripped = FENCE_OPEN.replace(body, "").into_owned();
        body = stripped.split("```").next().unwrap_or_default().trim();
    }

    for line in body.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            if let Some(chain) = parse_list(line) {
                return Ok(chain);
            }
            continue;
        }
        if let Some(chain) = ASSIGNED_LIST
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_list(m.as_str()))
        {
            return Ok(chain);
        }
    }

    ANY_LIST
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_list(m.as_str()))
        .ok_or_else(|| PlannerError::Unparseable {
            response: text.to_string(),
        })
}

/// Parse a bracketed list of quoted strings, e.g. `['news', "summarizer"]`.
fn parse_list(literal: &str) -> Option<Vec<String>> {
    let inner = literal.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next() else {
            return Some(items);
        };
        if quote != '\'' && quote != '"' {
            return None;
        }

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => item.push(chars.next()?),
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => return Some(items),
            Some(',') => continue,
            Some(_) => return None,
        }
    }
}

fn planning_prompt(goal: &str, available: &[String]) -> String {
    let agents = available
        .iter()
        .map(|a| format!("'{a}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are an AI planner for a multi-agent system.\n\
         User goal: '{goal}'.\n\
         Available agents: [{agents}].\n\
         Provide the optimal ordered agent chain as a list (e.g. ['spacex_next', 'weather', 'summarizer']).\n\
         Only output the list, nothing else.\n\
         Always place 'summarizer' as the last agent in the chain, so it can summarize all enriched context."
    )
}

/// Plans chains by prompting an LLM provider.
pub struct LlmChainPlanner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    /// Extra attempts after the first failure.
    retries: u32,
}

impl LlmChainPlanner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            retries: 1,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    async fn attempt(&self, goal: &str, available: &[String]) -> Result<Vec<String>, PlannerError> {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::user(planning_prompt(goal, available))],
        )
        .with_temperature(self.temperature);

        let response = self.provider.complete(request).await?;
        let chain = parse_chain(&response.message.content)?;
        if chain.is_empty() {
            return Err(PlannerError::EmptyChain);
        }
        Ok(chain)
    }
}

#[async_trait]
impl ChainPlanner for LlmChainPlanner {
    async fn plan(&self, goal: &str, available: &[String]) -> Result<Vec<String>, PlannerError> {
        let mut attempt = 0;
        loop {
            match self.attempt(goal, available).await {
                Ok(chain) => {
                    debug!(provider = self.provider.name(), ?chain, "Planner proposed chain");
                    return Ok(chain);
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Planner attempt failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Always proposes the same chain.
pub struct StaticPlanner {
    chain: Vec<String>,
}

impl StaticPlanner {
    pub fn new(chain: Vec<String>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ChainPlanner for StaticPlanner {
    async fn plan(&self, _goal: &str, _available: &[String]) -> Result<Vec<String>, PlannerError> {
        Ok(self.chain.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, names};
    use fieldnote_core::error::ProviderError;

    // ── parse_chain ──────────────────────────────────────────────

    #[test]
    fn bare_list() {
        assert_eq!(
            parse_chain("['weather', 'summarizer']").unwrap(),
            names(&["weather", "summarizer"])
        );
    }

    #[test]
    fn fenced_list_with_language() {
        let reply = "```python\n[\"news\", \"sentiment\", \"summarizer\"]\n```";
        assert_eq!(
            parse_chain(reply).unwrap(),
            names(&["news", "sentiment", "summarizer"])
        );
    }

    #[test]
    fn assignment_line() {
        let reply = "Here you go:\nchain = ['spacex_next', 'weather', 'summarizer']";
        assert_eq!(
            parse_chain(reply).unwrap(),
            names(&["spacex_next", "weather", "summarizer"])
        );
    }

    #[test]
    fn list_embedded_in_prose() {
        let reply = "The best chain is ['news',\n 'summarizer'] because news comes first.";
        assert_eq!(parse_chain(reply).unwrap(), names(&["news", "summarizer"]));
    }

    #[test]
    fn trailing_comma_and_escapes() {
        assert_eq!(
            parse_chain(r#"['it\'s', "b",]"#).unwrap(),
            names(&["it's", "b"])
        );
    }

    #[test]
    fn empty_list_parses_empty() {
        assert!(parse_chain("[]").unwrap().is_empty());
    }

    #[test]
    fn unparseable_reply() {
        let err = parse_chain("I would run the weather agent first.").unwrap_err();
        assert!(matches!(err, PlannerError::Unparseable { ref response } if response.contains("weather agent")));

        assert!(parse_chain("[weather, summarizer]").is_err());
    }

    #[test]
    fn prompt_lists_agents_and_goal() {
        let prompt = planning_prompt("weather in Paris", &names(&["weather", "summarizer"]));
        assert!(prompt.contains("User goal: 'weather in Paris'"));
        assert!(prompt.contains("['weather', 'summarizer']"));
        assert!(prompt.contains("'summarizer' as the last agent"));
    }

    // ── LlmChainPlanner ──────────────────────────────────────────

    #[tokio::test]
    async fn plans_from_provider_reply() {
        let provider = Arc::new(SequentialMockProvider::texts(&["['news', 'summarizer']"]));
        let planner = LlmChainPlanner::new(provider.clone(), "m");
        let chain = planner.plan("goal", &names(&["news", "summarizer"])).await.unwrap();
        assert_eq!(chain, names(&["news", "summarizer"]));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.last_request().unwrap().model, "m");
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let provider = Arc::new(SequentialMockProvider::texts(&["no idea", "['summarizer']"]));
        let planner = LlmChainPlanner::new(provider.clone(), "m");
        let chain = planner.plan("goal", &[]).await.unwrap();
        assert_eq!(chain, names(&["summarizer"]));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_retries() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(ProviderError::Timeout("30s".into())),
            Err(ProviderError::Timeout("30s".into())),
        ]));
        let planner = LlmChainPlanner::new(provider.clone(), "m");
        let err = planner.plan("goal", &[]).await.unwrap_err();
        assert!(matches!(err, PlannerError::Provider(_)));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_chain_is_an_error() {
        let provider = Arc::new(SequentialMockProvider::texts(&["[]"]));
        let planner = LlmChainPlanner::new(provider, "m").with_retries(0);
        assert!(matches!(
            planner.plan("goal", &[]).await,
            Err(PlannerError::EmptyChain)
        ));
    }

    #[tokio::test]
    async fn static_planner_repeats() {
        let planner = StaticPlanner::new(names(&["a", "b"]));
        assert_eq!(planner.plan("x", &[]).await.unwrap(), names(&["a", "b"]));
        assert_eq!(planner.plan("y", &[]).await.unwrap(), names(&["a", "b"]));
    }
}
