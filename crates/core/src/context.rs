//! The research context: shared state accumulated across one execution.
//!
//! A [`Context`] is created once per research goal and owned by the
//! iteration controller. Agents never write to it directly: each iteration
//! they receive an immutable snapshot, and their outputs are merged back by
//! the dispatcher one at a time.
//!
//! - `data` only grows or gets overwritten by key; it is never reset.
//! - `errors` is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;

/// What the extracted entities of a goal denote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Place names ("weather in Paris and Rome").
    City,
    /// Book topics ("books on gardening").
    Book,
    /// Anything else.
    #[default]
    General,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Book => "book",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state for one research execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// The research goal, fixed at creation.
    goal: String,

    /// Entities extracted from the goal, in order of appearance.
    entities: Vec<String>,

    /// What `entities` denotes.
    entity_key: EntityKind,

    /// Accumulated agent results keyed by agent-defined names.
    data: Map<String, Value>,

    /// `"agent: message"` entries across all iterations.
    errors: Vec<String>,

    /// The chain the run started with.
    #[serde(default)]
    initial_chain: Vec<String>,

    /// The chain scheduled for the next dispatch.
    agent_chain: Vec<String>,

    /// When the execution started.
    started_at: DateTime<Utc>,

    /// Wall-clock duration, set when the run finishes.
    #[serde(default)]
    processing_time: Duration,
}

impl Context {
    /// Create a fresh context for `goal`.
    pub fn new(
        goal: impl Into<String>,
        entities: Vec<String>,
        entity_key: EntityKind,
        agent_chain: Vec<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            entities,
            entity_key,
            data: Map::new(),
            errors: Vec::new(),
            initial_chain: agent_chain.clone(),
            agent_chain,
            started_at: Utc::now(),
            processing_time: Duration::ZERO,
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn entity_key(&self) -> EntityKind {
        self.entity_key
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The chain given at creation, before any replanning.
    pub fn initial_chain(&self) -> &[String] {
        &self.initial_chain
    }

    pub fn agent_chain(&self) -> &[String] {
        &self.agent_chain
    }

    pub fn set_agent_chain(&mut self, chain: Vec<String>) {
        self.agent_chain = chain;
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    /// Record the total wall-clock time of the run.
    pub fn finish(&mut self, elapsed: Duration) {
        self.processing_time = elapsed;
    }

    // ── Store operations ──

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Convenience for string-valued keys.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Set a single key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    /// Shallow-merge `updates` into the data map. Conflicting keys are
    /// overwritten, so the last merge applied wins.
    pub fn merge(&mut self, updates: Map<String, Value>) {
        for (key, value) in updates {
            self.data.insert(key, value);
        }
    }

    /// Append an `"agent: message"` entry to the error log.
    pub fn append_error(&mut self, agent: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{agent}: {message}"));
    }

    /// Current data keys in insertion order.
    pub fn snapshot_keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Current data keys as a set.
    pub fn keys_set(&self) -> BTreeSet<String> {
        self.data.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new(
            "weather in Paris",
            vec!["Paris".into()],
            EntityKind::City,
            vec!["weather".into(), "summarizer".into()],
        )
    }

    #[test]
    fn new_context_starts_empty() {
        let c = ctx();
        assert_eq!(c.goal(), "weather in Paris");
        assert_eq!(c.entity_key(), EntityKind::City);
        assert!(c.data().is_empty());
        assert!(c.errors().is_empty());
        assert_eq!(c.processing_time(), Duration::ZERO);
    }

    #[test]
    fn initial_chain_survives_replanning() {
        let mut c = ctx();
        c.set_agent_chain(vec!["news".into(), "summarizer".into()]);
        assert_eq!(c.initial_chain(), ["weather", "summarizer"]);
        assert_eq!(c.agent_chain(), ["news", "summarizer"]);
    }

    #[test]
    fn merge_overwrites_conflicting_keys() {
        let mut c = ctx();
        c.insert("x", json!(1));

        let mut updates = Map::new();
        updates.insert("x".into(), json!(2));
        updates.insert("y".into(), json!("new"));
        c.merge(updates);

        assert_eq!(c.get("x"), Some(&json!(2)));
        assert_eq!(c.get_str("y"), Some("new"));
    }

    #[test]
    fn snapshot_keys_keep_insertion_order() {
        let mut c = ctx();
        c.insert("zeta", json!(1));
        c.insert("alpha", json!(2));
        c.insert("mid", json!(3));
        assert_eq!(c.snapshot_keys(), vec!["zeta", "alpha", "mid"]);
        assert!(c.keys_set().contains("alpha"));
    }

    #[test]
    fn errors_are_prefixed_with_agent() {
        let mut c = ctx();
        c.append_error("weather", "city not found");
        c.append_error("news", "rate limited");
        assert_eq!(c.errors(), ["weather: city not found", "news: rate limited"]);
    }

    #[test]
    fn entity_kind_display() {
        assert_eq!(EntityKind::Book.to_string(), "book");
        assert_eq!(EntityKind::default(), EntityKind::General);
    }
}
