//! Agent trait: the abstraction over data-fetching units of work.
//!
//! An agent reads a [`Context`] snapshot and produces an [`AgentOutput`] or
//! fails. How that output lands in the shared context is not up to the
//! agent: it is declared once, at registration, as a [`MergeStrategy`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::AgentError;

/// The result of one agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Keyed fields to merge into the context.
    Mapping(Map<String, Value>),
    /// A single value (text, number, ...).
    Scalar(Value),
    /// A list of records (one per entity, article, ...).
    Records(Vec<Value>),
}

impl AgentOutput {
    /// Classify an arbitrary JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            Value::Array(items) => Self::Records(items),
            other => Self::Scalar(other),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Scalar(Value::String(text.into()))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Mapping(map) => Value::Object(map),
            Self::Scalar(value) => value,
            Self::Records(items) => Value::Array(items),
        }
    }

    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "mapping",
            Self::Scalar(_) => "scalar",
            Self::Records(_) => "records",
        }
    }
}

/// The core Agent trait.
///
/// Agents do their own I/O, retries and timeouts. They only ever see an
/// immutable snapshot of the context taken at the start of the iteration.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The registry name (e.g., "weather", "summarizer").
    fn name(&self) -> &str;

    /// What this agent contributes, shown to the planner and in `agents`.
    fn description(&self) -> &str;

    /// Produce a partial result from the context.
    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError>;
}

/// A secondary lookup triggered by a field of an agent's output.
///
/// Used for enrichment: the primary agent returns an identifier, and the
/// side fetch resolves it into derived fields injected next to the output.
#[async_trait]
pub trait SideFetch: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve `id` into fields to inject. An empty map injects nothing.
    async fn fetch(&self, id: &Value) -> Result<Map<String, Value>, AgentError>;
}

/// Pull one field of a mapping output into a top-level context key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExtraction {
    pub source: String,
    pub target: String,
    /// Used when `source` is absent from the output.
    pub default: Value,
}

impl FieldExtraction {
    pub fn new(source: impl Into<String>, target: impl Into<String>, default: Value) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            default,
        }
    }
}

/// How an agent's output is folded into the context.
#[derive(Clone, Default)]
pub enum MergeStrategy {
    /// Mappings are shallow-merged; anything else is stored under the agent name.
    #[default]
    ShallowMerge,
    /// The whole output is stored under `key`.
    ReplaceKey { key: String },
    /// Selected fields become top-level keys.
    ExtractFields(Vec<FieldExtraction>),
    /// Shallow merge, then resolve `lookup_key` through `fetcher` and inject
    /// the derived fields.
    SideFetch {
        lookup_key: String,
        fetcher: Arc<dyn SideFetch>,
    },
}

impl std::fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl MergeStrategy {
    pub fn replace_key(key: impl Into<String>) -> Self {
        Self::ReplaceKey { key: key.into() }
    }

    pub fn side_fetch(lookup_key: impl Into<String>, fetcher: Arc<dyn SideFetch>) -> Self {
        Self::SideFetch {
            lookup_key: lookup_key.into(),
            fetcher,
        }
    }

    /// Compact tag, e.g. `replaceKey:summary` or `sideFetch:launchpad`.
    pub fn describe(&self) -> String {
        match self {
            Self::ShallowMerge => "shallowMerge".into(),
            Self::ReplaceKey { key } => format!("replaceKey:{key}"),
            Self::ExtractFields(fields) => {
                let targets: Vec<&str> = fields.iter().map(|f| f.target.as_str()).collect();
                format!("extractFields:[{}]", targets.join(","))
            }
            Self::SideFetch {
                lookup_key,
                fetcher,
            } => format!("sideFetch:{lookup_key}({})", fetcher.name()),
        }
    }

    /// The key whose value triggers a side fetch, if any, present in `output`.
    pub fn side_fetch_id<'a>(&self, output: &'a AgentOutput) -> Option<&'a Value> {
        match self {
            Self::SideFetch { lookup_key, .. } => output
                .as_mapping()
                .and_then(|m| m.get(lookup_key))
                .filter(|v| !v.is_null()),
            _ => None,
        }
    }

    /// Turn an output into the updates to apply to the context.
    pub fn updates(&self, agent: &str, output: AgentOutput) -> Map<String, Value> {
        let mut updates = Map::new();
        match (self, output) {
            (Self::ReplaceKey { key }, output) => {
                updates.insert(key.clone(), output.into_value());
            }
            (Self::ExtractFields(fields), AgentOutput::Mapping(map)) => {
                for field in fields {
                    let value = map.get(&field.source).cloned().unwrap_or_else(|| field.default.clone());
                    updates.insert(field.target.clone(), value);
                }
            }
            (_, AgentOutput::Mapping(map)) => updates = map,
            (_, output) => {
                updates.insert(agent.to_string(), output.into_value());
            }
        }
        updates
    }
}

/// An agent together with its declared merge strategy.
#[derive(Clone)]
pub struct AgentRegistration {
    pub agent: Arc<dyn Agent>,
    pub strategy: MergeStrategy,
}

/// A registry of available agents.
///
/// Built once by the composition root and shared by reference with the
/// controller. Registration order is preserved: it is the order the planner
/// sees the available agent names in.
pub struct AgentRegistry {
    agents: HashMap<String, AgentRegistration>,
    order: Vec<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register an agent. Replaces any existing agent with the same name.
    pub fn register(&mut self, agent: Arc<dyn Agent>, strategy: MergeStrategy) {
        let name = agent.name().to_string();
        if !self.agents.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.agents.insert(name, AgentRegistration { agent, strategy });
    }

    /// Register an agent with [`MergeStrategy::ShallowMerge`].
    pub fn register_default(&mut self, agent: Arc<dyn Agent>) {
        self.register(agent, MergeStrategy::ShallowMerge);
    }

    pub fn get(&self, name: &str) -> Option<&AgentRegistration> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// All registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentRegistration)> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name).map(|r| (name.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
