//! Shared test helpers for engine tests.

use async_trait::async_trait;
use fieldnote_core::agent::{Agent, AgentOutput, SideFetch};
use fieldnote_core::context::Context;
use fieldnote_core::error::{AgentError, PlannerError, ProviderError};
use fieldnote_core::message::Message;
use fieldnote_core::planner::ChainPlanner;
use fieldnote_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An agent that always returns the same output, optionally after a delay.
pub struct FixedAgent {
    name: String,
    output: Value,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedAgent {
    pub fn build(name: &str, output: Value) -> Self {
        Self {
            name: name.into(),
            output,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn mapping(name: &str, output: Value) -> Arc<dyn Agent> {
        Arc::new(Self::build(name, output))
    }

    pub fn text(name: &str, text: &str) -> Arc<dyn Agent> {
        Arc::new(Self::build(name, json!(text)))
    }

    pub fn delayed(name: &str, output: Value, delay: Duration) -> Arc<dyn Agent> {
        let mut agent = Self::build(name, output);
        agent.delay = delay;
        Arc::new(agent)
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for FixedAgent {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Returns a fixed output"
    }
    async fn run(&self, _context: &Context) -> Result<AgentOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(AgentOutput::from_value(self.output.clone()))
    }
}

/// An agent that always fails with [`AgentError::Failed`].
pub struct FailingAgent {
    name: String,
    message: String,
}

impl FailingAgent {
    pub fn new(name: &str, message: &str) -> Arc<dyn Agent> {
        Arc::new(Self {
            name: name.into(),
            message: message.into(),
        })
    }
}

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    async fn run(&self, _context: &Context) -> Result<AgentOutput, AgentError> {
        Err(AgentError::Failed(self.message.clone()))
    }
}

pub struct PanickingAgent {
    name: String,
}

impl PanickingAgent {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for PanickingAgent {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Panics when run"
    }
    async fn run(&self, _context: &Context) -> Result<AgentOutput, AgentError> {
        panic!("boom");
    }
}

/// Reports whether `key` was present in the context it was given.
pub struct KeyProbeAgent {
    name: String,
    key: String,
}

impl KeyProbeAgent {
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl Agent for KeyProbeAgent {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Checks the snapshot for a key"
    }
    async fn run(&self, context: &Context) -> Result<AgentOutput, AgentError> {
        let mut out = Map::new();
        out.insert(
            format!("{}_saw_key", self.name),
            json!(context.contains_key(&self.key)),
        );
        Ok(AgentOutput::Mapping(out))
    }
}

/// Tracks how many gauged agents are running at once.
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct GaugedAgent {
    name: String,
    gauge: Arc<ConcurrencyGauge>,
    hold: Duration,
}

impl GaugedAgent {
    pub fn new(name: String, gauge: Arc<ConcurrencyGauge>, hold: Duration) -> Self {
        Self { name, gauge, hold }
    }
}

#[async_trait]
impl Agent for GaugedAgent {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Holds a slot for a while"
    }
    async fn run(&self, _context: &Context) -> Result<AgentOutput, AgentError> {
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        Ok(AgentOutput::Mapping(Map::new()))
    }
}

pub struct FixedSideFetch {
    result: Result<Value, String>,
}

impl FixedSideFetch {
    pub fn ok(fields: Value) -> Self {
        Self { result: Ok(fields) }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.into()),
        }
    }
}

#[async_trait]
impl SideFetch for FixedSideFetch {
    fn name(&self) -> &str {
        "fixed"
    }
    async fn fetch(&self, _id: &Value) -> Result<Map<String, Value>, AgentError> {
        match &self.result {
            Ok(Value::Object(map)) => Ok(map.clone()),
            Ok(_) => Ok(Map::new()),
            Err(reason) => Err(AgentError::InvalidResponse(reason.clone())),
        }
    }
}

/// A planner that returns scripted results in order, then repeats the last.
pub struct ScriptedPlanner {
    results: Mutex<Vec<Result<Vec<String>, PlannerError>>>,
    calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn new(results: Vec<Result<Vec<String>, PlannerError>>) -> Self {
        Self {
            results: Mutex::new(results),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always return `chain`.
    pub fn fixed(chain: &[&str]) -> Self {
        Self::new(vec![Ok(names(chain))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainPlanner for ScriptedPlanner {
    async fn plan(&self, _goal: &str, _available: &[String]) -> Result<Vec<String>, PlannerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let results = self.results.lock().unwrap();
        let index = call.min(results.len().saturating_sub(1));
        results
            .get(index)
            .cloned()
            .unwrap_or(Err(PlannerError::EmptyChain))
    }
}

/// A mock provider that returns a sequence of scripted replies.
///
/// Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Vec<Result<String, ProviderError>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        if *count >= self.replies.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                self.replies.len()
            );
        }
        let reply = self.replies[*count].clone();
        *count += 1;
        self.requests.lock().unwrap().push(request);
        reply.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

pub fn names(chain: &[&str]) -> Vec<String> {
    chain.iter().map(|s| s.to_string()).collect()
}
