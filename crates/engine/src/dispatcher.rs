//! Concurrent dispatcher: runs one chain of agents against a context.
//!
//! Every agent in the chain is spawned onto a [`JoinSet`], gated by a
//! [`Semaphore`] so at most `concurrency` run at once. Agents read an
//! immutable snapshot of the context taken before any of them start.
//! Results are drained in completion order by a single loop, which is the
//! only writer of the context: merges never interleave.
//!
//! Failure isolation: an `Err`, a panic, or an unknown agent name is
//! recorded as an `"agent: message"` error and a failed trajectory step.
//! Siblings are never cancelled.

use fieldnote_core::agent::{Agent, AgentRegistry, MergeStrategy};
use fieldnote_core::context::Context;
use fieldnote_core::error::AgentError;
use fieldnote_core::event::{DomainEvent, EventBus};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::trajectory::{Trajectory, TrajectoryStep};

/// Default number of agents running at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default delay after each completion.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    pub concurrency: usize,
    /// Awaited after each completion is merged; zero disables.
    pub pacing: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Counts for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub completed: usize,
    pub failed: usize,
}

/// What a spawned agent task hands back to the merge loop.
struct AgentRun {
    name: String,
    result: Result<Map<String, Value>, AgentError>,
    duration: Duration,
}

pub struct Dispatcher {
    registry: Arc<AgentRegistry>,
    event_bus: Arc<EventBus>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<AgentRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            event_bus,
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every agent in `chain` and merge the results into `context`.
    ///
    /// Returns once all agents have finished; one trajectory step is pushed
    /// per chain entry.
    pub async fn dispatch(
        &self,
        chain: &[String],
        context: &mut Context,
        iteration: usize,
        trajectory: &mut Trajectory,
    ) -> DispatchSummary {
        let snapshot = Arc::new(context.clone());
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<AgentRun> = JoinSet::new();
        let mut names_by_task = HashMap::new();
        let mut summary = DispatchSummary::default();

        for name in chain {
            let Some(registration) = self.registry.get(name) else {
                self.record_failure(
                    context,
                    trajectory,
                    name,
                    iteration,
                    AgentError::NotFound(name.clone()),
                    Duration::ZERO,
                );
                summary.failed += 1;
                continue;
            };

            let agent = Arc::clone(&registration.agent);
            let strategy = registration.strategy.clone();
            let snapshot = Arc::clone(&snapshot);
            let semaphore = Arc::clone(&semaphore);
            let task_name = name.clone();

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only fails
                // if it were; run unthrottled in that case.
                let _permit = semaphore.acquire_owned().await.ok();
                let started = Instant::now();
                let result = run_agent(agent.as_ref(), &task_name, &strategy, &snapshot).await;
                AgentRun {
                    name: task_name,
                    result,
                    duration: started.elapsed(),
                }
            });
            names_by_task.insert(handle.id(), name.clone());
            debug!(agent = %name, iteration, "Agent spawned");
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let run = match joined {
                Ok((_, run)) => run,
                Err(err) => {
                    let name = names_by_task
                        .get(&err.id())
                        .cloned()
                        .unwrap_or_else(|| "unknown".into());
                    let reason = if err.is_panic() {
                        panic_message(err.into_panic())
                    } else {
                        "task cancelled".into()
                    };
                    AgentRun {
                        name,
                        result: Err(AgentError::Panicked(reason)),
                        duration: Duration::ZERO,
                    }
                }
            };

            match run.result {
                Ok(updates) => {
                    let keys_before = context.snapshot_keys();
                    context.merge(updates);
                    let step = TrajectoryStep {
                        agent: run.name.clone(),
                        iteration,
                        keys_before,
                        keys_after: context.snapshot_keys(),
                        error: None,
                        duration: run.duration,
                    };
                    let added_keys = step.added_keys();
                    info!(
                        agent = %run.name,
                        iteration,
                        added = added_keys.len(),
                        elapsed_ms = run.duration.as_millis() as u64,
                        "Agent completed"
                    );
                    self.event_bus.publish(DomainEvent::AgentCompleted {
                        agent: run.name,
                        iteration,
                        added_keys,
                        duration_ms: step.duration.as_millis() as u64,
                        timestamp: chrono::Utc::now(),
                    });
                    trajectory.push(step);
                    summary.completed += 1;
                }
                Err(error) => {
                    self.record_failure(context, trajectory, &run.name, iteration, error, run.duration);
                    summary.failed += 1;
                }
            }

            if !self.config.pacing.is_zero() {
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        summary
    }

    fn record_failure(
        &self,
        context: &mut Context,
        trajectory: &mut Trajectory,
        agent: &str,
        iteration: usize,
        error: AgentError,
        duration: Duration,
    ) {
        warn!(agent, iteration, error = %error, "Agent failed");
        let keys = context.snapshot_keys();
        context.append_error(agent, &error);
        trajectory.push(TrajectoryStep {
            agent: agent.to_string(),
            iteration,
            keys_before: keys.clone(),
            keys_after: keys,
            error: Some(error.to_string()),
            duration,
        });
        self.event_bus.publish(DomainEvent::AgentFailed {
            agent: agent.to_string(),
            iteration,
            error: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Run one agent and turn its output into context updates, including any
/// side-fetched fields.
async fn run_agent(
    agent: &dyn Agent,
    name: &str,
    strategy: &MergeStrategy,
    snapshot: &Context,
) -> Result<Map<String, Value>, AgentError> {
    let output = agent.run(snapshot).await?;

    let mut injected = Map::new();
    if let (MergeStrategy::SideFetch { fetcher, .. }, Some(id)) =
        (strategy, strategy.side_fetch_id(&output).cloned())
    {
        match fetcher.fetch(&id).await {
            Ok(fields) if fields.is_empty() => {
                warn!(agent = name, fetch = fetcher.name(), "Side fetch returned nothing");
            }
            Ok(fields) => injected = fields,
            Err(e) => {
                warn!(agent = name, fetch = fetcher.name(), error = %e, "Side fetch failed");
            }
        }
    }

    let mut updates = strategy.updates(name, output);
    updates.extend(injected);
    Ok(updates)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use fieldnote_core::agent::FieldExtraction;
    use fieldnote_core::context::EntityKind;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new("weather in Paris", vec!["Paris".into()], EntityKind::City, vec![])
    }

    fn dispatcher(registry: AgentRegistry) -> Dispatcher {
        Dispatcher::new(Arc::new(registry), Arc::new(EventBus::default())).with_config(DispatchConfig {
            concurrency: 4,
            pacing: Duration::ZERO,
        })
    }

    fn chain(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn merges_all_successful_agents() {
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::mapping("weather", json!({"temp": 18})));
        registry.register_default(FixedAgent::mapping("news", json!({"news": ["a"]})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        let summary = dispatcher(registry)
            .dispatch(&chain(&["weather", "news"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(summary, DispatchSummary { completed: 2, failed: 0 });
        assert_eq!(context.get("temp"), Some(&json!(18)));
        assert_eq!(context.get("news"), Some(&json!(["a"])));
        assert!(context.errors().is_empty());
        assert_eq!(trajectory.len(), 2);
    }

    #[tokio::test]
    async fn failure_is_isolated_and_recorded() {
        let mut registry = AgentRegistry::new();
        registry.register_default(FailingAgent::new("weather", "city not found"));
        registry.register_default(FixedAgent::mapping("news", json!({"news": []})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        let summary = dispatcher(registry)
            .dispatch(&chain(&["weather", "news"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(context.errors(), ["weather: city not found"]);
        assert!(context.contains_key("news"));
        let failed: Vec<_> = trajectory.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("city not found"));
    }

    #[tokio::test]
    async fn unknown_agent_is_not_found() {
        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(AgentRegistry::new())
            .dispatch(&chain(&["teleport"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.errors(), ["teleport: agent not registered: teleport"]);
        assert_eq!(trajectory.len(), 1);
    }

    #[tokio::test]
    async fn panic_is_caught_per_agent() {
        let mut registry = AgentRegistry::new();
        registry.register_default(Arc::new(PanickingAgent::new("flaky")));
        registry.register_default(FixedAgent::mapping("steady", json!({"ok": true})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["flaky", "steady"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.get("ok"), Some(&json!(true)));
        assert_eq!(context.errors().len(), 1);
        assert!(context.errors()[0].starts_with("flaky: agent panicked"));
    }

    #[tokio::test]
    async fn colliding_keys_keep_one_whole_value() {
        let a = json!({"x": {"from": "a", "items": [1, 2, 3]}});
        let b = json!({"x": {"from": "b", "items": [4, 5]}});
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::mapping("a", a.clone()));
        registry.register_default(FixedAgent::mapping("b", b.clone()));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["a", "b"]), &mut context, 1, &mut trajectory)
            .await;

        let x = context.get("x").unwrap();
        assert!(x == &a["x"] || x == &b["x"], "unexpected merged value: {x}");
    }

    #[tokio::test]
    async fn later_completion_wins_a_collision() {
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::delayed(
            "slow",
            json!({"x": "slow"}),
            Duration::from_millis(50),
        ));
        registry.register_default(FixedAgent::mapping("fast", json!({"x": "fast"})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["slow", "fast"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.get_str("x"), Some("slow"));
        // Trajectory follows completion order.
        assert_eq!(trajectory.steps()[0].agent, "fast");
    }

    #[tokio::test]
    async fn agents_see_the_pre_iteration_snapshot() {
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::mapping("writer", json!({"fresh": 1})));
        registry.register_default(Arc::new(KeyProbeAgent::new("probe", "fresh")));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        let d = dispatcher(registry);
        d.dispatch(&chain(&["writer", "probe"]), &mut context, 1, &mut trajectory)
            .await;
        assert_eq!(context.get("probe_saw_key"), Some(&json!(false)));

        d.dispatch(&chain(&["probe"]), &mut context, 2, &mut trajectory).await;
        assert_eq!(context.get("probe_saw_key"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn concurrency_limit_is_respected() {
        let gauge = Arc::new(ConcurrencyGauge::default());
        let mut registry = AgentRegistry::new();
        for i in 0..6 {
            registry.register_default(Arc::new(GaugedAgent::new(
                format!("g{i}"),
                Arc::clone(&gauge),
                Duration::from_millis(20),
            )));
        }

        let names: Vec<String> = (0..6).map(|i| format!("g{i}")).collect();
        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        Dispatcher::new(Arc::new(registry), Arc::new(EventBus::default()))
            .with_config(DispatchConfig {
                concurrency: 2,
                pacing: Duration::ZERO,
            })
            .dispatch(&names, &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(trajectory.len(), 6);
        assert!(gauge.peak() <= 2, "peak concurrency was {}", gauge.peak());
    }

    #[tokio::test]
    async fn replace_key_and_extract_fields() {
        let mut registry = AgentRegistry::new();
        registry.register(
            FixedAgent::text("summarizer", "all done"),
            MergeStrategy::replace_key("summary"),
        );
        registry.register(
            FixedAgent::mapping("sentiment", json!({"score": 0.5, "label": "Positive"})),
            MergeStrategy::ExtractFields(vec![
                FieldExtraction::new("score", "sentiment_score", json!(0)),
                FieldExtraction::new("label", "sentiment", json!("Neutral")),
                FieldExtraction::new("reasoning", "sentiment_reasoning", json!("")),
            ]),
        );

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["summarizer", "sentiment"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.get_str("summary"), Some("all done"));
        assert_eq!(context.get("sentiment_score"), Some(&json!(0.5)));
        assert_eq!(context.get_str("sentiment"), Some("Positive"));
        assert_eq!(context.get_str("sentiment_reasoning"), Some(""));
        assert!(!context.contains_key("score"));
    }

    #[tokio::test]
    async fn side_fetch_injects_fields() {
        let mut registry = AgentRegistry::new();
        registry.register(
            FixedAgent::mapping("spacex_next", json!({"launch_name": "Crew-9", "launchpad": "pad-1"})),
            MergeStrategy::side_fetch(
                "launchpad",
                Arc::new(FixedSideFetch::ok(json!({"launch_location": "Cape Canaveral"}))),
            ),
        );

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["spacex_next"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.get_str("launch_name"), Some("Crew-9"));
        assert_eq!(context.get_str("launch_location"), Some("Cape Canaveral"));
        assert_eq!(
            trajectory.steps()[0].added_keys(),
            vec!["launch_name", "launchpad", "launch_location"]
        );
    }

    #[tokio::test]
    async fn failed_side_fetch_still_merges_primary() {
        let mut registry = AgentRegistry::new();
        registry.register(
            FixedAgent::mapping("spacex_next", json!({"launchpad": "pad-1"})),
            MergeStrategy::side_fetch("launchpad", Arc::new(FixedSideFetch::failing("404"))),
        );

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        dispatcher(registry)
            .dispatch(&chain(&["spacex_next"]), &mut context, 1, &mut trajectory)
            .await;

        assert_eq!(context.get_str("launchpad"), Some("pad-1"));
        assert!(!context.contains_key("launch_location"));
        assert!(context.errors().is_empty());
    }

    #[tokio::test]
    async fn publishes_agent_events() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::mapping("weather", json!({"temp": 1})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        Dispatcher::new(Arc::new(registry), bus)
            .with_config(DispatchConfig {
                concurrency: 1,
                pacing: Duration::ZERO,
            })
            .dispatch(&chain(&["weather", "ghost"]), &mut context, 3, &mut trajectory)
            .await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.as_ref(), DomainEvent::AgentFailed { agent, iteration: 3, .. } if agent == "ghost"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.as_ref(), DomainEvent::AgentCompleted { agent, .. } if agent == "weather"));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_delays_each_completion() {
        let mut registry = AgentRegistry::new();
        registry.register_default(FixedAgent::mapping("a", json!({"a": 1})));
        registry.register_default(FixedAgent::mapping("b", json!({"b": 1})));

        let mut context = ctx();
        let mut trajectory = Trajectory::new();
        let started = tokio::time::Instant::now();
        Dispatcher::new(Arc::new(registry), Arc::new(EventBus::default()))
            .dispatch(&chain(&["a", "b"]), &mut context, 1, &mut trajectory)
            .await;

        assert!(started.elapsed() >= DEFAULT_PACING * 2);
    }
}
