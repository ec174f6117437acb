//! Iteration controller: the dispatch, evaluate, replan loop.
//!
//! ```text
//!   Running(1) ──dispatch──▶ evaluate ──satisfied──▶ Satisfied
//!       ▲                       │
//!       │                  not satisfied
//!       │                       │
//!       └──replan (n+1)◀── n < max ──── n == max ──▶ Exhausted
//! ```
//!
//! A planner failure keeps the current chain and still consumes the
//! iteration, so the loop always terminates within `max_iterations`.

use fieldnote_config::EngineConfig;
use fieldnote_core::agent::AgentRegistry;
use fieldnote_core::context::Context;
use fieldnote_core::error::Error;
use fieldnote_core::event::{DomainEvent, EventBus};
use fieldnote_core::planner::ChainPlanner;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::entities::extract_entities;
use crate::evaluator::{DEFAULT_MIN_SUMMARY_WORDS, Evaluation, evaluate_with};
use crate::trajectory::Trajectory;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Satisfied,
    /// The iteration bound was reached without satisfying the goal.
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub max_iterations: usize,
    pub min_summary_words: usize,
    pub dispatch: DispatchConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_summary_words: DEFAULT_MIN_SUMMARY_WORDS,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_engine(engine: &EngineConfig) -> Self {
        Self {
            max_iterations: engine.max_iterations,
            min_summary_words: engine.min_summary_words,
            dispatch: DispatchConfig {
                concurrency: engine.concurrency,
                pacing: Duration::from_millis(engine.pacing_ms),
            },
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Iterations actually dispatched.
    pub iterations: usize,
    /// The last evaluation.
    pub evaluation: Evaluation,
    pub context: Context,
    pub trajectory: Trajectory,
}

impl RunReport {
    pub fn satisfied(&self) -> bool {
        self.status == RunStatus::Satisfied
    }
}

pub struct IterationController {
    registry: Arc<AgentRegistry>,
    planner: Arc<dyn ChainPlanner>,
    event_bus: Arc<EventBus>,
    config: ControllerConfig,
}

impl IterationController {
    pub fn new(
        registry: Arc<AgentRegistry>,
        planner: Arc<dyn ChainPlanner>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            planner,
            event_bus,
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a context for `goal` with extracted entities and run `chain`.
    pub async fn execute(&self, goal: &str, chain: Vec<String>) -> Result<RunReport, Error> {
        let extracted = extract_entities(goal);
        debug!(
            entities = ?extracted.entities,
            kind = %extracted.kind,
            city = ?extracted.city,
            topic = ?extracted.topic,
            "Extracted entities"
        );
        let mut context = Context::new(goal, extracted.entities, extracted.kind, chain);
        if let Some(city) = extracted.city {
            context.insert("city", Value::String(city));
        }
        if let Some(topic) = extracted.topic {
            context.insert("topic", Value::String(topic));
        }
        self.run(context).await
    }

    /// Run the loop starting from `context.agent_chain()`.
    pub async fn run(&self, mut context: Context) -> Result<RunReport, Error> {
        let max_iterations = self.config.max_iterations;
        if max_iterations == 0 {
            return Err(Error::Config {
                message: "max_iterations must be at least 1".into(),
            });
        }

        let dispatcher = Dispatcher::new(Arc::clone(&self.registry), Arc::clone(&self.event_bus))
            .with_config(self.config.dispatch);
        let available = self.registry.names();
        let started = Instant::now();
        let mut trajectory = Trajectory::new();
        let mut iteration = 1;

        let (status, evaluation) = loop {
            let chain = context.agent_chain().to_vec();
            info!(iteration, chain = ?chain, "Iteration started");
            self.event_bus.publish(DomainEvent::IterationStarted {
                iteration,
                chain: chain.clone(),
                timestamp: chrono::Utc::now(),
            });

            let summary = dispatcher
                .dispatch(&chain, &mut context, iteration, &mut trajectory)
                .await;
            debug!(iteration, completed = summary.completed, failed = summary.failed, "Chain dispatched");

            let evaluation = evaluate_with(&context, self.config.min_summary_words);
            info!(iteration, satisfied = evaluation.satisfied, feedback = %evaluation.feedback, "Evaluated");
            self.event_bus.publish(DomainEvent::Evaluated {
                iteration,
                satisfied: evaluation.satisfied,
                feedback: evaluation.feedback.clone(),
                timestamp: chrono::Utc::now(),
            });

            if evaluation.satisfied {
                break (RunStatus::Satisfied, evaluation);
            }
            if iteration >= max_iterations {
                warn!(iteration, "Iteration bound reached without satisfying the goal");
                break (RunStatus::Exhausted, evaluation);
            }

            match self.planner.plan(context.goal(), &available).await {
                Ok(new_chain) => {
                    let changed = new_chain != chain;
                    if changed {
                        info!(old = ?chain, new = ?new_chain, "Planner refined the agent chain");
                        context.set_agent_chain(new_chain.clone());
                    } else {
                        info!("Planner routing: no change to agent chain");
                    }
                    self.event_bus.publish(DomainEvent::ChainReplanned {
                        iteration,
                        old_chain: chain,
                        new_chain,
                        changed,
                        timestamp: chrono::Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(iteration, error = %e, "Planner failed, keeping current chain");
                    self.event_bus.publish(DomainEvent::PlannerFailed {
                        iteration,
                        error: e.to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }

            iteration += 1;
        };

        context.finish(started.elapsed());
        info!(
            status = ?status,
            iterations = iteration,
            errors = context.errors().len(),
            elapsed_ms = context.processing_time().as_millis() as u64,
            "Run finished"
        );
        self.event_bus.publish(DomainEvent::RunFinished {
            satisfied: status == RunStatus::Satisfied,
            iterations: iteration,
            error_count: context.errors().len(),
            timestamp: chrono::Utc::now(),
        });

        Ok(RunReport {
            status,
            iterations: iteration,
            evaluation,
            context,
            trajectory,
        })
    }
}
