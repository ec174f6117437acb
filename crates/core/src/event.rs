//! Domain event system: decoupled progress reporting.
//!
//! The dispatcher and the controller publish events as a run progresses.
//! The CLI subscribes to print progress; tests subscribe to observe
//! ordering without scraping logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An iteration is about to dispatch its chain
    IterationStarted {
        iteration: usize,
        chain: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// An agent finished and its output was merged
    AgentCompleted {
        agent: String,
        iteration: usize,
        added_keys: Vec<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An agent failed; the failure was recorded in the context
    AgentFailed {
        agent: String,
        iteration: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// The evaluator judged the context
    Evaluated {
        iteration: usize,
        satisfied: bool,
        feedback: String,
        timestamp: DateTime<Utc>,
    },

    /// The planner produced a chain for the next iteration
    ChainReplanned {
        iteration: usize,
        old_chain: Vec<String>,
        new_chain: Vec<String>,
        changed: bool,
        timestamp: DateTime<Utc>,
    },

    /// The planner failed; the current chain is kept
    PlannerFailed {
        iteration: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// The loop terminated
    RunFinished {
        satisfied: bool,
        iterations: usize,
        error_count: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
