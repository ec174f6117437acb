//! Trajectory log: one entry per agent invocation, in merge order.
//!
//! Diagnostic only: nothing in the loop reads it back.

use serde::Serialize;
use std::time::Duration;

/// What one agent invocation did to the context.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryStep {
    pub agent: String,
    pub iteration: usize,
    /// Data keys just before this agent's result was merged.
    pub keys_before: Vec<String>,
    /// Data keys just after.
    pub keys_after: Vec<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl TrajectoryStep {
    /// Keys present after the merge that were absent before it.
    pub fn added_keys(&self) -> Vec<String> {
        self.keys_after
            .iter()
            .filter(|k| !self.keys_before.contains(k))
            .cloned()
            .collect()
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered record of every agent invocation across a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trajectory {
    steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TrajectoryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps recorded during `iteration`.
    pub fn for_iteration(&self, iteration: usize) -> impl Iterator<Item = &TrajectoryStep> {
        self.steps.iter().filter(move |s| s.iteration == iteration)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrajectoryStep> {
        self.steps.iter().filter(|s| !s.succeeded())
    }
}
