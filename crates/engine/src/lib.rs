//! Research engine for fieldnote.
//!
//! Drives a goal to completion by repeatedly dispatching a chain of agents
//! concurrently against a shared [`Context`](fieldnote_core::Context),
//! judging the result, and asking a planner for a better chain when the
//! goal is not yet satisfied.

pub mod controller;
pub mod dispatcher;
pub mod entities;
pub mod evaluator;
pub mod planner;
pub mod selection;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{ControllerConfig, IterationController, RunReport, RunStatus};
pub use dispatcher::{DispatchConfig, DispatchSummary, Dispatcher};
pub use entities::{Entities, extract_entities};
pub use evaluator::{Evaluation, evaluate, evaluate_with};
pub use planner::{LlmChainPlanner, StaticPlanner, parse_chain};
pub use selection::select_initial_chain;
pub use trajectory::{Trajectory, TrajectoryStep};
