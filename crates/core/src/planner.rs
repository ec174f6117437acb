//! Chain planner trait: proposes the agent chain for the next iteration.

use async_trait::async_trait;

use crate::error::PlannerError;

/// Produces an ordered agent chain for a goal.
///
/// Implementations are not required to restrict themselves to `available`:
/// unknown names are tolerated and surface as dispatch-time failures. By
/// convention the summarizer comes last.
#[async_trait]
pub trait ChainPlanner: Send + Sync {
    async fn plan(&self, goal: &str, available: &[String]) -> Result<Vec<String>, PlannerError>;
}
