//! # fieldnote Core
//!
//! Domain types, traits, and error definitions for the fieldnote research
//! engine. This crate has **no I/O**: it defines the domain model that all
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here: agents, the chain planner,
//! LLM providers. Implementations live in their respective crates, so the
//! engine can be tested end to end with scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod context;
pub mod agent;
pub mod planner;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, PlannerError, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use context::{Context, EntityKind};
pub use agent::{
    Agent, AgentOutput, AgentRegistration, AgentRegistry, FieldExtraction, MergeStrategy, SideFetch,
};
pub use planner::ChainPlanner;
pub use event::{DomainEvent, EventBus};
