//! Error types for the fieldnote domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all fieldnote operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Planner errors ---
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of a single agent invocation.
///
/// Always recovered by the dispatcher: it becomes an `"agent: message"`
/// entry in the context's error list and never aborts the run.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("agent not registered: {0}")]
    NotFound(String),

    #[error("request failed: {reason}")]
    Http { agent: String, reason: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{0}")]
    Failed(String),

    #[error("agent panicked: {0}")]
    Panicked(String),
}

/// Failure of the chain planner collaborator.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    #[error("could not parse agent chain from response: {response}")]
    Unparseable { response: String },

    #[error("planner returned an empty chain")]
    EmptyChain,

    #[error("planner provider failed: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
